mod channel_producer;
mod charge_delta_consumer;
mod delta_consumer_service;
mod headers;
mod retry_delay_layer;

pub use channel_producer::*;
pub use charge_delta_consumer::*;
pub use delta_consumer_service::*;
pub use headers::*;
pub use retry_delay_layer::*;
