mod consumer_logging;
mod consumer_tracing;
mod consumer_types;
mod log_fields;
mod publish_layers;
mod publisher;

pub use consumer_logging::*;
pub use consumer_tracing::*;
pub use consumer_types::*;
pub use log_fields::*;
pub use publish_layers::*;
pub use publisher::*;
