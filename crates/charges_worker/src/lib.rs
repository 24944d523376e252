pub mod charges_worker;
pub mod domain;
pub mod http;
pub mod nats;

pub use charges_worker::*;
