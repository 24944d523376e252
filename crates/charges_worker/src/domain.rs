mod charge_model;
mod charge_transformer;
mod charges_api;
mod delta_model;
mod delta_processor;
mod envelope_codec;
mod error;
mod filing_type;
mod identifier;
mod normaliser;
mod retry_controller;
mod text_formatter;

pub use charge_model::*;
pub use charge_transformer::*;
pub use charges_api::*;
pub use delta_model::*;
pub use delta_processor::*;
pub use envelope_codec::*;
pub use error::*;
pub use filing_type::*;
pub use identifier::*;
pub use normaliser::*;
pub use retry_controller::*;
pub use text_formatter::*;
