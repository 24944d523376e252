mod charges_api_client;

pub use charges_api_client::*;
