pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::ClientConfig;

pub use adapters::http::HttpTransport;
pub use crate::core::{batch::ShipmentBatch, client::CarrierClient, client::Endpoint};
pub use domain::model::{Credentials, Destination, LabelDocument, Recipient, ShipmentRecord};
pub use domain::ports::Transport;
pub use utils::error::{CarrierError, ItemError, Result, ShippingError, TransportError};
