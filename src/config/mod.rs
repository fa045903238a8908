#[cfg(feature = "cli")]
pub mod cli;
pub mod shipments;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use shipments::ShipmentFile;
pub use toml_config::{ApiConfig, AuthenticationConfig, ClientConfig};
