use crate::domain::model::ShipmentRecord;
use crate::utils::error::{Result, ShippingError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shipments to register, as listed in a TOML file of `[[shipment]]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmentFile {
    #[serde(default, rename = "shipment")]
    pub shipments: Vec<ShipmentRecord>,
}

impl ShipmentFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ShippingError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ShippingError::ConfigValidationError {
            field: "shipment".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }
}
