pub mod batch;
pub mod client;
pub mod codec;
pub mod xml;

pub use crate::domain::model::{Credentials, LabelDocument, ShipmentRecord};
pub use crate::domain::ports::Transport;
pub use crate::utils::error::Result;
