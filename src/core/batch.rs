use crate::core::codec;
use crate::domain::model::{Credentials, ShipmentRecord};
use crate::utils::error::Result;

/// Shipments waiting to be sent, in the order they were added.
///
/// Order matters: the carrier answers item by item in request order. Records
/// are not checked here; incomplete ones are rejected by the carrier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentBatch {
    records: Vec<ShipmentRecord>,
}

impl ShipmentBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: ShipmentRecord) {
        self.records.push(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ShipmentRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[ShipmentRecord] {
        &self.records
    }

    /// Request document for the whole batch.
    pub fn serialize(&self, credentials: &Credentials) -> Result<String> {
        codec::encode_shipment_batch(self, credentials)
    }
}

impl FromIterator<ShipmentRecord> for ShipmentBatch {
    fn from_iter<I: IntoIterator<Item = ShipmentRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl Extend<ShipmentRecord> for ShipmentBatch {
    fn extend<I: IntoIterator<Item = ShipmentRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ShipmentBatch {
    type Item = &'a ShipmentRecord;
    type IntoIter = std::slice::Iter<'a, ShipmentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
