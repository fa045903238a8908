// Domain layer: shipment data and the transport port. Only std/serde here.

pub mod model;
pub mod ports;
