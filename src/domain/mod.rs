// Domain layer: query/outcome models and the event sink port. No HTTP here.

pub mod model;
pub mod ports;
