// Domain layer: request-scoped models and the two stage ports.

pub mod model;
pub mod ports;
