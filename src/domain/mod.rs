// Domain layer: conversation models and ports. Adapters and core depend on
// this module, never the other way round.

pub mod model;
pub mod ports;
