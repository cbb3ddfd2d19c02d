// Domain layer: typed trade-statistics model and the ports the engine consumes.

pub mod model;
pub mod ports;
