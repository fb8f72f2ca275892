// Domain layer: records, lifecycle events and the ports the pipeline talks through.

pub mod model;
pub mod ports;
