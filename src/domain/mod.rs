// Domain layer: models, shared validation and ports. No HTTP here.

pub mod model;
pub mod ports;

pub mod services;
