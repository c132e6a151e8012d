//! Domain layer: pure models, ports, and errors. No I/O here.

pub mod errors;
pub mod models;
pub mod ports;
