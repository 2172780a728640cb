//! Shared models and executor-facing ports

pub mod models;
pub mod ports;
