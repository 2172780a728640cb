//! Shared fixtures for ese-core integration tests
//!
//! A minimal in-memory executor state and the programs the scenarios run.

#![allow(dead_code)]

mod mock_path;
mod programs;

pub use mock_path::*;
pub use programs::*;
