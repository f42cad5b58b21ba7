//! Testing utilities and mock implementations
//!
//! Mocks for running publishers without an MQTT broker or a store file.

pub mod mocks;

pub use mocks::*;
