//! Synthetic value generation

pub mod random;

pub use random::{Distribution, ValueGenerator};
