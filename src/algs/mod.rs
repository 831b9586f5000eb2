//! Algorithms that run on top of the store: process-group communication
//! and node-to-center interpolation.

pub mod center_interpolation;
pub mod communicator;
