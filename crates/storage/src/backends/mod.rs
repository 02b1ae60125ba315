//! Sink implementations.

pub mod filesystem;
pub mod memory;
