//! Shared utilities for binaries.

pub mod bootstrap;

pub use bootstrap::init_tracing;
