//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - On-disk database fixtures
//! - Deterministic sync transports

pub mod fixtures;
pub mod transport;

// Re-export commonly used utilities
pub use fixtures::*;
pub use transport::*;
