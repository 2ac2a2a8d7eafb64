//! Integration tests across the durability services

pub mod health_test;
pub mod http_test;
pub mod snapshot_test;
pub mod sync_test;
