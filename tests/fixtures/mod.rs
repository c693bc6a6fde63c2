#![allow(dead_code)]
//! Shared fixtures for integration tests: a fault-injecting store and a live server

pub mod fault_store;
pub mod test_server;

pub use fault_store::{FaultInjectingStore, Step};
pub use test_server::TestServer;
