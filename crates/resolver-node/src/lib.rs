//! # Resolver Node Library
//!
//! Exposes the node's modules for testing. The entry point is `main.rs`.
//!
//! - `container/` - configuration and dependency wiring
//! - `adapters/` - metered decorator around the ledger adapters
//! - `api` - axum routes

pub mod adapters;
pub mod api;
pub mod container;

pub use container::{ConfigError, NodeConfig, ResolverContainer};
