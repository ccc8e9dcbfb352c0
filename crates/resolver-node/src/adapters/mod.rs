//! # Node Adapters
//!
//! Decorators that connect the core's outbound ports to node concerns.

mod metered;

pub use metered::MeteredAdapter;
