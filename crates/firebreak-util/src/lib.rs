//! Shared utilities for firebreakd
//!
//! This crate provides:
//! - ID types (ClientId)
//! - Time utilities (epoch-millisecond instants, duration helpers)
//! - Default paths for socket, config, and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
