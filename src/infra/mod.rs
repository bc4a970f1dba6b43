//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod cache;
pub mod error;
pub mod fixtures;
pub mod http;
pub mod sanity;
pub mod stats;
pub mod telemetry;
