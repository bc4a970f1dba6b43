//! Domain layer types and invariants.

pub mod content;
pub mod error;
pub mod sections;
mod serde_util;
