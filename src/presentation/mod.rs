//! Server-rendered views.

pub mod portable_text;
pub mod sections;
pub mod views;
