//! The Howling Mine community site.
//!
//! Layered the usual way: `domain` holds the CMS record shapes, `application`
//! the listing hubs, page-builder dispatch and API policies, `infra` the CMS
//! and upstream adapters plus the HTTP surface, and `presentation` the
//! askama views.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
