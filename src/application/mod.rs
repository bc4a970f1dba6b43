//! Application services: listing hubs, page-builder dispatch, the content
//! fetch layer and the policies behind the API routes.

pub mod chrome;
pub mod content;
pub mod error;
pub mod hub;
pub mod mining_stats;
pub mod page_builder;
pub mod repos;
pub mod revalidate;
pub mod routes;
