//! Multi-vendor storefront catalog.
//!
//! Product reads are expressed as composable specifications and executed
//! against an abstract data source; HTTP responses sit behind a
//! prefix-invalidated response cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
