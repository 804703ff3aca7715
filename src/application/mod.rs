//! Application services: specifications, their executor and catalog use cases.

pub mod catalog;
pub mod error;
pub mod pagination;
pub mod query;
pub mod repos;
pub mod specification;
