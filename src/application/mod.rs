//! Application services layer.

pub mod auth;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod listings;
pub mod pagination;
pub mod query;
pub mod recommendations;
pub mod repos;
pub mod search;
