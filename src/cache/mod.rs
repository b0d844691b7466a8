//! Cache layer for listing search results.
//!
//! - [`keys`] derives deterministic keys from normalized filters.
//! - [`CacheStore`] is the capability the search path depends on, with a
//!   Redis-backed implementation in `infra::redis` and [`MemoryCacheStore`]
//!   for single-process deployments and tests.
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 60
//! operation_timeout_ms = 50
//! ```

mod config;
pub mod keys;
mod memory;
mod store;

pub use config::CacheConfig;
pub use keys::{CacheKey, listing_search_key, listings_prefix};
pub use memory::MemoryCacheStore;
pub use store::{CacheStore, CacheUnavailable};
