//! Cache key derivation for listing searches.
//!
//! A key is `listings:v<schema>:<sha256>` where the digest covers a canonical
//! JSON rendering of the descriptor. Field names are emitted in sorted order,
//! so equal descriptors always hash to equal keys and different descriptors
//! only collide if SHA-256 does.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::application::filter::{Constraint, FilterDescriptor};

/// Resource namespace shared by every listing search key.
pub const LISTINGS_NAMESPACE: &str = "listings";

/// Bumped whenever the canonical descriptor shape changes.
pub const LISTINGS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalSearch<'a> {
    filters: BTreeMap<&'static str, &'a Constraint>,
    page: u32,
    page_size: u32,
}

/// Prefix matching every listing search key, across all schema versions.
pub fn listings_prefix() -> String {
    format!("{LISTINGS_NAMESPACE}:")
}

/// Derive the cache key for a normalized listing search.
pub fn listing_search_key(filter: &FilterDescriptor) -> CacheKey {
    let canonical = CanonicalSearch {
        filters: filter
            .constraints()
            .iter()
            .map(|(field, constraint)| (field.as_str(), constraint))
            .collect(),
        page: filter.page(),
        page_size: filter.page_size(),
    };
    let serialized = serde_json::to_vec(&canonical)
        .expect("serializing canonical search descriptor should succeed");
    let digest = Sha256::digest(&serialized);

    CacheKey(format!(
        "{LISTINGS_NAMESPACE}:v{LISTINGS_SCHEMA_VERSION}:{}",
        hex::encode(digest)
    ))
}
