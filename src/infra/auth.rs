//! Bearer tokens declared in configuration.
//!
//! Only SHA-256 digests of the tokens are kept in memory, and lookups compare
//! digests in constant time.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::application::auth::{AuthGate, Principal};
use crate::config::AuthUser;

struct TokenEntry {
    digest: Vec<u8>,
    principal: Principal,
}

pub struct StaticTokenGate {
    entries: Vec<TokenEntry>,
}

impl StaticTokenGate {
    pub fn new(users: &[AuthUser]) -> Self {
        let entries = users
            .iter()
            .map(|user| TokenEntry {
                digest: digest(&user.token),
                principal: Principal { user_id: user.id },
            })
            .collect();
        Self { entries }
    }
}

#[async_trait]
impl AuthGate for StaticTokenGate {
    async fn authenticate(&self, token: &str) -> Option<Principal> {
        let presented = digest(token);
        let mut found = None;
        for entry in &self.entries {
            if entry.digest.as_slice().ct_eq(presented.as_slice()).unwrap_u8() == 1 {
                found = Some(entry.principal.clone());
            }
        }
        found
    }
}

fn digest(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
