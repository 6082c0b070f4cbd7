//! Process-scoped holder for the last fetched verification key.

use std::sync::{PoisonError, RwLock};

use primitives::VerificationKey;

/// Plain read/overwrite cell. There is no expiry and no invalidation signal
/// from the service: a caller that needs a fresh key fetches it again.
#[derive(Debug, Default)]
pub struct VerificationKeyCache {
    key: RwLock<Option<VerificationKey>>,
}

impl VerificationKeyCache {
    pub fn new() -> Self { Self::default() }

    pub fn set(&self, key: VerificationKey) {
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = Some(key);
    }

    pub fn get(&self) -> Option<VerificationKey> {
        self.key.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
