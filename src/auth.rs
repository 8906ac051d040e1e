//! Identity verification.
//!
//! Sessions are issued by an external authentication service; this crate only
//! resolves an opaque bearer token to the user it belongs to. Every mutating
//! operation takes the resulting [`Principal`] rather than a client-supplied uid.

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::models::Session;
use crate::store::{Collection, DocumentStore, StoreError};

/// The verified acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
}

impl Principal {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Resolve a session token. `Ok(None)` means the token is unknown.
    async fn verify(&self, token: &str) -> Result<Option<Principal>, StoreError>;
}

/// Resolves tokens against the `sessions` collection.
pub struct StoreSessions {
    store: Arc<dyn DocumentStore>,
}

impl StoreSessions {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityProvider for StoreSessions {
    async fn verify(&self, token: &str) -> Result<Option<Principal>, StoreError> {
        if token.is_empty() {
            return Ok(None);
        }
        let Some(doc) = self.store.get(Collection::Sessions, token).await? else {
            return Ok(None);
        };
        let session: Session = doc.decode(Collection::Sessions)?;
        if session.uid.is_empty() {
            return Ok(None);
        }
        Ok(Some(Principal::new(session.uid)))
    }
}
