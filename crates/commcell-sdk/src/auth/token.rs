//! Shared session token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

use super::{AuthToken, Authenticator, AUTH_HEADER};
use crate::error::Result;

/// The token of a live session, shared by the session and its transport.
///
/// Every store bumps a generation counter so concurrent 401 handlers can tell
/// whether somebody else already renewed the token.
pub struct SessionToken {
    token: Arc<RwLock<Option<SecretString>>>,
    generation: Arc<AtomicU64>,
    renew_lock: Arc<tokio::sync::Mutex<()>>,
}

impl SessionToken {
    /// Creates an empty token holder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            renew_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Returns the current header value, if logged in.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .as_ref()
            .map(|t| t.expose_secret().to_string())
    }

    /// Stores a token.
    pub fn set(&self, token: &AuthToken) {
        *self.token.write() = Some(SecretString::new(token.expose().to_string()));
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Stores a raw header value received from the server.
    pub fn set_raw(&self, value: impl Into<String>) {
        *self.token.write() = Some(SecretString::new(value.into()));
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Clears the token.
    pub fn clear(&self) {
        *self.token.write() = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns true if a token is stored.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.token.read().is_some()
    }

    /// Current generation counter.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Serializes token renewals.
    pub(crate) async fn lock_renewal(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.renew_lock.lock().await
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SessionToken {
    fn clone(&self) -> Self {
        Self {
            token: Arc::clone(&self.token),
            generation: Arc::clone(&self.generation),
            renew_lock: Arc::clone(&self.renew_lock),
        }
    }
}

#[async_trait]
impl Authenticator for SessionToken {
    async fn authenticate(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.get() {
            Some(token) => Ok(request.header(AUTH_HEADER, token)),
            None => Ok(request),
        }
    }

    fn is_authenticated(&self) -> bool {
        self.is_set()
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("is_set", &self.is_set())
            .field("generation", &self.generation())
            .finish()
    }
}
