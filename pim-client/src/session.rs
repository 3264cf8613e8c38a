//! Session provider
//!
//! Services ask the session for the current bearer token before each request
//! and report rejected credentials back to it.

use parking_lot::RwLock;

use crate::config::ClientConfig;

/// Source of request credentials
pub trait SessionProvider: Send + Sync {
    /// Bearer token for the next request
    fn access_token(&self) -> Option<String>;

    /// Called when the server rejected the credentials (HTTP 401)
    fn on_unauthorized(&self);
}

/// Session holding a single bearer token in memory
#[derive(Debug, Default)]
pub struct TokenSession {
    token: RwLock<Option<String>>,
}

impl TokenSession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Session seeded with the configured token
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.token.clone())
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write() = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}

impl SessionProvider for TokenSession {
    fn access_token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn on_unauthorized(&self) {
        tracing::warn!("Credentials rejected, clearing session");
        self.clear();
    }
}
