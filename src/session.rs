//! Session holder seam.
//!
//! The client never owns sign-in state. It asks a [`SessionProvider`] who is
//! signed in and for a fresh bearer token on every call; the embedding app
//! backs this with its identity SDK. [`MemorySession`] is an in-process
//! implementation for tests and tooling.

use std::fmt;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No user is currently signed in")]
    NotSignedIn,
    #[error("Failed to mint token: {0}")]
    TokenUnavailable(String),
    #[error("Failed to sign out: {0}")]
    SignOut(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Short-lived credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    /// Called once per request; implementations may refresh behind the scenes.
    async fn mint_token(&self) -> Result<BearerToken, SessionError>;

    async fn sign_out(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Clone)]
struct SignedIn {
    identity: Identity,
    token: Option<BearerToken>,
}

#[derive(Debug, Default)]
pub struct MemorySession {
    state: RwLock<Option<SignedIn>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: Identity, token: BearerToken) -> Self {
        let session = Self::new();
        session.sign_in(identity, token);
        session
    }

    pub fn sign_in(&self, identity: Identity, token: BearerToken) {
        debug!(uid = %identity.uid, "session signed in");
        *self.state.write() = Some(SignedIn {
            identity,
            token: Some(token),
        });
    }

    /// Keeps the identity but makes the next `mint_token` fail.
    pub fn revoke_token(&self) {
        if let Some(signed_in) = self.state.write().as_mut() {
            signed_in.token = None;
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.read().is_some()
    }
}

#[async_trait]
impl SessionProvider for MemorySession {
    fn current_identity(&self) -> Option<Identity> {
        self.state.read().as_ref().map(|s| s.identity.clone())
    }

    async fn mint_token(&self) -> Result<BearerToken, SessionError> {
        let guard = self.state.read();
        let signed_in = guard.as_ref().ok_or(SessionError::NotSignedIn)?;
        signed_in
            .token
            .clone()
            .ok_or_else(|| SessionError::TokenUnavailable("token was revoked".into()))
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        if let Some(previous) = self.state.write().take() {
            debug!(uid = %previous.identity.uid, "session signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_session_lifecycle() {
        let session = MemorySession::new();
        assert!(session.current_identity().is_none());
        assert!(matches!(
            session.mint_token().await,
            Err(SessionError::NotSignedIn)
        ));

        session.sign_in(Identity::new("u1").with_email("a@b.c"), BearerToken::new("t1"));
        assert_eq!(session.current_identity().unwrap().uid, "u1");
        assert_eq!(session.mint_token().await.unwrap().as_str(), "t1");

        session.sign_out().await.unwrap();
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn test_revoked_token_keeps_identity() {
        let session = MemorySession::signed_in(Identity::new("u1"), BearerToken::new("t1"));
        session.revoke_token();
        assert!(session.current_identity().is_some());
        assert!(matches!(
            session.mint_token().await,
            Err(SessionError::TokenUnavailable(_))
        ));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = BearerToken::new("super-secret");
        assert!(!format!("{token:?}").contains("super-secret"));
        assert_eq!(token.header_value(), "Bearer super-secret");
    }
}
