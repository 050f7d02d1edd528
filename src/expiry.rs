//! Uniform reaction to a server-rejected token.
//!
//! Any call that sees a 401 hands the condition to [`SessionExpiryHandler`].
//! Only the first one while armed starts the alert, sign-out and navigation
//! to the entry screen; the rest are counted and dropped. The flow runs on
//! its own task, so dropping the request that saw the 401 does not cut it
//! short.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::session::SessionProvider;

pub const EXPIRED_TITLE: &str = "Session Expired";
pub const EXPIRED_MESSAGE: &str = "Please log in again to continue.";

/// UI side of the expiry flow.
#[async_trait]
pub trait ExpiryPrompt: Send + Sync {
    /// Shows a blocking alert and resolves once the user acknowledges it.
    async fn acknowledge_expired(&self, title: &str, message: &str);

    /// Replaces the navigation stack with the sign-in screen.
    fn navigate_to_entry(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryState {
    Armed,
    Triggered,
    SessionCleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// This call started the alert, sign-out and navigation.
    Handled,
    /// Another call already did.
    AlreadyHandled,
}

pub struct SessionExpiryHandler {
    session: Arc<dyn SessionProvider>,
    prompt: Arc<dyn ExpiryPrompt>,
    state: Arc<watch::Sender<ExpiryState>>,
    invocations: AtomicUsize,
}

impl SessionExpiryHandler {
    pub fn new(session: Arc<dyn SessionProvider>, prompt: Arc<dyn ExpiryPrompt>) -> Self {
        let (state, _) = watch::channel(ExpiryState::Armed);
        Self {
            session,
            prompt,
            state: Arc::new(state),
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> ExpiryState {
        *self.state.borrow()
    }

    /// Number of 401s reported since construction.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::Acquire)
    }

    /// Records a 401 and, if armed, spawns the expiry flow onto the current
    /// tokio runtime. Returns without waiting for the user.
    ///
    /// A handler that already cleared a session re-arms by itself once a new
    /// identity is signed in, so the next session's expiry is surfaced too.
    pub fn handle(&self, trigger: &str) -> ExpiryOutcome {
        self.invocations.fetch_add(1, Ordering::AcqRel);

        let started = self.state.send_if_modified(|state| {
            let rearmable = *state == ExpiryState::SessionCleared
                && self.session.current_identity().is_some();
            if *state == ExpiryState::Armed || rearmable {
                *state = ExpiryState::Triggered;
                true
            } else {
                false
            }
        });
        if !started {
            info!(trigger, "session expiry already being handled");
            return ExpiryOutcome::AlreadyHandled;
        }

        warn!(trigger, "backend rejected session token");
        let session = self.session.clone();
        let prompt = self.prompt.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            prompt
                .acknowledge_expired(EXPIRED_TITLE, EXPIRED_MESSAGE)
                .await;
            if let Err(err) = session.sign_out().await {
                warn!(error = %err, "failed to clear session after expiry");
            }
            state.send_replace(ExpiryState::SessionCleared);
            prompt.navigate_to_entry();
            debug!("session expiry flow finished");
        });
        ExpiryOutcome::Handled
    }

    /// Resolves once no expiry flow is in progress and returns the state it
    /// settled in.
    pub async fn settled(&self) -> ExpiryState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|state| *state != ExpiryState::Triggered).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }

    /// Forces the handler back to armed. Signing in again has the same effect
    /// on the next 401; this is for callers that want it explicit.
    pub fn rearm(&self) {
        self.state.send_if_modified(|state| {
            if *state == ExpiryState::SessionCleared {
                *state = ExpiryState::Armed;
                true
            } else {
                false
            }
        });
    }
}
