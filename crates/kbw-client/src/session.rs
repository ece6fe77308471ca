//! The signed-in user, shared by every client component.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use crate::TRACING_TARGET_IDENTITY;

/// An established sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
}

impl SessionInfo {
    /// Creates a new [`SessionInfo`].
    pub fn new(user_id: Uuid, email: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionInfo")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"****")
            .finish()
    }
}

/// Current session, observable through [`Session::subscribe`].
///
/// Clones share state: signing in through one clone is seen by all of them.
#[derive(Debug, Clone)]
pub struct Session {
    sender: Arc<watch::Sender<Option<SessionInfo>>>,
}

impl Session {
    /// Creates a signed-out session.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Creates a session that is already signed in.
    pub fn signed_in(info: SessionInfo) -> Self {
        let session = Self::new();
        session.set(Some(info));
        session
    }

    /// Returns the current sign-in, if any.
    pub fn current(&self) -> Option<SessionInfo> {
        self.sender.borrow().clone()
    }

    /// Returns the signed-in user's id.
    pub fn user_id(&self) -> Option<Uuid> {
        self.sender.borrow().as_ref().map(|info| info.user_id)
    }

    /// Returns the bearer token for API calls.
    pub fn access_token(&self) -> Option<String> {
        self.sender
            .borrow()
            .as_ref()
            .map(|info| info.access_token.clone())
    }

    /// Returns whether a user is signed in.
    pub fn is_signed_in(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// Replaces the current sign-in and notifies subscribers.
    pub fn set(&self, info: Option<SessionInfo>) {
        tracing::debug!(
            target: TRACING_TARGET_IDENTITY,
            user_id = ?info.as_ref().map(|info| info.user_id),
            "session changed"
        );
        self.sender.send_replace(info);
    }

    /// Subscribes to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionInfo>> {
        self.sender.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
