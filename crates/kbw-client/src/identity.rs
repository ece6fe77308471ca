//! Sign-up and sign-in behind the email domain policy.

use kbw_core::identity::DomainPolicy;
use kbw_core::{Error, Result};

use crate::TRACING_TARGET_IDENTITY;
use crate::session::{Session, SessionInfo};

/// Shown for every address the policy refuses. Does not name the allowed domain.
pub const EMAIL_NOT_ALLOWED: &str = "This email address cannot be used to sign in.";

/// External identity service.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Registers an account.
    ///
    /// Returns a session when the provider signs the user in right away, and
    /// `None` when the address must be confirmed first.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<SessionInfo>>;

    /// Signs in with a password.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SessionInfo>;

    /// Sends a password reset link.
    async fn request_password_reset(&self, email: &str) -> Result<()>;

    /// Ends a session.
    async fn sign_out(&self, session: &SessionInfo) -> Result<()>;
}

/// An [`IdentityProvider`] that only ever sees addresses the policy accepts.
///
/// Successful sign-ins and sign-outs are published to the [`Session`].
#[derive(Debug, Clone)]
pub struct GuardedIdentity<P> {
    provider: P,
    policy: DomainPolicy,
    session: Session,
}

impl<P: IdentityProvider> GuardedIdentity<P> {
    pub fn new(provider: P, policy: DomainPolicy, session: Session) -> Self {
        Self {
            provider,
            policy,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn admit(&self, email: &str) -> Result<String> {
        self.policy.normalize(email).ok_or_else(|| {
            tracing::info!(
                target: TRACING_TARGET_IDENTITY,
                "Identity request refused by domain policy"
            );
            Error::validation(EMAIL_NOT_ALLOWED)
        })
    }

    /// Registers an account, signing in if the provider allows it.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<SessionInfo>> {
        let email = self.admit(email)?;
        let info = self.provider.sign_up(&email, password).await?;
        if let Some(info) = &info {
            self.session.set(Some(info.clone()));
        }
        Ok(info)
    }

    /// Signs in with a password.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SessionInfo> {
        let email = self.admit(email)?;
        let info = self.provider.sign_in_with_password(&email, password).await?;
        self.session.set(Some(info.clone()));
        Ok(info)
    }

    /// Sends a password reset link.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let email = self.admit(email)?;
        self.provider.request_password_reset(&email).await
    }

    /// Signs out. Does nothing when nobody is signed in.
    ///
    /// The local session is cleared even if the provider call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let Some(info) = self.session.current() else {
            return Ok(());
        };

        self.session.set(None);
        self.provider.sign_out(&info).await
    }
}
