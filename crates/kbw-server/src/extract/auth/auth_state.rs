//! Authenticated caller extractor.

use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use derive_more::Deref;
use uuid::Uuid;

use super::{AuthClaims, AuthHeader};
use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{Error, ErrorKind, Result};
use crate::service::SessionKeys;

/// A caller with a valid token whose email passes the domain policy.
///
/// Take `AuthState` on routes that require a signed-in user and
/// `Option<AuthState>` where anonymous callers are welcome; in the latter case
/// a missing token yields `None` while an invalid one is still rejected.
#[derive(Debug, Clone, Deref, PartialEq, Eq)]
pub struct AuthState(pub AuthClaims);

impl AuthState {
    /// Returns the caller's user id.
    #[inline]
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.0.user_id
    }

    fn from_verified_header(auth_header: AuthHeader, session_keys: &SessionKeys) -> Result<Self> {
        let auth_claims = auth_header.into_auth_claims();

        if !session_keys.domain_policy().is_allowed(&auth_claims.email) {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                user_id = %auth_claims.user_id,
                "Token email outside the allowed domain"
            );
            return Err(ErrorKind::Forbidden
                .with_message("This account is not permitted to use this site")
                .with_resource("authentication"));
        }

        Ok(Self(auth_claims))
    }
}

impl<S> FromRequestParts<S> for AuthState
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = AuthHeader::from_request_parts(parts, state).await?;
        Self::from_verified_header(auth_header, &SessionKeys::from_ref(state))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthState
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match AuthHeader::from_parts_optional(parts, state).await? {
            Some(auth_header) => {
                Self::from_verified_header(auth_header, &SessionKeys::from_ref(state)).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Returns the user id of an optional caller.
pub(crate) fn viewer_id(auth_state: &Option<AuthState>) -> Option<Uuid> {
    auth_state.as_ref().map(AuthState::user_id)
}
