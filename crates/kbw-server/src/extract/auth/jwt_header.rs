//! JWT bearer token extraction and claims.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::typed_header::TypedHeaderRejectionReason;
use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{Error, ErrorKind, Result};
use crate::service::SessionKeys;

/// Verified bearer token.
///
/// Cached in request extensions so several extractors in one request decode
/// the token once.
#[must_use]
#[derive(Debug, Clone)]
pub struct AuthHeader {
    auth_claims: AuthClaims,
}

impl AuthHeader {
    /// Returns the verified claims.
    #[inline]
    pub const fn as_auth_claims(&self) -> &AuthClaims {
        &self.auth_claims
    }

    /// Consumes the header and returns the verified claims.
    #[inline]
    pub fn into_auth_claims(self) -> AuthClaims {
        self.auth_claims
    }

    /// Decodes the Authorization header if one is present.
    ///
    /// Returns `Ok(None)` when the header is absent; any other failure is an error.
    pub(crate) async fn from_parts_optional<S>(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>>
    where
        S: Send + Sync,
        SessionKeys: FromRef<S>,
    {
        if let Some(auth_header) = parts.extensions.get::<Self>() {
            return Ok(Some(auth_header.clone()));
        }

        type AuthBearerHeader = TypedHeader<Authorization<Bearer>>;
        let session_keys = SessionKeys::from_ref(state);

        match AuthBearerHeader::from_request_parts(parts, state).await {
            Ok(TypedHeader(bearer)) => {
                let auth_claims = AuthClaims::decode(bearer.token(), session_keys.decoding_key())?;
                let auth_header = Self { auth_claims };
                parts.extensions.insert(auth_header.clone());
                Ok(Some(auth_header))
            }
            Err(rejection) => match rejection.reason() {
                TypedHeaderRejectionReason::Missing => Ok(None),
                TypedHeaderRejectionReason::Error(_) => Err(ErrorKind::MalformedAuthToken
                    .with_message("Invalid token format")
                    .with_context("Authorization header must contain a valid Bearer token")
                    .with_resource("authentication")),
                _ => Err(ErrorKind::InternalServerError
                    .with_message("Authentication processing failed")
                    .with_resource("authentication")),
            },
        }
    }
}

impl<S> FromRequestParts<S> for AuthHeader
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts_optional(parts, state)
            .await?
            .ok_or_else(|| {
                ErrorKind::MissingAuthToken
                    .with_message("Authentication required")
                    .with_context("Missing Authorization header with Bearer token")
                    .with_resource("authentication")
            })
    }
}

/// Claims carried by identity-provider access tokens.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthClaims {
    /// User id.
    #[serde(rename = "sub")]
    pub user_id: Uuid,
    /// Email address the user signed up with.
    pub email: String,
    /// Issued-at, seconds since the Unix epoch.
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiry, seconds since the Unix epoch.
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl AuthClaims {
    /// Creates claims for `user_id` valid for `lifetime` from now.
    pub fn new(user_id: Uuid, email: impl Into<String>, lifetime: SignedDuration) -> Self {
        let now = Timestamp::now();
        let expires_at = now.checked_add(lifetime).unwrap_or(now);
        Self {
            user_id,
            email: email.into(),
            issued_at: now.as_second(),
            expires_at: expires_at.as_second(),
        }
    }

    /// Returns whether the token has expired.
    #[inline]
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Timestamp::now().as_second()
    }

    /// Signs the claims into a compact HS256 token.
    pub fn encode(&self, encoding_key: &EncodingKey) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), self, encoding_key).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_AUTHENTICATION,
                error = %e,
                user_id = %self.user_id,
                "Failed to encode JWT token"
            );
            ErrorKind::InternalServerError.with_message("Authentication token generation failed")
        })
    }

    fn decode(token: &str, decoding_key: &DecodingKey) -> Result<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        let claims = decode::<Self>(token, decoding_key, &validation)?.claims;

        tracing::debug!(
            target: TRACING_TARGET_AUTHENTICATION,
            user_id = %claims.user_id,
            expires_at = claims.expires_at,
            "JWT token validated"
        );

        Ok(claims)
    }
}

impl From<JwtError> for Error<'static> {
    fn from(error: JwtError) -> Self {
        tracing::debug!(
            target: TRACING_TARGET_AUTHENTICATION,
            error = %error,
            "JWT token rejected"
        );

        match error.kind() {
            JwtErrorKind::ExpiredSignature => ErrorKind::Unauthorized
                .with_message("Your session has expired")
                .with_context("Please sign in again to continue"),
            JwtErrorKind::InvalidSignature => ErrorKind::Unauthorized
                .with_message("Authentication token verification failed"),
            JwtErrorKind::MissingRequiredClaim(claim) => ErrorKind::MalformedAuthToken
                .with_message("Authentication token is incomplete")
                .with_context(format!("Token is missing required field: {}", claim)),
            _ => ErrorKind::MalformedAuthToken.with_message("Authentication token is invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-for-hs256";

    #[test]
    fn claims_round_trip_through_token() -> anyhow::Result<()> {
        let claims = AuthClaims::new(Uuid::new_v4(), "ana@kbw.vc", SignedDuration::from_hours(1));
        let token = claims.encode(&EncodingKey::from_secret(SECRET))?;
        let decoded = AuthClaims::decode(&token, &DecodingKey::from_secret(SECRET))?;
        assert_eq!(decoded, claims);
        assert!(!decoded.is_expired());
        Ok(())
    }

    #[test]
    fn expired_token_is_unauthorized() -> anyhow::Result<()> {
        let claims = AuthClaims::new(Uuid::new_v4(), "ana@kbw.vc", SignedDuration::from_hours(-1));
        let token = claims.encode(&EncodingKey::from_secret(SECRET))?;
        let error = AuthClaims::decode(&token, &DecodingKey::from_secret(SECRET))
            .err()
            .ok_or_else(|| anyhow::anyhow!("expired token accepted"))?;
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        Ok(())
    }

    #[test]
    fn wrong_secret_is_rejected() -> anyhow::Result<()> {
        let claims = AuthClaims::new(Uuid::new_v4(), "ana@kbw.vc", SignedDuration::from_hours(1));
        let token = claims.encode(&EncodingKey::from_secret(SECRET))?;
        let result = AuthClaims::decode(&token, &DecodingKey::from_secret(b"another-secret"));
        assert!(result.is_err());
        Ok(())
    }
}
