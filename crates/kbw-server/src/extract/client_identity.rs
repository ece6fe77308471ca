//! Caller identification for rate limiting.

use std::convert::Infallible;
use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

/// Header set by proxies with the originating client first.
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Header set by proxies with the single client address.
const X_REAL_IP: &str = "x-real-ip";

/// Best-effort name of the caller.
///
/// Picks the first `X-Forwarded-For` entry, then `X-Real-IP`. Callers that
/// carry neither share the single [`ClientIdentity::Anonymous`] bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    /// Address reported by a proxy header.
    Address(String),
    /// Fallback bucket shared by every unattributable caller.
    Anonymous,
}

impl ClientIdentity {
    /// Resolves the identity from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let real_ip = || {
            headers
                .get(X_REAL_IP)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        match forwarded.or_else(real_ip) {
            Some(address) => Self::Address(address.to_owned()),
            None => Self::Anonymous,
        }
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => f.write_str(address),
            Self::Anonymous => f.write_str("anonymous"),
        }
    }
}

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::{HeaderName, HeaderValue};
    use axum::routing::get;
    use axum_test::TestServer;

    use super::*;

    async fn handler(identity: ClientIdentity) -> String {
        identity.to_string()
    }

    fn server() -> anyhow::Result<TestServer> {
        let router = Router::new().route("/", get(handler));
        Ok(TestServer::new(router)?)
    }

    #[tokio::test]
    async fn prefers_first_forwarded_entry() -> anyhow::Result<()> {
        let response = server()?
            .get("/")
            .add_header(
                HeaderName::from_static(X_FORWARDED_FOR),
                HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
            )
            .add_header(
                HeaderName::from_static(X_REAL_IP),
                HeaderValue::from_static("10.0.0.2"),
            )
            .await;

        assert_eq!(response.text(), "203.0.113.7");
        Ok(())
    }

    #[tokio::test]
    async fn falls_back_to_real_ip() -> anyhow::Result<()> {
        let response = server()?
            .get("/")
            .add_header(
                HeaderName::from_static(X_REAL_IP),
                HeaderValue::from_static("198.51.100.4"),
            )
            .await;

        assert_eq!(response.text(), "198.51.100.4");
        Ok(())
    }

    #[tokio::test]
    async fn unattributable_callers_share_one_bucket() -> anyhow::Result<()> {
        let response = server()?.get("/").await;
        assert_eq!(response.text(), "anonymous");

        let headers = HeaderMap::new();
        assert_eq!(ClientIdentity::from_headers(&headers), ClientIdentity::Anonymous);
        Ok(())
    }
}
