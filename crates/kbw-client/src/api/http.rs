//! reqwest implementation of [`BlogApi`].

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use kbw_core::types::{
    Comment, EngagementKind, EngagementState, EngagementSummary, ModerationVerdict, Post,
    PostChanges, ReactionState, SubmitComment,
};
use kbw_core::{Error, ErrorKind, Result};
use regex::Regex;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use super::BlogApi;
use crate::TRACING_TARGET_API;
use crate::session::Session;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Matches `429` or `rate` anywhere in error text, ignoring case.
static RATE_LIMIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)429|rate").unwrap_or_else(|_| unreachable!("pattern is constant"))
});

/// Error body produced by the server.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug)]
struct HttpApiInner {
    http: Client,
    base_url: Url,
    session: Session,
}

/// [`BlogApi`] over HTTP, authenticated with the session's bearer token.
#[derive(Debug, Clone)]
pub struct HttpApi {
    inner: Arc<HttpApiInner>,
}

impl HttpApi {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: Url, session: Session) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("kbw-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self::with_client(http, base_url, session))
    }

    /// Creates a client reusing an existing reqwest [`Client`].
    pub fn with_client(http: Client, mut base_url: Url, session: Session) -> Self {
        // Relative joins replace the last segment unless the path ends in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        tracing::debug!(
            target: TRACING_TARGET_API,
            base_url = %base_url,
            "Creating API client"
        );

        Self {
            inner: Arc::new(HttpApiInner {
                http,
                base_url,
                session,
            }),
        }
    }

    /// Returns the API root.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .inner
            .base_url
            .join(path)
            .map_err(|e| Error::internal(format!("invalid API path: {path}")).with_source(e))?;

        let builder = self.inner.http.request(method, url);
        Ok(match self.inner.session.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(
                target: TRACING_TARGET_API,
                error = %e,
                "API request failed"
            );
            Error::unavailable("api", "the server could not be reached").with_source(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = error_from_response(status, &body);
        tracing::debug!(
            target: TRACING_TARGET_API,
            status = status.as_u16(),
            kind = %error.kind(),
            "API returned an error status"
        );
        Err(error)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.execute(builder).await?;
        response
            .json()
            .await
            .map_err(|e| Error::internal("unexpected response from the API").with_source(e))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        self.execute(builder).await?;
        Ok(())
    }
}

/// Returns whether error text talks about rate limiting.
pub(crate) fn mentions_rate_limit(text: &str) -> bool {
    RATE_LIMIT_PATTERN.is_match(text)
}

/// Maps a non-success response to the error taxonomy.
fn error_from_response(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|body| body.message)
        .unwrap_or_else(|_| body.trim().to_owned());
    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_owned()
    } else {
        message
    };

    if status == StatusCode::TOO_MANY_REQUESTS || mentions_rate_limit(body) {
        return Error::new(ErrorKind::RateLimited, message);
    }

    let kind = match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
        StatusCode::UNAUTHORIZED => ErrorKind::AuthenticationRequired,
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => ErrorKind::NotFoundOrForbidden,
        StatusCode::SERVICE_UNAVAILABLE => ErrorKind::ServiceUnavailable,
        status if status.is_server_error() => ErrorKind::Storage,
        _ => ErrorKind::Internal,
    };
    Error::new(kind, message)
}

fn engagement_path(post_id: Uuid, kind: EngagementKind) -> String {
    let segment = match kind {
        EngagementKind::Like => "likes",
        EngagementKind::Bookmark => "bookmarks",
    };
    format!("posts/{post_id}/{segment}")
}

#[async_trait::async_trait]
impl BlogApi for HttpApi {
    async fn submit_comment(&self, request: &SubmitComment) -> Result<ModerationVerdict> {
        let builder = self.request(Method::POST, "comments/moderate")?.json(request);
        self.send_json(builder).await
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let builder = self.request(Method::GET, &format!("posts/{post_id}/comments"))?;
        self.send_json(builder).await
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Comment> {
        let builder = self.request(Method::GET, &format!("comments/{comment_id}"))?;
        self.send_json(builder).await
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("comments/{comment_id}"))?;
        self.send_empty(builder).await
    }

    async fn toggle_reaction(&self, comment_id: Uuid) -> Result<ReactionState> {
        let path = format!("comments/{comment_id}/reactions");
        self.send_json(self.request(Method::POST, &path)?).await
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        self.send_json(self.request(Method::GET, "posts")?).await
    }

    async fn create_post(&self) -> Result<Post> {
        self.send_json(self.request(Method::POST, "posts")?).await
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Post> {
        let builder = self.request(Method::GET, &format!("posts/{post_id}"))?;
        self.send_json(builder).await
    }

    async fn update_post(&self, post_id: Uuid, changes: &PostChanges) -> Result<Post> {
        let builder = self
            .request(Method::PATCH, &format!("posts/{post_id}"))?
            .json(changes);
        self.send_json(builder).await
    }

    async fn publish_post(&self, post_id: Uuid) -> Result<Post> {
        let builder = self.request(Method::POST, &format!("posts/{post_id}/publish"))?;
        self.send_json(builder).await
    }

    async fn unpublish_post(&self, post_id: Uuid) -> Result<Post> {
        let builder = self.request(Method::POST, &format!("posts/{post_id}/unpublish"))?;
        self.send_json(builder).await
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("posts/{post_id}"))?;
        self.send_empty(builder).await
    }

    async fn toggle_engagement(
        &self,
        post_id: Uuid,
        kind: EngagementKind,
    ) -> Result<EngagementState> {
        let builder = self.request(Method::POST, &engagement_path(post_id, kind))?;
        self.send_json(builder).await
    }

    async fn engagement_summary(&self, post_id: Uuid) -> Result<EngagementSummary> {
        let builder = self.request(Method::GET, &format!("posts/{post_id}/engagement"))?;
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::session::SessionInfo;

    async fn spawn(app: Router) -> anyhow::Result<SocketAddr> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, app).await });
        Ok(addr)
    }

    fn api(addr: SocketAddr, session: Session) -> anyhow::Result<HttpApi> {
        Ok(HttpApi::new(format!("http://{addr}/api").parse()?, session)?)
    }

    #[tokio::test]
    async fn submit_sends_bearer_token() -> anyhow::Result<()> {
        let comment_id = Uuid::now_v7();
        let app = Router::new().route(
            "/api/comments/moderate",
            post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer session-token")
                );
                assert_eq!(body["content"], "Great writeup!");
                assert_eq!(body["parentId"], Value::Null);
                Json(json!({"approved": true, "commentId": comment_id}))
            }),
        );
        let addr = spawn(app).await?;
        let session = Session::signed_in(SessionInfo::new(
            Uuid::now_v7(),
            "ada@kbw.vc",
            "session-token",
        ));

        let request = SubmitComment {
            post_id: Uuid::now_v7(),
            content: "Great writeup!".to_owned(),
            parent_id: None,
        };
        let verdict = api(addr, session)?.submit_comment(&request).await?;
        assert!(verdict.approved);
        assert_eq!(verdict.comment_id, Some(comment_id));
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_calls_carry_no_token() -> anyhow::Result<()> {
        let app = Router::new().route(
            "/api/posts/{post_id}/engagement",
            get(|Path(_): Path<Uuid>, headers: HeaderMap| async move {
                assert!(headers.get("authorization").is_none());
                Json(json!({
                    "liked": false,
                    "bookmarked": false,
                    "likeCount": 3,
                    "bookmarkCount": 1,
                }))
            }),
        );
        let addr = spawn(app).await?;

        let summary = api(addr, Session::new())?
            .engagement_summary(Uuid::now_v7())
            .await?;
        assert_eq!(summary.like_count, 3);
        assert_eq!(summary.bookmark_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() -> anyhow::Result<()> {
        let app = Router::new().route(
            "/api/comments/moderate",
            post(|| async {
                (
                    AxumStatus::TOO_MANY_REQUESTS,
                    Json(json!({"name": "too_many_requests", "message": "Slow down"})),
                )
            }),
        );
        let addr = spawn(app).await?;

        let request = SubmitComment {
            post_id: Uuid::now_v7(),
            content: "hello".to_owned(),
            parent_id: None,
        };
        let error = api(addr, Session::new())?
            .submit_comment(&request)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::RateLimited);
        assert_eq!(error.message(), "Slow down");
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let error = api(addr, Session::new())?.list_posts().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ServiceUnavailable);
        assert!(error.is_retryable());
        Ok(())
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        let cases = [
            (StatusCode::BAD_REQUEST, ErrorKind::Validation),
            (StatusCode::UNAUTHORIZED, ErrorKind::AuthenticationRequired),
            (StatusCode::FORBIDDEN, ErrorKind::NotFoundOrForbidden),
            (StatusCode::NOT_FOUND, ErrorKind::NotFoundOrForbidden),
            (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::ServiceUnavailable),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Storage),
            (StatusCode::BAD_GATEWAY, ErrorKind::Storage),
        ];
        for (status, kind) in cases {
            assert_eq!(error_from_response(status, "").kind(), kind, "{status}");
        }
    }

    #[test]
    fn rate_text_wins_over_status() {
        let body = r#"{"name":"internal","message":"Rate limit exceeded"}"#;
        let error = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(error.kind(), ErrorKind::RateLimited);
        assert_eq!(error.message(), "Rate limit exceeded");

        let error = error_from_response(StatusCode::BAD_GATEWAY, "upstream said 429");
        assert_eq!(error.kind(), ErrorKind::RateLimited);

        let error = error_from_response(StatusCode::BAD_REQUEST, "content is empty");
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[test]
    fn rate_text_matches_anywhere() {
        for text in ["rate_limited", "ratelimit exceeded", "HTTP429", "RATE LIMIT"] {
            assert!(mentions_rate_limit(text), "{text}");
        }
        for text in ["content is empty", "post not found", "42 9"] {
            assert!(!mentions_rate_limit(text), "{text}");
        }
    }

    #[test]
    fn base_url_keeps_its_path() -> anyhow::Result<()> {
        let api = HttpApi::new("http://localhost:8080/api".parse()?, Session::new())?;
        assert_eq!(api.base_url().as_str(), "http://localhost:8080/api/");
        Ok(())
    }
}
