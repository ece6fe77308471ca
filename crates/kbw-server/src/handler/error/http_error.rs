//! HTTP error type returned by every handler and extractor.

use std::borrow::Cow;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::handler::response::ErrorResponse;

/// The error type for HTTP handlers.
///
/// The [`ErrorKind`] picks the status and the base body. Message, resource and
/// context override or extend that body when present.
#[derive(Debug, Clone)]
#[must_use = "errors do nothing unless serialized"]
pub struct Error<'a> {
    kind: ErrorKind,
    message: Option<Cow<'a, str>>,
    resource: Option<Cow<'a, str>>,
    context: Option<Cow<'a, str>>,
}

impl<'a> Error<'a> {
    /// Creates an error carrying only the base body of `kind`.
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            resource: None,
            context: None,
        }
    }

    /// Replaces the user-facing message.
    #[inline]
    pub fn with_message(mut self, message: impl Into<Cow<'a, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Names the resource the request was about, e.g. `comment` or `post`.
    #[inline]
    pub fn with_resource(mut self, resource: impl Into<Cow<'a, str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attaches machine-readable detail, such as a moderation category.
    #[inline]
    pub fn with_context(mut self, context: impl Into<Cow<'a, str>>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[inline]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    fn into_body(self) -> ErrorResponse<'a> {
        let mut body: ErrorResponse<'a> = self.kind.response();
        if let Some(message) = self.message {
            body = body.with_message(message);
        }
        if let Some(resource) = self.resource {
            body = body.with_resource(resource);
        }
        if let Some(context) = self.context {
            body = body.with_context(context);
        }
        body
    }
}

impl fmt::Display for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.kind.response();
        let message = self.message.as_deref().unwrap_or(&*base.message);
        write!(f, "{} ({}): {message}", base.name, base.status.as_u16())?;

        if let Some(resource) = &self.resource {
            write!(f, " [{resource}]")?;
        }
        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error<'_> {}

impl IntoResponse for Error<'_> {
    fn into_response(self) -> Response {
        self.into_body().into_response()
    }
}

impl From<ErrorKind> for Error<'static> {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// A specialized [`Result`] type for HTTP handlers.
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error<'static>> = std::result::Result<T, E>;

/// Every HTTP error the server produces.
#[must_use = "error kinds do nothing unless used to create errors"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400, a path segment was missing.
    MissingPathParam,
    /// 400, the body or a path segment failed validation, or the comment was rejected.
    BadRequest,
    /// 401, no bearer token on an owner-only route.
    MissingAuthToken,
    /// 401, the bearer token could not be decoded.
    MalformedAuthToken,
    /// 401, the token is expired or its signature does not verify.
    Unauthorized,
    /// 403, the session email falls outside the allowed domain.
    Forbidden,
    /// 404, missing, not visible to the caller, or not owned by the caller.
    NotFound,
    /// 429, the comment submission window is exhausted.
    TooManyRequests,
    /// 500, unexpected failure.
    InternalServerError,
    /// 500, an approved comment or a post write could not be persisted.
    StorageError,
    /// 503, the classifier or the database could not be reached.
    ServiceUnavailable,
}

impl ErrorKind {
    /// Converts this kind into an [`Error`] with the base body.
    #[inline]
    pub fn into_error(self) -> Error<'static> {
        Error::new(self)
    }

    /// Shorthand for `into_error().with_context(..)`.
    #[inline]
    pub fn with_context<'a>(self, context: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_context(context)
    }

    /// Shorthand for `into_error().with_message(..)`.
    #[inline]
    pub fn with_message<'a>(self, message: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_message(message)
    }

    /// Shorthand for `into_error().with_resource(..)`.
    #[inline]
    pub fn with_resource<'a>(self, resource: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_resource(resource)
    }

    #[inline]
    pub fn status_code(self) -> StatusCode {
        self.response().status
    }

    /// Returns the base response body for this kind.
    pub fn response(self) -> ErrorResponse<'static> {
        match self {
            Self::MissingPathParam => ErrorResponse::MISSING_PATH_PARAM,
            Self::BadRequest => ErrorResponse::BAD_REQUEST,
            Self::MissingAuthToken => ErrorResponse::MISSING_AUTH_TOKEN,
            Self::MalformedAuthToken => ErrorResponse::MALFORMED_AUTH_TOKEN,
            Self::Unauthorized => ErrorResponse::UNAUTHORIZED,
            Self::Forbidden => ErrorResponse::FORBIDDEN,
            Self::NotFound => ErrorResponse::NOT_FOUND,
            Self::TooManyRequests => ErrorResponse::TOO_MANY_REQUESTS,
            Self::InternalServerError => ErrorResponse::INTERNAL_SERVER_ERROR,
            Self::StorageError => ErrorResponse::STORAGE_ERROR,
            Self::ServiceUnavailable => ErrorResponse::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.response().name)
    }
}

impl IntoResponse for ErrorKind {
    #[inline]
    fn into_response(self) -> Response {
        self.response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_carries_resource_and_category() {
        let error = ErrorKind::BadRequest
            .with_message("Spam detected")
            .with_resource("comment")
            .with_context("spam");

        assert_eq!(error.kind(), ErrorKind::BadRequest);
        assert_eq!(error.message(), Some("Spam detected"));
        assert_eq!(error.context(), Some("spam"));
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn display_names_status_and_resource() {
        let display = ErrorKind::NotFound.with_resource("post").to_string();

        assert!(display.contains("not_found"));
        assert!(display.contains("404"));
        assert!(display.contains("[post]"));
    }

    #[test]
    fn status_codes() {
        assert_eq!(ErrorKind::TooManyRequests.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ErrorKind::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorKind::StorageError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ErrorKind::MissingAuthToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }
}
