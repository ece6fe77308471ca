//! Error taxonomy shared by every layer of the comment pipeline.
//!
//! Each [`ErrorKind`] maps to one user-facing condition. Callers branch on the
//! kind, never on the message text.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use crate::types::ModerationCategory;

/// Type alias for boxed errors that are Send + Sync.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for domain operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kind enumeration for categorizing domain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Local input failure: empty or over-length content, malformed email.
    Validation,
    /// The caller exceeded its request allowance and must slow down.
    RateLimited,
    /// The classifier judged the content unacceptable.
    ModerationRejected,
    /// The classifier or storage could not be reached. Retryable.
    ServiceUnavailable,
    /// The target does not exist or is not owned by the caller.
    NotFoundOrForbidden,
    /// The action requires a signed-in actor.
    AuthenticationRequired,
    /// Approved content could not be persisted.
    Storage,
    /// Internal logic errors.
    Internal,
}

impl ErrorKind {
    /// Returns the error kind as a string for categorization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::RateLimited => "rate_limited",
            Self::ModerationRejected => "moderation_rejected",
            Self::ServiceUnavailable => "service_unavailable",
            Self::NotFoundOrForbidden => "not_found",
            Self::AuthenticationRequired => "authentication_required",
            Self::Storage => "storage",
            Self::Internal => "internal",
        }
    }

    /// Returns whether an operation failing with this kind may be retried as-is.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::ServiceUnavailable | Self::Storage)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error with structured information.
///
/// Moderation rejections additionally carry the [`ModerationCategory`]
/// reported by the classifier so the submitter sees why their words were refused.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    category: Option<ModerationCategory>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new [`Error`].
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            category: None,
            source: None,
        }
    }

    /// Attaches a source error to this error.
    #[inline]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attaches the moderation category to this error.
    #[inline]
    pub fn with_category(mut self, category: ModerationCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Returns the error kind.
    #[must_use]
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the moderation category, if any.
    #[must_use]
    #[inline]
    pub const fn category(&self) -> Option<ModerationCategory> {
        self.category
    }

    /// Returns whether the failed operation may be retried as-is.
    #[must_use]
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Creates a new validation error.
    #[inline]
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates a new rate limit error.
    ///
    /// The message always mentions the rate limit so text-matching callers
    /// can recognize it.
    #[inline]
    pub fn rate_limited() -> Self {
        Self::new(
            ErrorKind::RateLimited,
            "rate limit exceeded, please wait before trying again",
        )
    }

    /// Creates a new moderation rejection carrying the classifier's reason.
    #[inline]
    pub fn rejected(reason: impl Into<Cow<'static, str>>, category: ModerationCategory) -> Self {
        Self::new(ErrorKind::ModerationRejected, reason).with_category(category)
    }

    /// Creates a new service unavailable error.
    #[inline]
    pub fn unavailable(
        service: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let full_message = format!("{}: {}", service.into(), message.into());
        Self::new(ErrorKind::ServiceUnavailable, full_message)
    }

    /// Creates a new not-found-or-forbidden error.
    ///
    /// The message deliberately does not say which of the two applies.
    #[inline]
    pub fn not_found(resource: &str) -> Self {
        Self::new(
            ErrorKind::NotFoundOrForbidden,
            format!("{resource} not found"),
        )
    }

    /// Creates a new authentication required error.
    #[inline]
    pub fn authentication_required() -> Self {
        Self::new(
            ErrorKind::AuthenticationRequired,
            "you must be signed in to do that",
        )
    }

    /// Creates a new storage error.
    #[inline]
    pub fn storage(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Creates a new internal error.
    #[inline]
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = Error::validation("comment cannot be empty");
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.message(), "comment cannot be empty");
        assert!(error.category().is_none());
    }

    #[test]
    fn test_rejection_carries_category() {
        let error = Error::rejected("Spam detected", ModerationCategory::Spam);
        assert_eq!(error.kind(), ErrorKind::ModerationRejected);
        assert_eq!(error.message(), "Spam detected");
        assert_eq!(error.category(), Some(ModerationCategory::Spam));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = Error::unavailable("classifier", "connection failed").with_source(source);

        assert!(StdError::source(&error).is_some());
        assert!(error.is_retryable());
        assert!(error.to_string().contains("classifier"));
    }

    #[test]
    fn test_rate_limited_message_mentions_rate() {
        let error = Error::rate_limited();
        assert!(error.message().contains("rate"));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::Validation.as_str(), "validation");
        assert_eq!(ErrorKind::RateLimited.as_str(), "rate_limited");
        assert_eq!(ErrorKind::NotFoundOrForbidden.as_str(), "not_found");
        assert_eq!(ErrorKind::Storage.as_str(), "storage");
    }
}
