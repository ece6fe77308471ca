//! Domain error to HTTP error conversion.

use crate::handler::{Error, ErrorKind};

/// Tracing target for domain error conversion.
const TRACING_TARGET: &str = "kbw_server::handler::error";

impl From<kbw_core::Error> for Error<'static> {
    fn from(error: kbw_core::Error) -> Self {
        use kbw_core::ErrorKind as Kind;

        match error.kind() {
            Kind::Validation => ErrorKind::BadRequest.with_message(error.message().to_owned()),
            Kind::RateLimited => {
                ErrorKind::TooManyRequests.with_context(error.message().to_owned())
            }
            Kind::ModerationRejected => {
                let error_builder = ErrorKind::BadRequest
                    .with_message(error.message().to_owned())
                    .with_resource("comment");
                match error.category() {
                    Some(category) => error_builder.with_context(category.to_string()),
                    None => error_builder,
                }
            }
            Kind::ServiceUnavailable => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "dependency unavailable"
                );
                ErrorKind::ServiceUnavailable.into_error()
            }
            Kind::NotFoundOrForbidden => ErrorKind::NotFound.into_error(),
            Kind::AuthenticationRequired => ErrorKind::MissingAuthToken.into_error(),
            Kind::Storage => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "storage failure"
                );
                ErrorKind::StorageError.into_error()
            }
            Kind::Internal => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "internal failure"
                );
                ErrorKind::InternalServerError.into_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use kbw_core::types::ModerationCategory;

    use super::*;

    #[test]
    fn maps_each_domain_kind() {
        let cases = [
            (kbw_core::Error::validation("empty"), ErrorKind::BadRequest),
            (kbw_core::Error::rate_limited(), ErrorKind::TooManyRequests),
            (
                kbw_core::Error::unavailable("classifier", "timeout"),
                ErrorKind::ServiceUnavailable,
            ),
            (kbw_core::Error::not_found("comment"), ErrorKind::NotFound),
            (
                kbw_core::Error::authentication_required(),
                ErrorKind::MissingAuthToken,
            ),
            (kbw_core::Error::storage("insert failed"), ErrorKind::StorageError),
            (kbw_core::Error::internal("bug"), ErrorKind::InternalServerError),
        ];

        for (domain, expected) in cases {
            assert_eq!(Error::from(domain).kind(), expected);
        }
    }

    #[test]
    fn not_found_hides_domain_message() {
        let error = Error::from(kbw_core::Error::not_found("comment"));
        assert!(error.message().is_none());
    }

    #[test]
    fn rejection_carries_category() {
        let error = Error::from(kbw_core::Error::rejected(
            "Spam detected",
            ModerationCategory::Spam,
        ));
        assert_eq!(error.message(), Some("Spam detected"));
        assert_eq!(error.context(), Some("spam"));
    }
}
