use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path as AxumPath};
use axum::http::request::Parts;
use derive_more::{Deref, DerefMut, From};
use serde::de::DeserializeOwned;

use crate::handler::{Error, ErrorKind};

/// Path parameter extractor that rejects with the shared error body.
///
/// [`Path`]: AxumPath
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct Path<T>(pub T);

impl<T> Path<T> {
    /// Returns the inner path parameters.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let extractor =
            <AxumPath<T> as FromRequestParts<S>>::from_request_parts(parts, state).await;
        extractor.map(|x| Self(x.0)).map_err(Into::into)
    }
}

impl From<PathRejection> for Error<'static> {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(err) => {
                let error_message = err.body_text();
                let hint = if error_message.to_lowercase().contains("uuid") {
                    "Identifiers must be UUIDs: xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"
                } else {
                    "Check that the parameter format matches the expected type"
                };

                ErrorKind::BadRequest
                    .with_message("Invalid path parameter format")
                    .with_context(hint)
            }
            PathRejection::MissingPathParams(_) => ErrorKind::MissingPathParam
                .with_message("Required path parameter missing"),
            _ => ErrorKind::InternalServerError
                .with_message("Path processing failed"),
        }
    }
}
