//! Liveness check.

use axum::Router;
use axum::http::StatusCode;

use crate::extract::Json;
use crate::handler::Result;
use crate::handler::response::Health;
use crate::service::ServiceState;

#[tracing::instrument(skip_all)]
async fn health_status() -> Result<(StatusCode, Json<Health>)> {
    Ok((StatusCode::OK, Json(Health::healthy())))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    use axum::routing::*;

    Router::new().route("/health", get(health_status))
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;
    use kbw_moderation::MockClassifier;

    use crate::handler::monitors::routes;
    use crate::handler::test::TestContext;

    #[tokio::test]
    async fn health_reports_version() -> anyhow::Result<()> {
        let ctx = TestContext::new(MockClassifier::approving()).await?;
        let server = ctx.server(routes())?;

        let response = server.get("/health").await;
        response.assert_status(StatusCode::OK);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        Ok(())
    }
}
