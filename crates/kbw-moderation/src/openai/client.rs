//! Chat-completions client implementing [`ClassifierProvider`].

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ClassifierConfig;
use crate::{ClassifierProvider, ClassifyRequest, Error, Result, TRACING_TARGET_CLIENT};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug)]
struct OpenAiClassifierInner {
    http: Client,
    endpoint: Url,
    config: ClassifierConfig,
}

/// Classifier backed by an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiClassifier {
    inner: Arc<OpenAiClassifierInner>,
}

impl OpenAiClassifier {
    /// Creates a new classifier client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            base_url = %config.classifier_base_url,
            model = %config.classifier_model,
            timeout_secs = config.classifier_timeout_secs,
            "Creating classifier client"
        );

        config.validate()?;
        let endpoint = config.completions_url()?;
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            inner: Arc::new(OpenAiClassifierInner {
                http,
                endpoint,
                config,
            }),
        })
    }
}

#[async_trait::async_trait]
impl ClassifierProvider for OpenAiClassifier {
    async fn classify(&self, request: &ClassifyRequest) -> Result<String> {
        let inner = &self.inner;
        let body = ChatRequest {
            model: &inner.config.classifier_model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.content,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut builder = inner.http.post(inner.endpoint.clone()).json(&body);
        if let Some(api_key) = &inner.config.classifier_api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                status = status.as_u16(),
                "Classifier returned an error status"
            );
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(Error::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    async fn spawn(app: Router) -> anyhow::Result<SocketAddr> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, app).await });
        Ok(addr)
    }

    fn request() -> ClassifyRequest {
        ClassifyRequest::new("policy", "Great writeup, thanks!")
    }

    #[tokio::test]
    async fn returns_message_content() -> anyhow::Result<()> {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "test-model");
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["content"], "Great writeup, thanks!");
                assert_eq!(body["response_format"]["type"], "json_object");
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer sk-test")
                );
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "{\"approved\": true}"}}]
                }))
            }),
        );
        let addr = spawn(app).await?;

        let config = ClassifierConfig::new(format!("http://{addr}/v1"))
            .with_api_key("sk-test")
            .with_model("test-model");
        let client = OpenAiClassifier::new(config)?;

        assert_eq!(client.classify(&request()).await?, "{\"approved\": true}");
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_transport_failure() -> anyhow::Result<()> {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { StatusCode::BAD_GATEWAY }),
        );
        let addr = spawn(app).await?;
        let client = OpenAiClassifier::new(ClassifierConfig::new(format!("http://{addr}/v1")))?;

        let error = client.classify(&request()).await.unwrap_err();
        assert!(matches!(error, Error::Status { status: 502 }));
        Ok(())
    }

    #[tokio::test]
    async fn missing_choices_is_empty_response() -> anyhow::Result<()> {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let addr = spawn(app).await?;
        let client = OpenAiClassifier::new(ClassifierConfig::new(format!("http://{addr}/v1")))?;

        let error = client.classify(&request()).await.unwrap_err();
        assert!(matches!(error, Error::EmptyResponse));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_reqwest_error() -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let client = OpenAiClassifier::new(ClassifierConfig::new(format!("http://{addr}/v1")))?;
        let error = client.classify(&request()).await.unwrap_err();
        assert!(matches!(error, Error::Reqwest(_)));
        Ok(())
    }
}
