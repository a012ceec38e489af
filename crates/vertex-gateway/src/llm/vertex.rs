//! Vertex AI predict client
//!
//! One HTTP call per `predict`; retries and caching live in the executor.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::types::{PredictRequest, PredictResponse};
use super::TextModel;
use crate::error::UpstreamError;
use crate::settings::Settings;

pub struct VertexClient {
    client: Client,
    settings: Arc<Settings>,
}

impl VertexClient {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl TextModel for VertexClient {
    async fn predict(
        &self,
        model: &str,
        request: &PredictRequest,
    ) -> Result<PredictResponse, UpstreamError> {
        let url = self.settings.predict_url(model);
        debug!(model, url = %url, "Sending predict request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.access_token)
            .timeout(self.settings.request_timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<PredictResponse>()
                .await
                .map_err(|e| UpstreamError::ParseError(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(UpstreamError::from_status(status.as_u16(), body))
    }

    fn name(&self) -> &str {
        "vertex-ai"
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PREDICT_PATH: &str =
        "/v1/projects/test-project/locations/us-central1/publishers/google/models/text-bison:predict";

    fn client_for(server: &MockServer) -> VertexClient {
        let settings = Settings::new("test-token", "test-project", "us-central1")
            .with_endpoint(server.uri())
            .with_timeout(Duration::from_secs(5));
        VertexClient::new(Arc::new(settings))
    }

    #[tokio::test]
    async fn test_successful_predict() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({
                "instances": [{"prompt": "hi"}],
                "parameters": {"temperature": 0.5, "maxOutputTokens": 20, "topP": 0.8, "topK": 40}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{"content": "hello there"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client
            .predict("text-bison", &PredictRequest::new("hi", 0.5, 20))
            .await
            .unwrap();

        assert_eq!(response.text().unwrap(), "hello there");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .predict("text-bison", &PredictRequest::new("hi", 0.5, 20))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::ServerError(503, ref body) if body == "unavailable"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unauthorized_is_terminal() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .predict("text-bison", &PredictRequest::new("hi", 0.5, 20))
            .await
            .unwrap_err();

        assert_eq!(err, UpstreamError::Unauthorized);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .predict("text-bison", &PredictRequest::new("hi", 0.5, 20))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_retryable() {
        // Bind an ephemeral port, then release it so nothing listens there
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let settings = Settings::new("t", "test-project", "us-central1")
            .with_endpoint(format!("http://{addr}"));
        let client = VertexClient::new(Arc::new(settings));

        let err = client
            .predict("text-bison", &PredictRequest::new("hi", 0.5, 20))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Connection(_)), "unexpected error: {err:?}");
        assert!(err.is_retryable());
    }
}
