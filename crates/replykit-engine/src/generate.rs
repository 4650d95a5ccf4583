//! Hosted reply-generation client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use replykit_protocols::error::ServiceError;
use replykit_protocols::{Suggestion, Usage};

use crate::prompt::PromptMessage;

/// Request body for the generation endpoint.
#[derive(Debug, Serialize)]
pub struct ReplyRequest {
    pub messages: Vec<PromptMessage>,
    pub tone: String,
    pub prompt: String,
    pub model: String,
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Response body from the generation endpoint.
#[derive(Debug, Deserialize)]
struct ReplyResponse {
    reply: String,
    usage: Option<u32>,
    limit: Option<u32>,
}

/// Client for the hosted reply-generation endpoint.
pub struct ReplyClient {
    client: reqwest::Client,
    url: String,
}

impl ReplyClient {
    /// Create a client posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }

    /// Ask the service for a reply.
    pub async fn generate(&self, request: &ReplyRequest) -> Result<Suggestion, ServiceError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: Option<serde_json::Value> = serde_json::from_str(&body).ok();
            let message = parsed
                .as_ref()
                .and_then(|v| v["error"].as_str().map(String::from))
                .unwrap_or(body);

            let mut error = ServiceError::from_status(status, message);
            // The quota response carries the plan limit so the UI can show
            // an upgrade path instead of a dead end.
            if let ServiceError::QuotaExceeded { limit } = &mut error {
                *limit = parsed.as_ref().and_then(|v| v["limit"].as_u64()).map(|l| l as u32);
            }
            return Err(error);
        }

        let body: ReplyResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
        if body.reply.is_empty() {
            return Err(ServiceError::InvalidResponse("Empty reply".to_string()));
        }

        debug!("Generated {} chars with {}", body.reply.len(), request.model);
        let mut suggestion = Suggestion::new(body.reply, request.model.clone());
        if let Some(used) = body.usage {
            suggestion = suggestion.with_usage(Usage {
                used,
                limit: body.limit,
            });
        }
        Ok(suggestion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn request() -> ReplyRequest {
        ReplyRequest {
            messages: vec![PromptMessage::user("hi")],
            tone: "friendly".to_string(),
            prompt: String::new(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
        }
    }

    #[test]
    fn test_request_serialization() {
        let mut req = request();
        req.api_key = Some("sk-1".to_string());
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["apiKey"], "sk-1");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["tone"], "friendly");
    }

    #[test]
    fn test_request_skips_absent_api_key() {
        let value = serde_json::to_value(request()).unwrap();
        assert!(value.get("apiKey").is_none());
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "reply": "Sure, sending it now!",
                "usage": 12,
                "limit": 100
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReplyClient::new(format!("{}/generate", server.uri()));
        let suggestion = client.generate(&request()).await.unwrap();
        assert_eq!(suggestion.reply, "Sure, sending it now!");
        let usage = suggestion.usage.unwrap();
        assert_eq!(usage.used, 12);
        assert_eq!(usage.limit, Some(100));
    }

    #[tokio::test]
    async fn test_generate_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "sign in"})))
            .mount(&server)
            .await;

        let client = ReplyClient::new(server.uri());
        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_generate_quota_exceeded_carries_limit() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(402)
                    .set_body_json(json!({"error": "limit reached", "limit": 100})),
            )
            .mount(&server)
            .await;

        let client = ReplyClient::new(server.uri());
        let err = client.generate(&request()).await.unwrap_err();
        match err {
            ServiceError::QuotaExceeded { limit } => assert_eq!(limit, Some(100)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_server_error() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ReplyClient::new(server.uri());
        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_generate_empty_reply_rejected() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": ""})))
            .mount(&server)
            .await;

        let client = ReplyClient::new(server.uri());
        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }
}
