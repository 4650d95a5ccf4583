//! Hosted audio-analysis client.
//!
//! Voice notes go up as base64; back comes a structured read of the
//! message: transcript, sentiment, buying signals, urgency, a suggested
//! strategy and a ready-to-send reply.

use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use replykit_protocols::error::ServiceError;

/// Request body for the analysis endpoint.
#[derive(Debug, Serialize)]
struct AudioRequest<'a> {
    audio: &'a str,
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

/// Structured analysis of one voice message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAnalysis {
    pub transcript: String,
    pub sentiment: String,
    #[serde(default)]
    pub buying_signals: Vec<String>,
    pub urgency: String,
    pub strategy: String,
    pub suggested_reply: String,
}

/// Client for the hosted audio-analysis endpoint.
pub struct AudioClient {
    client: reqwest::Client,
    url: String,
}

impl AudioClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }

    /// Analyze raw audio bytes.
    pub async fn analyze(
        &self,
        audio: &[u8],
        api_key: Option<&str>,
    ) -> Result<AudioAnalysis, ServiceError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(audio);
        let request = AudioRequest {
            audio: &encoded,
            api_key,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }
}
