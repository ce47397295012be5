pub mod hosted;
pub mod inline;

use crate::{
    config::RelayConfig,
    error::{RelayError, Result},
    models::{provider_error_message, GenerationPayload, ImageOutput, ProviderImageResponse},
};
use actix_web::http::StatusCode;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use hosted::{HostedImageParams, HostedUrlProvider, ImagesClient};
pub use inline::InlineBase64Provider;

pub const GENERATIONS_PATH: &str = "/v1/images/generations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Provider returns a hosted URL that the relay downloads.
    HostedUrl,
    /// Provider returns the image inline as base64.
    InlineBase64,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::HostedUrl => "hosted",
            Strategy::InlineBase64 => "inline",
        }
    }

    /// Status reported to the caller when the provider call fails.
    pub fn failure_status(&self) -> StatusCode {
        match self {
            Strategy::HostedUrl => StatusCode::INTERNAL_SERVER_ERROR,
            Strategy::InlineBase64 => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn requires_caller_key(&self) -> bool {
        matches!(self, Strategy::InlineBase64)
    }

    /// Hosted downloads are served as attachments, inline images are shown.
    pub fn serves_attachment(&self) -> bool {
        matches!(self, Strategy::HostedUrl)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = RelayError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hosted" | "sdk" | "url" => Ok(Strategy::HostedUrl),
            "inline" | "raw" | "raw-http" | "base64" => Ok(Strategy::InlineBase64),
            other => Err(RelayError::Config(format!("unknown strategy '{}'", other))),
        }
    }
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn strategy(&self) -> Strategy;

    async fn generate(
        &self,
        payload: &GenerationPayload,
        caller_key: Option<&str>,
    ) -> Result<ImageOutput>;
}

/// Builds the provider selected by the configuration.
pub fn build_provider(config: &RelayConfig, http: Client) -> Result<Arc<dyn ImageProvider>> {
    let provider: Arc<dyn ImageProvider> = match config.strategy {
        Strategy::HostedUrl => {
            let api_key = config.provider.api_key.clone().ok_or_else(|| {
                RelayError::Config("TOGETHER_API_KEY is required for the hosted strategy".into())
            })?;
            let client = ImagesClient::new(http, &config.provider.base_url, api_key);
            Arc::new(HostedUrlProvider::new(client))
        }
        Strategy::InlineBase64 => {
            Arc::new(InlineBase64Provider::new(http, &config.provider.base_url))
        }
    };
    Ok(provider)
}

pub(crate) fn generations_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), GENERATIONS_PATH)
}

/// POSTs a generation body and parses the provider's answer. Transport
/// failures and non-2xx statuses become provider errors carrying the
/// provider's own text; an unparseable success body is malformed.
pub(crate) async fn post_generation<B: Serialize + ?Sized>(
    http: &Client,
    url: &str,
    api_key: &str,
    body: &B,
    strategy: Strategy,
) -> Result<ProviderImageResponse> {
    let response = http
        .post(url)
        .bearer_auth(api_key)
        .header(reqwest::header::ACCEPT, "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| RelayError::provider(strategy, format!("Provider request failed: {}", e)))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| RelayError::provider(strategy, format!("Provider response unreadable: {}", e)))?;

    if !status.is_success() {
        let message = provider_error_message(&text)
            .unwrap_or_else(|| format!("Provider returned HTTP {}", status.as_u16()));
        return Err(RelayError::provider(strategy, message));
    }

    serde_json::from_str(&text).map_err(|e| {
        RelayError::malformed(strategy, format!("Provider response is not valid JSON: {}", e))
    })
}
