use crate::{
    error::{RelayError, Result},
    models::{GenerationPayload, ImageOutput},
    provider::{generations_url, post_generation, ImageProvider, Strategy},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;

/// Calls the provider's REST endpoint directly with the caller's key and
/// decodes the base64 image embedded in the response.
#[derive(Clone)]
pub struct InlineBase64Provider {
    http: Client,
    url: String,
}

impl InlineBase64Provider {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            url: generations_url(base_url),
        }
    }
}

#[async_trait]
impl ImageProvider for InlineBase64Provider {
    fn strategy(&self) -> Strategy {
        Strategy::InlineBase64
    }

    async fn generate(
        &self,
        payload: &GenerationPayload,
        caller_key: Option<&str>,
    ) -> Result<ImageOutput> {
        let api_key = caller_key.ok_or_else(|| RelayError::bad_request("API key is required"))?;

        log::info!("Generating inline image with model: {}", payload.model);
        let response = post_generation(
            &self.http,
            &self.url,
            api_key,
            payload,
            Strategy::InlineBase64,
        )
        .await?;

        let encoded = response
            .first()
            .and_then(|data| data.b64_json.as_deref())
            .filter(|encoded| !encoded.trim().is_empty())
            .ok_or_else(|| {
                RelayError::malformed(Strategy::InlineBase64, "No image data in response")
            })?;

        let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
            RelayError::malformed(
                Strategy::InlineBase64,
                format!("Image data is not valid base64: {}", e),
            )
        })?;

        log::debug!("Decoded {} image bytes", bytes.len());
        Ok(ImageOutput::Inline { bytes })
    }
}
