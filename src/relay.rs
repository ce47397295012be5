use crate::{
    config::RelayConfig,
    download::download_to_temp,
    error::{RelayError, Result},
    logger,
    models::{
        caller_api_key, merge_defaults, GeneratedImage, GenerationRequest, ImageOutput,
    },
    provider::{build_provider, ImageProvider, Strategy},
};
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Request pipeline shared by every worker: validate, merge defaults,
/// dispatch to the provider, turn its output into bytes.
#[derive(Clone)]
pub struct Relay {
    provider: Arc<dyn ImageProvider>,
    http: Client,
    temp_dir: Option<PathBuf>,
}

impl Relay {
    pub fn new(provider: Arc<dyn ImageProvider>, http: Client, temp_dir: Option<PathBuf>) -> Self {
        Self {
            provider,
            http,
            temp_dir,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let http = Client::new();
        let provider = build_provider(config, http.clone())?;
        Ok(Self::new(provider, http, config.temp_dir.clone()))
    }

    pub fn strategy(&self) -> Strategy {
        self.provider.strategy()
    }

    pub async fn process(
        &self,
        request: GenerationRequest,
        request_id: &str,
    ) -> Result<GeneratedImage> {
        let strategy = self.strategy();

        let caller_key = if strategy.requires_caller_key() {
            let key = caller_api_key(&request)
                .ok_or_else(|| RelayError::bad_request("API key is required"))?;
            Some(key.to_string())
        } else {
            None
        };

        let payload = merge_defaults(request)?;
        log::debug!(
            "[{}] payload ready: model={} {}x{} steps={}",
            request_id,
            payload.model,
            payload.width,
            payload.height,
            payload.steps
        );

        let output = {
            let _timer = logger::timer(&format!("[{}] provider call", request_id));
            self.provider
                .generate(&payload, caller_key.as_deref())
                .await?
        };

        let bytes = self.resolve(output, request_id).await?;
        Ok(GeneratedImage::new(bytes, strategy.serves_attachment()))
    }

    async fn resolve(&self, output: ImageOutput, request_id: &str) -> Result<Vec<u8>> {
        match output {
            ImageOutput::Inline { bytes } => Ok(bytes),
            ImageOutput::Hosted { url } => {
                log::info!("[{}] downloading generated image", request_id);
                let artifact = download_to_temp(&self.http, &url, self.temp_dir.as_deref()).await?;
                artifact.read().await
            }
        }
    }
}

/// Rejects bodies that are not declared as JSON. `+json` media types and
/// parameters such as `charset` are accepted.
pub fn require_json(content_type: Option<&str>) -> Result<()> {
    let essence = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
    {
        Ok(())
    } else {
        Err(RelayError::bad_request(
            "Content-Type must be application/json",
        ))
    }
}

/// Decodes a request body into a JSON object.
pub fn parse_request(body: &[u8]) -> Result<GenerationRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RelayError::bad_request("Request body must be a JSON object"));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(RelayError::bad_request("Request body must be a JSON object")),
    }
}
