use crate::{
    error::{RelayError, Result},
    models::{GenerationPayload, ImageOutput, ProviderImageResponse},
    provider::{generations_url, post_generation, ImageProvider, Strategy},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Parameters accepted by the client library's image call. The provider
/// answers with a hosted URL when no response format is requested.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HostedImageParams {
    pub model: String,
    pub prompt: String,
    pub width: i64,
    pub height: i64,
    pub steps: i64,
    pub n: u32,
    pub guidance: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub negative_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&GenerationPayload> for HostedImageParams {
    fn from(payload: &GenerationPayload) -> Self {
        Self {
            model: payload.model.clone(),
            prompt: payload.prompt.clone(),
            width: payload.width,
            height: payload.height,
            steps: payload.steps,
            n: payload.n,
            guidance: payload.guidance,
            negative_prompt: payload.negative_prompt.clone(),
            seed: payload.seed,
            image_url: payload.image_url.clone(),
        }
    }
}

/// Typed client for the provider's images API, authenticated with the
/// server's own key.
#[derive(Clone)]
pub struct ImagesClient {
    http: Client,
    url: String,
    api_key: String,
}

impl ImagesClient {
    pub fn new(http: Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            http,
            url: generations_url(base_url),
            api_key: api_key.into(),
        }
    }

    pub async fn generate(&self, params: &HostedImageParams) -> Result<ProviderImageResponse> {
        log::info!("Generating hosted image with model: {}", params.model);
        post_generation(
            &self.http,
            &self.url,
            &self.api_key,
            params,
            Strategy::HostedUrl,
        )
        .await
    }
}

#[derive(Clone)]
pub struct HostedUrlProvider {
    client: ImagesClient,
}

impl HostedUrlProvider {
    pub fn new(client: ImagesClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageProvider for HostedUrlProvider {
    fn strategy(&self) -> Strategy {
        Strategy::HostedUrl
    }

    async fn generate(
        &self,
        payload: &GenerationPayload,
        _caller_key: Option<&str>,
    ) -> Result<ImageOutput> {
        let params = HostedImageParams::from(payload);
        let completion = self.client.generate(&params).await?;

        let url = completion
            .first()
            .and_then(|data| data.url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                RelayError::malformed(Strategy::HostedUrl, "No image URL in response")
            })?;

        log::debug!("Provider hosted image at {}", url);
        Ok(ImageOutput::Hosted {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::merge_defaults;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn payload(value: serde_json::Value) -> GenerationPayload {
        match value {
            serde_json::Value::Object(map) => merge_defaults(map).unwrap(),
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn test_params_omit_response_format() {
        let params = HostedImageParams::from(&payload(json!({
            "prompt": "a cat",
            "model": "demo/model",
            "image_url": "https://example.com/base.jpg"
        })));
        let body = serde_json::to_value(&params).unwrap();

        assert!(body.get("response_format").is_none());
        assert!(body.get("negative_prompt").is_none());
        assert_eq!(body["n"], json!(1));
        assert_eq!(body["image_url"], json!("https://example.com/base.jpg"));
    }

    #[tokio::test]
    async fn test_returns_first_hosted_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/images/generations")
            .match_header("authorization", "Bearer server-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "demo/model",
                "prompt": "a cat",
                "width": 768,
                "steps": 4
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"url":"https://x/y.jpg"}]}"#)
            .create_async()
            .await;

        let provider =
            HostedUrlProvider::new(ImagesClient::new(Client::new(), &server.url(), "server-key"));
        let output = provider
            .generate(&payload(json!({"prompt": "a cat", "model": "demo/model"})), None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            output,
            ImageOutput::Hosted {
                url: "https://x/y.jpg".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_provider_failure_carries_provider_text() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/images/generations")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"message":"Model not available"}}"#)
            .create_async()
            .await;

        let provider =
            HostedUrlProvider::new(ImagesClient::new(Client::new(), &server.url(), "server-key"));
        let err = provider
            .generate(&payload(json!({"prompt": "a cat", "model": "nope"})), None)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Provider { .. }));
        assert_eq!(err.to_string(), "Model not available");
    }

    #[tokio::test]
    async fn test_missing_url_is_malformed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/images/generations")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"b64_json":"aGk="}]}"#)
            .create_async()
            .await;

        let provider =
            HostedUrlProvider::new(ImagesClient::new(Client::new(), &server.url(), "server-key"));
        let err = provider
            .generate(&payload(json!({"prompt": "a cat", "model": "demo/model"})), None)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::MalformedResponse { .. }));
    }
}
