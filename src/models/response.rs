use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// What a provider hands back before the relay turns it into bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutput {
    /// Image hosted by the provider; must be fetched separately.
    Hosted { url: String },
    /// Image bytes already decoded from the provider response.
    Inline { bytes: Vec<u8> },
}

/// A finished image ready to be written to the caller.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
    pub attachment: bool,
}

impl GeneratedImage {
    pub fn new(bytes: Vec<u8>, attachment: bool) -> Self {
        Self {
            bytes,
            content_type: IMAGE_CONTENT_TYPE,
            filename: timestamped_filename(Local::now()),
            attachment,
        }
    }
}

pub fn timestamped_filename(now: DateTime<Local>) -> String {
    format!("generated_image_{}.jpg", now.format("%Y%m%d_%H%M%S"))
}

/// `/v1/images/generations` success body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderImageResponse {
    #[serde(default)]
    pub data: Option<Vec<ProviderImageData>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderImageData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub b64_json: Option<String>,
}

impl ProviderImageResponse {
    pub fn first(&self) -> Option<&ProviderImageData> {
        self.data.as_ref().and_then(|data| data.first())
    }
}

/// Pulls a readable message out of a provider error body. Providers answer
/// either `{"error": {"message": ..}}`, `{"error": ".."}` or plain text.
pub fn provider_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let message = match serde_json::from_str::<Value>(trimmed) {
        Ok(json) => match json.get("error") {
            Some(Value::Object(error)) => error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            Some(Value::String(error)) => Some(error.clone()),
            _ => json
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        Err(_) => None,
    };
    Some(message.unwrap_or_else(|| trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filename_is_timestamped() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(timestamped_filename(now), "generated_image_20240309_070501.jpg");
    }

    #[test]
    fn test_first_element_lookup() {
        let response: ProviderImageResponse =
            serde_json::from_str(r#"{"data":[{"url":"https://x/y.jpg"},{"url":"https://x/z.jpg"}]}"#)
                .unwrap();
        assert_eq!(
            response.first().and_then(|d| d.url.as_deref()),
            Some("https://x/y.jpg")
        );

        let empty: ProviderImageResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(empty.first().is_none());

        let missing: ProviderImageResponse = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert!(missing.first().is_none());
    }

    #[test]
    fn test_provider_error_message_shapes() {
        assert_eq!(
            provider_error_message(r#"{"error":{"message":"invalid model","type":"invalid_request_error"}}"#),
            Some("invalid model".to_string())
        );
        assert_eq!(
            provider_error_message(r#"{"error":"unauthorized"}"#),
            Some("unauthorized".to_string())
        );
        assert_eq!(
            provider_error_message("upstream exploded"),
            Some("upstream exploded".to_string())
        );
        assert_eq!(provider_error_message("   "), None);
    }
}
