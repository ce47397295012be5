use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RelayError, Result};

pub const REQUIRED_FIELDS: [&str; 2] = ["prompt", "model"];

pub const DEFAULT_STEPS: i64 = 4;
pub const DEFAULT_WIDTH: i64 = 768;
pub const DEFAULT_HEIGHT: i64 = 768;
pub const DEFAULT_GUIDANCE: f64 = 3.5;
pub const FORCED_COUNT: u32 = 1;
pub const FORCED_RESPONSE_FORMAT: &str = "base64";

/// Caller credential for the inline strategy. Stripped before the payload
/// is built so it never reaches the provider body.
pub const API_KEY_FIELD: &str = "api_key";

/// The decoded JSON body of a `/generate-image` call.
pub type GenerationRequest = Map<String, Value>;

/// Merged payload sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationPayload {
    pub model: String,
    pub prompt: String,
    pub width: i64,
    pub height: i64,
    pub steps: i64,
    pub n: u32,
    pub guidance: f64,
    pub negative_prompt: String,
    pub seed: Option<i64>,
    pub response_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Caller fields the relay does not interpret, forwarded as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Checks required fields in a fixed order and reports the first one that
/// is absent, null or blank. Field types are not checked here.
pub fn validate_request(request: &GenerationRequest) -> Result<()> {
    for field in REQUIRED_FIELDS {
        if is_blank(request.get(field)) {
            return Err(RelayError::bad_request(format!(
                "Field '{}' is required",
                field
            )));
        }
    }
    Ok(())
}

/// Extracts the caller-supplied provider key, if any.
pub fn caller_api_key(request: &GenerationRequest) -> Option<&str> {
    request
        .get(API_KEY_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Layers the caller's fields over the defaults table. `n` and
/// `response_format` are always overwritten with the forced values.
pub fn merge_defaults(mut request: GenerationRequest) -> Result<GenerationPayload> {
    validate_request(&request)?;

    request.remove(API_KEY_FIELD);
    request.remove("n");
    request.remove("response_format");

    let model = coerce_text(request.remove("model")).unwrap_or_default();
    let prompt = coerce_text(request.remove("prompt")).unwrap_or_default();
    let width = coerce_int("width", request.remove("width"))?.unwrap_or(DEFAULT_WIDTH);
    let height = coerce_int("height", request.remove("height"))?.unwrap_or(DEFAULT_HEIGHT);
    let steps = coerce_int("steps", request.remove("steps"))?.unwrap_or(DEFAULT_STEPS);
    let guidance =
        coerce_float("guidance", request.remove("guidance"))?.unwrap_or(DEFAULT_GUIDANCE);
    let seed = coerce_int("seed", request.remove("seed"))?;
    let negative_prompt = coerce_text(request.remove("negative_prompt")).unwrap_or_default();
    let image_url = coerce_text(request.remove("image_url"));

    Ok(GenerationPayload {
        model,
        prompt,
        width,
        height,
        steps,
        n: FORCED_COUNT,
        guidance,
        negative_prompt,
        seed,
        response_format: FORCED_RESPONSE_FORMAT.to_string(),
        image_url,
        extra: request,
    })
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

fn coerce_text(value: Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    }
}

// Floats are truncated the way an integer cast would; bounds are not checked.
fn coerce_int(field: &str, value: Option<Value>) -> Result<Option<i64>> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    parsed.map(Some).ok_or_else(|| not_a_number(field))
}

fn coerce_float(field: &str, value: Option<Value>) -> Result<Option<f64>> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed.map(Some).ok_or_else(|| not_a_number(field))
}

fn not_a_number(field: &str) -> RelayError {
    RelayError::bad_request(format!("Field '{}' must be a number", field))
}
