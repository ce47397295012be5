pub mod config;
pub mod download;
pub mod error;
pub mod logger;
pub mod models;
pub mod provider;
pub mod relay;
pub mod server;

pub use config::{ProviderConfig, RelayConfig};
pub use error::{ErrorBody, RelayError, Result};
pub use models::*;
pub use provider::{HostedUrlProvider, ImageProvider, InlineBase64Provider, Strategy};
pub use relay::Relay;
