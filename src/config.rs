use crate::{
    error::{RelayError, Result},
    logger::LogLevel,
    provider::Strategy,
};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PROVIDER_URL: &str = "https://api.together.xyz";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub strategy: Strategy,
    pub provider: ProviderConfig,
    pub temp_dir: Option<PathBuf>,
    pub log_level: LogLevel,
    pub log_json: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            api_key: None,
        }
    }
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let base_url = non_empty_var("TOGETHER_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string());
        let api_key = non_empty_var("TOGETHER_API_KEY");

        ProviderConfig { base_url, api_key }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            strategy: Strategy::HostedUrl,
            provider: ProviderConfig::default(),
            temp_dir: None,
            log_level: LogLevel::Info,
            log_json: false,
        }
    }
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        let host = non_empty_var("RELAY_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match non_empty_var("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| RelayError::Config(format!("invalid PORT '{}'", value)))?,
            None => DEFAULT_PORT,
        };
        let strategy = match non_empty_var("RELAY_STRATEGY") {
            Some(value) => value.parse()?,
            None => Strategy::HostedUrl,
        };
        let log_level = match non_empty_var("RELAY_LOG_LEVEL") {
            Some(value) => value.parse()?,
            None => LogLevel::Info,
        };
        let log_json = non_empty_var("RELAY_LOG_JSON").map_or(false, |val| val == "true");

        let config = RelayConfig {
            host,
            port,
            strategy,
            provider: ProviderConfig::from_env(),
            temp_dir: non_empty_var("RELAY_TEMP_DIR").map(PathBuf::from),
            log_level,
            log_json,
        };
        config.validate()?;
        Ok(config)
    }

    /// The hosted strategy authenticates with the server's own key; the
    /// inline strategy takes the key from each request instead.
    pub fn validate(&self) -> Result<()> {
        if self.strategy == Strategy::HostedUrl && self.provider.api_key.is_none() {
            return Err(RelayError::Config(
                "TOGETHER_API_KEY is required for the hosted strategy".into(),
            ));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(RelayError::Config("provider base URL must not be empty".into()));
        }
        Ok(())
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_strategy_needs_server_key() {
        let config = RelayConfig::new();
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));

        let config = config.with_provider(ProviderConfig::new().with_api_key("secret"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inline_strategy_runs_without_server_key() {
        let config = RelayConfig::new().with_strategy(Strategy::InlineBase64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = RelayConfig::new()
            .with_host("0.0.0.0")
            .with_port(9000)
            .with_temp_dir("/tmp/relay");
        assert_eq!(config.bind_address(), ("0.0.0.0".to_string(), 9000));
        assert_eq!(config.temp_dir, Some(PathBuf::from("/tmp/relay")));
        assert_eq!(config.provider.base_url, DEFAULT_PROVIDER_URL);
    }
}
