use image_relay::{
    logger::{self, LoggerConfig},
    server, Relay, RelayConfig,
};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    let config = RelayConfig::from_env()?;
    logger::init_with_config(LoggerConfig::from_relay_config(&config))?;

    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.host,
        config.port,
    );
    logger::log_config_info(&config);

    let relay = match Relay::from_config(&config) {
        Ok(relay) => relay,
        Err(e) => {
            log::error!("❌ Failed to initialize relay: {}", e);
            return Err(e.into());
        }
    };

    server::run(relay, &config).await?;
    Ok(())
}
