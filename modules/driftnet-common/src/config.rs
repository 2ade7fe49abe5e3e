use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment-sourced settings: secrets, endpoints, and machine-local paths.
/// What to ingest lives in the TOML [`IngestConfig`](crate::IngestConfig).
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Storage
    pub data_dir: PathBuf,
    pub database_url: Option<String>,

    // Rendering
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub chrome_bin: String,

    // Function server
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            data_dir: std::env::var("DRIFTNET_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            database_url: std::env::var("DATABASE_URL").ok(),
            browserless_url: std::env::var("BROWSERLESS_URL").ok(),
            browserless_token: std::env::var("BROWSERLESS_TOKEN").ok(),
            chrome_bin: std::env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string()),
            host: std::env::var("DRIFTNET_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("DRIFTNET_PORT")
                .unwrap_or_else(|_| "5004".to_string())
                .parse()
                .context("DRIFTNET_PORT must be a number")?,
        };

        config.log_redacted();
        Ok(config)
    }

    pub fn log_redacted(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let head: String = v.chars().take(5).collect();
                    format!("{head}...({} chars)", v.len())
                }
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DRIFTNET_DATA_DIR: {}", self.data_dir.display());
        tracing::info!("  DATABASE_URL: {}", preview_opt(&self.database_url));
        tracing::info!("  BROWSERLESS_URL: {}", preview_opt(&self.browserless_url));
        tracing::info!("  BROWSERLESS_TOKEN: {}", preview_opt(&self.browserless_token));
        tracing::info!("  CHROME_BIN: {}", self.chrome_bin);
        tracing::info!("  DRIFTNET_HOST/PORT: {}:{}", self.host, self.port);
    }
}
