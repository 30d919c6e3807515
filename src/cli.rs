//! CLI argument parsing, validation, and startup helpers.

use clap::Parser;
use tracing::{error, info};
use url::Url;

use crate::ServerConfig;
use crate::api::{ApiClient, AppEnvironment};

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Paydash",
    about = "Payments dashboard with token-based sessions"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Base URL of the backend API (e.g., "https://api.example.com/v1/")
    #[arg(long, env = "API_URL", value_parser = validate_api_url)]
    pub api_url: String,

    /// Deployment environment. Production sends credentials to the API and marks cookies Secure
    #[arg(long, env = "APP_ENVIRONMENT", value_enum, default_value = "development")]
    pub environment: AppEnvironment,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_api_url(s: &str) -> Result<String, String> {
    let url = Url::parse(s).map_err(|e| format!("Invalid API URL {}: {}", s, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("API URL must use http or https: {}", s));
    }
    Ok(s.to_string())
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Build ServerConfig from validated arguments.
/// Returns None and logs an error if the API client cannot be created.
pub fn build_config(api_url: &str, environment: AppEnvironment) -> Option<ServerConfig> {
    let api = match ApiClient::new(api_url, environment) {
        Ok(api) => api,
        Err(e) => {
            error!(url = %api_url, error = %e, "Failed to create API client");
            return None;
        }
    };
    info!(url = %api.base_url(), environment = ?environment, "API client ready");

    Some(ServerConfig {
        api,
        secure_cookies: environment == AppEnvironment::Production,
    })
}
