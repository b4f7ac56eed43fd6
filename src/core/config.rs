use std::env;
use std::time::Duration;

const DEFAULT_SLACK_API_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the DataHub GMS server, e.g. `http://datahub-gms:8080`.
    pub datahub_server: String,
    pub datahub_token: Option<String>,
    pub datahub_frontend_url: String,
    pub slack_api_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let protocol = env::var("DATAHUB_GMS_PROTOCOL").unwrap_or_else(|_| "http".to_string());
        let host =
            env::var("DATAHUB_GMS_HOST").map_err(|e| format!("DATAHUB_GMS_HOST: {}", e))?;
        let port =
            env::var("DATAHUB_GMS_PORT").map_err(|e| format!("DATAHUB_GMS_PORT: {}", e))?;

        let timeout_ms = match env::var("SLACK_API_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| format!("SLACK_API_TIMEOUT_MS: {}", e))?,
            Err(_) => DEFAULT_SLACK_API_TIMEOUT_MS,
        };

        Ok(Self {
            datahub_server: format!("{protocol}://{host}:{port}"),
            datahub_token: env::var("DATAHUB_GMS_TOKEN").ok(),
            datahub_frontend_url: env::var("DATAHUB_FRONTEND_URL")
                .map_err(|e| format!("DATAHUB_FRONTEND_URL: {}", e))?
                .trim_end_matches('/')
                .to_string(),
            slack_api_timeout: Duration::from_millis(timeout_ms),
        })
    }
}
