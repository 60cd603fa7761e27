use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Bearer token for provider-side writes.
    pub provider_token: String,
    /// Used for services created without an explicit timezone.
    pub default_timezone: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "servyard.db".to_string()),
            provider_token: env::var("PROVIDER_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            default_timezone: env::var("DEFAULT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), crate::errors::AppError> {
        if !crate::services::timeutil::is_valid_timezone(&self.default_timezone) {
            return Err(crate::errors::AppError::Config(format!(
                "DEFAULT_TIMEZONE is not a known timezone: {}",
                self.default_timezone
            )));
        }
        if self.provider_token.is_empty() {
            return Err(crate::errors::AppError::Config(
                "PROVIDER_TOKEN must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
