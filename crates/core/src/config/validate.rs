use super::{types::Config, ConfigError};

/// Largest page size the Unsplash search endpoint accepts.
const MAX_PER_PAGE: u32 = 30;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Unsplash API key is present
/// - Feed page size is within 1..=30
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.unsplash.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "unsplash.api_key cannot be empty".to_string(),
        ));
    }

    if config.feed.per_page == 0 || config.feed.per_page > MAX_PER_PAGE {
        return Err(ConfigError::ValidationError(format!(
            "feed.per_page must be between 1 and {}",
            MAX_PER_PAGE
        )));
    }

    Ok(())
}
