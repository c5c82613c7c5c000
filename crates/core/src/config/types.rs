use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::feed::{CachingMode, FeedConfig};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub unsplash: UnsplashConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Unsplash search API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnsplashConfig {
    /// Unsplash access key
    pub api_key: String,
    /// API base URL (default: https://api.unsplash.com)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

/// Image cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Directory cached thumbnails are written to
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Image download timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("image-cache")
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub unsplash: SanitizedUnsplashConfig,
    pub cache: CacheConfig,
    pub feed: SanitizedFeedConfig,
}

/// Sanitized Unsplash config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUnsplashConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFeedConfig {
    pub per_page: u32,
    pub caching: String,
    pub search_debounce_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_query: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            unsplash: SanitizedUnsplashConfig {
                base_url: config.unsplash.base_url.clone(),
                api_key_configured: !config.unsplash.api_key.trim().is_empty(),
                timeout_secs: config.unsplash.timeout_secs,
            },
            cache: config.cache.clone(),
            feed: SanitizedFeedConfig {
                per_page: config.feed.per_page,
                caching: match config.feed.caching {
                    CachingMode::Lazy => "lazy".to_string(),
                    CachingMode::Eager => "eager".to_string(),
                },
                search_debounce_ms: config.feed.search_debounce_ms,
                initial_query: config.feed.initial_query.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[unsplash]
api_key = "test-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.unsplash.api_key, "test-key");
        assert_eq!(config.unsplash.timeout_secs, 30);
        assert!(config.unsplash.base_url.is_none());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.cache.dir.to_str().unwrap(), "image-cache");
        assert_eq!(config.feed.per_page, 21);
        assert_eq!(config.feed.caching, CachingMode::Lazy);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[unsplash]
api_key = "test-key"
base_url = "http://localhost:9100"
timeout_secs = 5

[cache]
dir = "/var/cache/photofeed"
timeout_secs = 10

[feed]
per_page = 30
caching = "eager"
search_debounce_ms = 250
initial_query = "cats"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(
            config.unsplash.base_url.as_deref(),
            Some("http://localhost:9100")
        );
        assert_eq!(config.unsplash.timeout_secs, 5);
        assert_eq!(config.cache.dir.to_str().unwrap(), "/var/cache/photofeed");
        assert_eq!(config.cache.timeout_secs, 10);
        assert_eq!(config.feed.per_page, 30);
        assert_eq!(config.feed.caching, CachingMode::Eager);
        assert_eq!(config.feed.search_debounce_ms, 250);
        assert_eq!(config.feed.initial_query.as_deref(), Some("cats"));
    }

    #[test]
    fn test_deserialize_missing_unsplash_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let config = Config {
            unsplash: UnsplashConfig {
                api_key: "secret-key".to_string(),
                base_url: None,
                timeout_secs: 30,
            },
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            feed: FeedConfig::default(),
        };

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.unsplash.api_key_configured);
        assert_eq!(sanitized.feed.caching, "lazy");
        assert_eq!(sanitized.feed.per_page, 21);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
