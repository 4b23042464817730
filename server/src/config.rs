//! Server configuration
//!
//! Named constants for limits and defaults, plus the command-line / environment
//! configuration the binary is started with.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// ===== Server Defaults =====

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATABASE_PATH: &str = "./data/tora.db";

/// Default `RUST_LOG` directive when none is set
pub const DEFAULT_LOG_FILTER: &str = "tora=debug,tower_http=info,info";

/// Maximum accepted request body (import documents can be large)
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

// ===== Illustration Integration =====

pub const DEFAULT_ILLUSTRATION_API_BASE: &str = "https://app-api.pixiv.net";

/// Referer the image host requires before it serves anything
pub const ILLUSTRATION_REFERER: &str = "https://www.pixiv.net/";

/// Only images under this host suffix are proxied
pub const ILLUSTRATION_IMAGE_HOST_SUFFIX: &str = "pximg.net";

/// Number of entries returned by the daily ranking
pub const RANKING_LIMIT: usize = 15;

pub const IMAGE_CACHE_MAX_ENTRIES: usize = 100;
pub const IMAGE_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// `Cache-Control` max-age for proxied images, in seconds
pub const IMAGE_CLIENT_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration of the illustration widget backend
#[derive(Debug, Clone)]
pub struct IllustrationSettings {
    /// Bearer token; the integration is disabled without one
    pub access_token: Option<String>,
    pub api_base: String,
    pub referer: String,
    pub image_host_suffix: String,
    pub cache_max_entries: usize,
    pub cache_ttl: Duration,
}

impl Default for IllustrationSettings {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base: DEFAULT_ILLUSTRATION_API_BASE.to_string(),
            referer: ILLUSTRATION_REFERER.to_string(),
            image_host_suffix: ILLUSTRATION_IMAGE_HOST_SUFFIX.to_string(),
            cache_max_entries: IMAGE_CACHE_MAX_ENTRIES,
            cache_ttl: IMAGE_CACHE_TTL,
        }
    }
}

/// Tora study tracker API server
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(short = 'H', long, env = "TORA_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// SQLite database file
    #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_PATH)]
    pub database: PathBuf,

    /// Access token for the illustration API
    #[arg(long, env = "PIXIV_ACCESS_TOKEN", hide_env_values = true)]
    pub pixiv_access_token: Option<String>,

    /// Base URL of the illustration API
    #[arg(long, env = "PIXIV_API_BASE", default_value = DEFAULT_ILLUSTRATION_API_BASE)]
    pub pixiv_api_base: String,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn illustration_settings(&self) -> IllustrationSettings {
        IllustrationSettings {
            access_token: self
                .pixiv_access_token
                .as_deref()
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
            api_base: self.pixiv_api_base.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::parse_from(["tora"]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(config.bind_address(), format!("{DEFAULT_HOST}:{DEFAULT_PORT}"));
    }

    #[test]
    fn test_blank_token_disables_illustrations() {
        let config = ServerConfig::parse_from([
            "tora",
            "--pixiv-access-token",
            "  ",
            "--pixiv-api-base",
            "http://localhost:9000/",
        ]);
        let settings = config.illustration_settings();
        assert!(settings.access_token.is_none());
        assert_eq!(settings.api_base, "http://localhost:9000");
    }
}
