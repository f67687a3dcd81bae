use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_SUMMARY_LANGUAGE: &str = "Hebrew";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 180;
/// Inline media in a generateContent request is capped at 20 MB after
/// base64 encoding, so raw video stays below 15 MiB.
pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 15 * 1024 * 1024;
pub const DEFAULT_MAX_PAGE_BYTES: u64 = 5 * 1024 * 1024;
/// Upper bound for any single stage timeout.
pub const MAX_TIMEOUT_SECS: u64 = 3600;
/// Upper bound for any in-memory body, page or video.
pub const MAX_BODY_BYTES: u64 = 1024 * 1024 * 1024;

/// Upstream proxy credentials.
#[derive(Clone)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ProxySettings {
    /// Proxy URL without credentials, safe to log.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub language: String,
}

impl fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("language", &self.language)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Limits {
    pub fetch_timeout: Duration,
    pub download_timeout: Duration,
    pub model_timeout: Duration,
    pub max_video_bytes: u64,
    pub max_page_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            max_video_bytes: DEFAULT_MAX_VIDEO_BYTES,
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub proxy: ProxySettings,
    pub gemini: GeminiSettings,
    pub limits: Limits,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AppError::ConfigError(format!("{} is not set", key)))
        };

        let proxy = ProxySettings {
            host: required("BRIGHT_PROXY_HOST")?,
            port: parse_number("BRIGHT_PROXY_PORT", &required("BRIGHT_PROXY_PORT")?)?,
            username: required("BRIGHT_PROXY_USER")?,
            password: required("BRIGHT_PROXY_PASS")?,
        };

        let gemini = GeminiSettings {
            api_key: required("GEMINI_API_KEY")?,
            model: required("GEMINI_MODEL")?,
            api_base: lookup("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            language: lookup("SUMMARY_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_SUMMARY_LANGUAGE.to_string()),
        };

        let bounded = |key: &str, default: u64, max: u64| -> Result<u64> {
            let value = match lookup(key) {
                Some(raw) => parse_number::<u64>(key, &raw)?,
                None => default,
            };
            if value == 0 || value > max {
                return Err(AppError::ConfigError(format!(
                    "Invalid {}: {} is outside 1..={}",
                    key, value, max
                )));
            }
            Ok(value)
        };
        let seconds = |key: &str, default: u64| -> Result<Duration> {
            bounded(key, default, MAX_TIMEOUT_SECS).map(Duration::from_secs)
        };

        let limits = Limits {
            fetch_timeout: seconds("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?,
            download_timeout: seconds("DOWNLOAD_TIMEOUT_SECS", DEFAULT_DOWNLOAD_TIMEOUT_SECS)?,
            model_timeout: seconds("MODEL_TIMEOUT_SECS", DEFAULT_MODEL_TIMEOUT_SECS)?,
            max_video_bytes: bounded("MAX_VIDEO_BYTES", DEFAULT_MAX_VIDEO_BYTES, MAX_BODY_BYTES)?,
            max_page_bytes: bounded("MAX_PAGE_BYTES", DEFAULT_MAX_PAGE_BYTES, MAX_BODY_BYTES)?,
        };

        // Load server configuration with defaults
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "3000".to_string());
        let port = parse_number::<u16>("PORT", &port)?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            proxy,
            gemini,
            limits,
        })
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e)))
}
