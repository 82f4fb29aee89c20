use std::env;
use std::path::PathBuf;

use anyhow::Result;
use tracing::warn;

pub const DEFAULT_GEMINI_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Settings needed to install logging, readable before anything else can warn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub log_level: String,
    pub logs_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub logging: LoggingConfig,
    pub gemini_api_key: String,
    pub gemini_image_model: String,
    pub gemini_api_base: String,
    pub gemini_request_timeout_seconds: u64,
    pub max_upload_bytes: usize,
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str, default: &str) -> String {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    fn u64(&self, name: &str, default: u64) -> u64 {
        self.parsed(name, default)
    }

    fn usize(&self, name: &str, default: usize) -> usize {
        self.parsed(name, default)
    }

    fn parsed<T: std::str::FromStr + Copy + std::fmt::Display>(&self, name: &str, default: T) -> T {
        let Some(raw) = (self.lookup)(name) else {
            return default;
        };
        match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid {} value '{}'; using {}.", name, raw, default);
                default
            }
        }
    }
}

impl LoggingConfig {
    pub fn load() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_source(&EnvSource { lookup })
    }

    fn from_source<F>(source: &EnvSource<F>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        LoggingConfig {
            log_level: source.string("LOG_LEVEL", "info").to_lowercase(),
            logs_dir: PathBuf::from(source.string("LOGS_DIR", "logs")),
        }
    }
}

impl Config {
    /// Install logging from [`LoggingConfig`] first so load warnings are recorded.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = EnvSource { lookup };

        let bot_token = source.string("BOT_TOKEN", "");
        if bot_token.is_empty() {
            return Err(anyhow::anyhow!("BOT_TOKEN is required"));
        }

        let mut gemini_api_key = source.string("GEMINI_API_KEY", "");
        if gemini_api_key.is_empty() {
            gemini_api_key = source.string("API_KEY", "");
        }
        if gemini_api_key.is_empty() {
            warn!("GEMINI_API_KEY is not set; headshot requests will be rejected by the API.");
        }

        Ok(Config {
            bot_token,
            logging: LoggingConfig::from_source(&source),
            gemini_api_key,
            gemini_image_model: source.string("GEMINI_IMAGE_MODEL", DEFAULT_GEMINI_IMAGE_MODEL),
            gemini_api_base: source.string("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            gemini_request_timeout_seconds: source
                .u64("GEMINI_REQUEST_TIMEOUT_SECONDS", 120)
                .max(1),
            max_upload_bytes: source.usize("MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::{self, Write};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn requires_bot_token() {
        let err = load(&[("GEMINI_API_KEY", "k")]).unwrap_err();
        assert_eq!(err.to_string(), "BOT_TOKEN is required");
    }

    #[test]
    fn applies_defaults() {
        let config = load(&[("BOT_TOKEN", "123:abc")]).unwrap();
        assert_eq!(config.gemini_image_model, DEFAULT_GEMINI_IMAGE_MODEL);
        assert_eq!(config.gemini_api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(config.gemini_request_timeout_seconds, 120);
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.logging.log_level, "info");
        assert_eq!(config.logging.logs_dir, PathBuf::from("logs"));
        assert!(config.gemini_api_key.is_empty());
    }

    #[test]
    fn api_key_falls_back_to_generic_variable() {
        let config = load(&[("BOT_TOKEN", "t"), ("API_KEY", "fallback")]).unwrap();
        assert_eq!(config.gemini_api_key, "fallback");
        let config = load(&[
            ("BOT_TOKEN", "t"),
            ("API_KEY", "fallback"),
            ("GEMINI_API_KEY", "primary"),
        ])
        .unwrap();
        assert_eq!(config.gemini_api_key, "primary");
    }

    #[test]
    fn invalid_numbers_keep_defaults() {
        let config = load(&[
            ("BOT_TOKEN", "t"),
            ("GEMINI_REQUEST_TIMEOUT_SECONDS", "soon"),
            ("MAX_UPLOAD_BYTES", "1024"),
            ("LOG_LEVEL", "DEBUG"),
        ])
        .unwrap();
        assert_eq!(config.gemini_request_timeout_seconds, 120);
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.logging.log_level, "debug");
    }

    #[test]
    fn logging_settings_load_without_bot_token() {
        let vars: HashMap<&str, &str> = [("LOG_LEVEL", "WARN"), ("LOGS_DIR", "/var/log/headshot")]
            .into_iter()
            .collect();
        let logging = LoggingConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(
            logging,
            LoggingConfig {
                log_level: "warn".to_string(),
                logs_dir: PathBuf::from("/var/log/headshot"),
            }
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn load_warnings_reach_an_installed_subscriber() {
        let captured = CapturedLogs::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            load(&[("BOT_TOKEN", "t"), ("MAX_UPLOAD_BYTES", "lots")]).unwrap();
        });

        let output = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(output.contains("GEMINI_API_KEY is not set"));
        assert!(output.contains("Invalid MAX_UPLOAD_BYTES value 'lots'"));
    }
}
