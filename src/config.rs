use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::api::ApiConfig;

const BASE_URL_VAR: &str = "BACKEND_BASE_URL";
const DOWNLOAD_DIR_VAR: &str = "BOOKBUILDER_DOWNLOAD_DIR";
const STREAMING_VAR: &str = "BOOKBUILDER_STREAMING";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        source: url::ParseError,
    },

    #[error("{var} must be an http(s) URL, got {value}")]
    UnsupportedScheme { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub download_dir: PathBuf,
    /// Read export bodies incrementally; off means one-shot buffered reads.
    pub streaming: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            download_dir: PathBuf::from("./downloads"),
            streaming: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(base) = lookup(BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            let url = Url::parse(base.trim()).map_err(|source| ConfigError::InvalidUrl {
                var: BASE_URL_VAR,
                source,
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::UnsupportedScheme {
                    var: BASE_URL_VAR,
                    value: base,
                });
            }
            config.api.base_url = base.trim().to_string();
        }

        if let Some(dir) = lookup(DOWNLOAD_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.download_dir = PathBuf::from(dir);
        }

        if let Some(flag) = lookup(STREAMING_VAR) {
            config.streaming = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.download_dir, PathBuf::from("./downloads"));
        assert!(config.streaming);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (BASE_URL_VAR, "https://books.example.com"),
            (DOWNLOAD_DIR_VAR, "/tmp/books"),
            (STREAMING_VAR, "false"),
        ]))
        .unwrap();
        assert_eq!(config.api.base_url, "https://books.example.com");
        assert_eq!(config.download_dir, PathBuf::from("/tmp/books"));
        assert!(!config.streaming);
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let err = AppConfig::from_lookup(lookup(&[(BASE_URL_VAR, "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));

        let err = AppConfig::from_lookup(lookup(&[(BASE_URL_VAR, "ftp://books")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));
    }
}
