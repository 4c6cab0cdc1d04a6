//! Runtime configuration from environment variables

use directories::BaseDirs;
use reqwest::Url;
use std::path::PathBuf;

use crate::types::{LiftlogError, Result};

/// Default per-request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Hosted database base URL (`LIFTLOG_API_URL`)
    pub api_url: Option<String>,
    /// Public API key (`LIFTLOG_API_KEY`)
    pub api_key: Option<String>,
    /// Signed-in user's session token (`LIFTLOG_ACCESS_TOKEN`)
    pub access_token: Option<String>,
    /// Where the offline queue snapshot lives (`LIFTLOG_DATA_DIR`)
    pub data_dir: PathBuf,
    /// Per-request timeout (`LIFTLOG_TIMEOUT_SECS`)
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            access_token: None,
            data_dir: default_data_dir(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `~/.liftlog`, or `./.liftlog` when the home directory is unknown
fn default_data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".liftlog"))
        .unwrap_or_else(|| PathBuf::from(".liftlog"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match get("LIFTLOG_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(LiftlogError::Config(format!(
                        "LIFTLOG_TIMEOUT_SECS must be a positive integer, got {:?}",
                        raw
                    )))
                }
                Ok(secs) => secs,
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let api_url = get("LIFTLOG_API_URL");
        if let Some(url) = &api_url {
            let valid = Url::parse(url)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
                .unwrap_or(false);
            if !valid {
                return Err(LiftlogError::Config(format!(
                    "LIFTLOG_API_URL must be an http(s) URL, got {}",
                    url
                )));
            }
        }

        Ok(Self {
            api_url,
            api_key: get("LIFTLOG_API_KEY"),
            access_token: get("LIFTLOG_ACCESS_TOKEN"),
            data_dir: get("LIFTLOG_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.api_url.is_none());
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.data_dir.ends_with(".liftlog"));
    }

    #[test]
    fn test_reads_all_values() {
        let config = Config::from_lookup(lookup(&[
            ("LIFTLOG_API_URL", "https://abc.supabase.co"),
            ("LIFTLOG_API_KEY", "anon"),
            ("LIFTLOG_ACCESS_TOKEN", "jwt"),
            ("LIFTLOG_DATA_DIR", "/tmp/liftlog"),
            ("LIFTLOG_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://abc.supabase.co"));
        assert_eq!(config.api_key.as_deref(), Some("anon"));
        assert_eq!(config.access_token.as_deref(), Some("jwt"));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/liftlog"));
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_empty_value_is_unset() {
        let config = Config::from_lookup(lookup(&[("LIFTLOG_API_KEY", "  ")])).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_timeout_is_config_error() {
        for raw in ["abc", "0", "-5"] {
            let err = Config::from_lookup(lookup(&[("LIFTLOG_TIMEOUT_SECS", raw)])).unwrap_err();
            assert!(matches!(err, LiftlogError::Config(_)), "{}", raw);
        }
    }

    #[test]
    fn test_non_http_url_is_config_error() {
        let err = Config::from_lookup(lookup(&[("LIFTLOG_API_URL", "abc.supabase.co")])).unwrap_err();
        assert!(err.to_string().contains("LIFTLOG_API_URL"));
    }

    #[test]
    fn test_unparseable_url_is_config_error() {
        for raw in ["http://exa mple.com", "ftp://abc.supabase.co", "https://"] {
            let err = Config::from_lookup(lookup(&[("LIFTLOG_API_URL", raw)])).unwrap_err();
            assert!(matches!(err, LiftlogError::Config(_)), "{}", raw);
        }
    }
}
