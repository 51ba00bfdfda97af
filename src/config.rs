// Client configuration.
// Validated once at start-up and passed explicitly to the Conduit client.

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::cache;
use crate::error::{PhabStatsError, Result};

/// Mozilla's Phabricator instance.
pub const DEFAULT_BASE_URL: &str = "https://phabricator.services.mozilla.com/api/";

/// Every Conduit API token starts with this literal.
const TOKEN_PREFIX: &str = "api-";

/// Validated Conduit client configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    base_url: String,
    token: String,
    cache_dir: PathBuf,
}

impl Config {
    /// Build a configuration, rejecting malformed tokens and URLs.
    pub fn new(base_url: &str, token: &str, cache_dir: PathBuf) -> Result<Self> {
        validate_token(token)?;
        let base_url = base_url.trim();
        let host = base_url
            .strip_prefix("https://")
            .or_else(|| base_url.strip_prefix("http://"));
        if host.is_none_or(|host| host.trim_start_matches('/').is_empty()) {
            return Err(PhabStatsError::InvalidBaseUrl(base_url.to_string()));
        }

        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        Ok(Self {
            base_url,
            token: token.to_string(),
            cache_dir,
        })
    }

    /// Load configuration from PHABRICATOR_TOKEN, PHABRICATOR_URL and PHAB_STATS_CACHE_DIR.
    pub fn from_env() -> Result<Self> {
        let token = env::var("PHABRICATOR_TOKEN").map_err(|_| PhabStatsError::MissingToken)?;
        let base_url = env::var("PHABRICATOR_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let cache_dir = match env::var_os("PHAB_STATS_CACHE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => cache::default_cache_dir()
                .ok_or_else(|| PhabStatsError::Io(std::io::Error::other("no home directory")))?,
        };
        Self::new(&base_url, &token, cache_dir)
    }

    pub fn with_base_url(self, base_url: &str) -> Result<Self> {
        Self::new(base_url, &self.token, self.cache_dir)
    }

    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    /// Fully-qualified URL for a Conduit method.
    pub fn method_url(&self, method: &str) -> String {
        format!("{}{}", self.base_url, method)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("token", &"api-<redacted>")
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

fn validate_token(token: &str) -> Result<()> {
    let Some(rest) = token.strip_prefix(TOKEN_PREFIX) else {
        return Err(PhabStatsError::InvalidToken {
            reason: format!("must start with {:?}", TOKEN_PREFIX),
        });
    };

    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PhabStatsError::InvalidToken {
            reason: "expected alphanumeric characters after the prefix".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "api-abcdefghijklmnopqrstuvwxyz12";

    #[test]
    fn test_valid_config() {
        let config = Config::new(DEFAULT_BASE_URL, TOKEN, PathBuf::from("/tmp/c")).unwrap();
        assert_eq!(
            config.method_url("feed.query"),
            "https://phabricator.services.mozilla.com/api/feed.query"
        );
        assert_eq!(config.token(), TOKEN);
    }

    #[test]
    fn test_trailing_slash_added() {
        let config = Config::new("https://phab.example.com/api", TOKEN, PathBuf::new()).unwrap();
        assert_eq!(config.base_url(), "https://phab.example.com/api/");
    }

    #[test]
    fn test_rejects_bad_tokens() {
        for token in ["", "cli-abcdef", "api-", "api-abc def", "API-abcdef"] {
            let err = Config::new(DEFAULT_BASE_URL, token, PathBuf::new()).unwrap_err();
            assert!(matches!(err, PhabStatsError::InvalidToken { .. }), "{token:?}");
        }
    }

    #[test]
    fn test_rejects_bad_base_url() {
        for base_url in ["  ", "httpfoo", "ftp://phab.example.com/api/", "https://"] {
            let err = Config::new(base_url, TOKEN, PathBuf::new()).unwrap_err();
            assert!(matches!(err, PhabStatsError::InvalidBaseUrl(_)), "{base_url:?}");
        }
        assert!(Config::new("http://localhost:8080/api/", TOKEN, PathBuf::new()).is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config::new(DEFAULT_BASE_URL, TOKEN, PathBuf::new()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains(TOKEN));
    }
}
