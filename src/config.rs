//! Settings loaded from `~/.config/pricetrack/config.toml`.
//!
//! ```toml
//! disabled_shops = ["jumbo.com"]
//! timeout_secs = 10
//! delay_min_secs = 1
//! delay_max_secs = 180
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

/// Crawler configuration. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Hostnames whose extractor is not registered.
    pub disabled_shops: BTreeSet<String>,
    /// Per-request fetch timeout.
    pub timeout_secs: u64,
    /// Bounds of the random pause between two crawls of the same shop.
    pub delay_min_secs: u64,
    pub delay_max_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disabled_shops: BTreeSet::new(),
            timeout_secs: 10,
            delay_min_secs: 1,
            delay_max_secs: 180,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields the defaults; an explicitly given path
    /// must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// holds inconsistent values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (config_path(), false),
        };
        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// Parse and check a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid TOML, unknown keys, a zero timeout, or a
    /// delay range whose minimum exceeds its maximum.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        ensure!(config.timeout_secs > 0, "timeout_secs must be positive");
        ensure!(
            config.delay_min_secs <= config.delay_max_secs,
            "delay_min_secs ({}) exceeds delay_max_secs ({})",
            config.delay_min_secs,
            config.delay_max_secs
        );
        Ok(config)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.delay_min_secs),
            Duration::from_secs(self.delay_max_secs),
        )
    }
}

/// Path of the default config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pricetrack")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_config_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn parse_all_keys() {
        let config = Config::from_toml(
            r#"
disabled_shops = ["jumbo.com", "ah.nl"]
timeout_secs = 30
delay_min_secs = 0
delay_max_secs = 5
"#,
        )
        .unwrap();
        assert!(config.disabled_shops.contains("jumbo.com"));
        assert_eq!(config.disabled_shops.len(), 2);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.delay_range(), (Duration::ZERO, Duration::from_secs(5)));
    }

    #[test]
    fn rejects_inverted_delay_range() {
        let err = Config::from_toml("delay_min_secs = 10\ndelay_max_secs = 2").unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn rejects_unknown_keys_and_zero_timeout() {
        assert!(Config::from_toml("disabled = []").is_err());
        assert!(Config::from_toml("timeout_secs = 0").is_err());
    }

    #[test]
    fn load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "disabled_shops = [\"hema.nl\"]").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert!(config.disabled_shops.contains("hema.nl"));
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
