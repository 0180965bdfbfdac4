//! Service configuration
//!
//! Resolved once at startup: built-in defaults, then an optional TOML
//! file, then `OBS_*` environment overrides.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Process id stamped on observations recorded through the generic flow
pub const GENERIC_UPLOAD_PROCESS: &str = "urn:matterable:generic-upload";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "OBS_";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("reading config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this shape
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting has an unusable value
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map
    #[default]
    Memory,
    /// JSON documents in a directory
    File,
}

impl StoreBackend {
    /// Config name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(ConfigError::invalid(
                "store.backend",
                other,
                "expected 'memory' or 'file'",
            )),
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Which backend to open
    pub backend: StoreBackend,
    /// Directory of the file backend
    pub directory: PathBuf,
    /// Bound on each store call, in milliseconds
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            directory: PathBuf::from("./data/observations"),
            timeout_ms: 5000,
        }
    }
}

/// Definition source settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaxonomyConfig {
    /// JSON or YAML definitions file; built-in set when absent
    pub path: Option<PathBuf>,
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Persistence
    pub store: StoreConfig,
    /// Definition source
    pub taxonomy: TaxonomyConfig,
    /// Process id stamped on generic uploads
    pub generic_process_id: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            taxonomy: TaxonomyConfig::default(),
            generic_process_id: GENERIC_UPLOAD_PROCESS.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With storage backend
    #[inline]
    #[must_use]
    pub fn with_store_backend(mut self, backend: StoreBackend) -> Self {
        self.store.backend = backend;
        self
    }

    /// With file backend directory
    #[inline]
    #[must_use]
    pub fn with_store_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.store.directory = directory.into();
        self
    }

    /// With per-call store timeout
    #[inline]
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With definitions file
    #[inline]
    #[must_use]
    pub fn with_taxonomy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.taxonomy.path = Some(path.into());
        self
    }

    /// With generic upload process id
    #[inline]
    #[must_use]
    pub fn with_generic_process_id(mut self, id: impl Into<String>) -> Self {
        self.generic_process_id = id.into();
        self
    }

    /// Bound on each store call
    #[inline]
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store.timeout_ms)
    }

    /// Parse TOML, filling unspecified settings with defaults
    ///
    /// # Errors
    /// Returns error on malformed TOML, unknown keys or invalid values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Defaults, then the file if given, then the process environment
    ///
    /// # Errors
    /// Returns error if any layer is invalid
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        let config = base.with_env(std::env::vars())?;
        tracing::debug!(
            backend = %config.store.backend,
            timeout_ms = config.store.timeout_ms,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Apply `OBS_*` overrides from the given variables
    ///
    /// # Errors
    /// Returns error if an override has an invalid value
    pub fn with_env<I>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "STORE_BACKEND" => self.store.backend = value.parse()?,
                "STORE_DIRECTORY" => self.store.directory = PathBuf::from(value),
                "STORE_TIMEOUT_MS" => {
                    self.store.timeout_ms = value.trim().parse().map_err(|_| {
                        ConfigError::invalid("store.timeout_ms", &value, "expected milliseconds")
                    })?;
                }
                "TAXONOMY_PATH" => {
                    self.taxonomy.path = (!value.trim().is_empty()).then(|| PathBuf::from(value));
                }
                "GENERIC_PROCESS_ID" => self.generic_process_id = value,
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// Returns error for a zero timeout or an unusable process id
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "store.timeout_ms",
                "0",
                "must be greater than zero",
            ));
        }
        let id = self.generic_process_id.trim();
        if !obs_observation::is_uuid(id) && !obs_observation::is_uri(id) {
            return Err(ConfigError::invalid(
                "generic_process_id",
                &self.generic_process_id,
                "must be a UUID or URI",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::new();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert_eq!(config.generic_process_id, GENERIC_UPLOAD_PROCESS);
        assert!(config.taxonomy.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
            [store]
            backend = "file"
            directory = "/var/lib/obs"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.store.directory, PathBuf::from("/var/lib/obs"));
        assert_eq!(config.store.timeout_ms, 5000);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(ServiceConfig::from_toml_str("colour = \"red\"").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let config = ServiceConfig::new()
            .with_store_backend(StoreBackend::File)
            .with_env(env(&[
                ("OBS_STORE_BACKEND", "memory"),
                ("OBS_STORE_TIMEOUT_MS", "250"),
                ("OBS_TAXONOMY_PATH", "defs.yaml"),
                ("HOME", "/root"),
            ]))
            .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store_timeout(), Duration::from_millis(250));
        assert_eq!(config.taxonomy.path, Some(PathBuf::from("defs.yaml")));
    }

    #[test]
    fn test_bad_env_value() {
        let err = ServiceConfig::new()
            .with_env(env(&[("OBS_STORE_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "store.timeout_ms"));

        assert!(ServiceConfig::new()
            .with_env(env(&[("OBS_STORE_BACKEND", "postgres")]))
            .is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ServiceConfig::new()
            .with_store_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("store.timeout_ms"));
    }

    #[test]
    fn test_process_id_must_be_uri() {
        assert!(ServiceConfig::new()
            .with_generic_process_id("generic upload")
            .validate()
            .is_err());
    }
}
