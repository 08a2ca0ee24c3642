//! Configuration loading
//!
//! Sources are applied in the order they were added; later sources win. The
//! usual stack is Default, then a file, then `SWITCHYARD_` environment
//! overrides. A missing file is not an error, so a bare deployment runs on
//! defaults.

use super::model::RouterConfig;
use crate::dispatch::ProviderId;
use crate::error::{SwitchyardError, SwitchyardResult};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file location
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("switchyard")
        .join("switchyard.toml")
}

/// One source of configuration data
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Configuration from a file (TOML, YAML, or JSON by extension)
    File(PathBuf),
    /// `SWITCHYARD_` environment variable overrides
    Environment,
    /// Built-in defaults
    Default,
}

/// Layered configuration loader
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader with no sources
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Add a source
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Add the built-in defaults as a source
    pub fn with_defaults(self) -> Self {
        self.add_source(ConfigSource::Default)
    }

    /// Add a file source
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    /// Add environment variable overrides
    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    /// Load and validate the merged configuration
    pub fn load(self) -> SwitchyardResult<RouterConfig> {
        let mut config = RouterConfig::default();

        for source in &self.sources {
            match source {
                ConfigSource::Default => {
                    tracing::debug!("applying default configuration");
                    config.merge(RouterConfig::default());
                }
                ConfigSource::File(path) => {
                    tracing::debug!(path = %path.display(), "loading configuration file");
                    config.merge(load_file(path)?);
                }
                ConfigSource::Environment => {
                    tracing::debug!("applying environment overrides");
                    apply_env(&mut config)?;
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn load_file(path: &Path) -> SwitchyardResult<RouterConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "configuration file absent; skipping");
        return Ok(RouterConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        SwitchyardError::io_with_path(
            format!("failed to read config file: {}", e),
            path.display().to_string(),
        )
    })?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            SwitchyardError::config_with_context(
                format!("failed to parse TOML config: {}", e),
                path.display().to_string(),
            )
        }),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            SwitchyardError::config_with_context(
                format!("failed to parse YAML config: {}", e),
                path.display().to_string(),
            )
        }),
        _ => serde_json::from_str(&content).map_err(|e| {
            SwitchyardError::config_with_context(
                format!("failed to parse JSON config: {}", e),
                path.display().to_string(),
            )
        }),
    }
}

/// Apply `SWITCHYARD_` scalar overrides onto an already-merged configuration
fn apply_env(config: &mut RouterConfig) -> SwitchyardResult<()> {
    if let Ok(value) = env::var("SWITCHYARD_FALLBACK_ORDER") {
        let order: Vec<ProviderId> = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<ProviderId>().ok())
            .collect();
        if order.is_empty() {
            return Err(SwitchyardError::config(
                "SWITCHYARD_FALLBACK_ORDER is set but empty",
            ));
        }
        config.fallback_order = order;
    }

    if let Ok(value) = env::var("SWITCHYARD_FAILURE_THRESHOLD") {
        config.failure_threshold = value.parse::<u32>().map_err(|_| {
            SwitchyardError::config(format!(
                "invalid SWITCHYARD_FAILURE_THRESHOLD value: {}",
                value
            ))
        })?;
    }

    if let Ok(value) = env::var("SWITCHYARD_CACHE_CAPACITY") {
        config.cache_capacity = value.parse::<usize>().map_err(|_| {
            SwitchyardError::config(format!(
                "invalid SWITCHYARD_CACHE_CAPACITY value: {}",
                value
            ))
        })?;
    }

    if let Ok(value) = env::var("SWITCHYARD_FX_RATE") {
        config.quota.fx_rate = value.parse::<f64>().map_err(|_| {
            SwitchyardError::config(format!("invalid SWITCHYARD_FX_RATE value: {}", value))
        })?;
    }

    if let Ok(value) = env::var("SWITCHYARD_LOG_LEVEL") {
        config.logging.level = value;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ConfigLoader::new()
            .with_defaults()
            .with_file("/nonexistent/switchyard.toml")
            .load()
            .unwrap();

        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.fallback_order[0], ProviderId::OpenAI);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "failure_threshold = 5").unwrap();
        writeln!(file, "cache_capacity = 16").unwrap();
        writeln!(file, "fallback_order = [\"google\", \"openai\"]").unwrap();

        let config = ConfigLoader::new()
            .with_defaults()
            .with_file(file.path())
            .load()
            .unwrap();

        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.fallback_order[0], ProviderId::Google);
        // Sections absent from the file keep their defaults.
        assert_eq!(config.quota.fx_rate, 5.5);
    }

    #[test]
    fn json_file_parses_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{\"failure_threshold\": 2}}").unwrap();

        let config = ConfigLoader::new()
            .with_defaults()
            .with_file(file.path())
            .load()
            .unwrap();
        assert_eq!(config.failure_threshold, 2);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "failure_threshold = \"lots\"").unwrap();

        let result = ConfigLoader::new()
            .with_defaults()
            .with_file(file.path())
            .load();
        assert!(result.is_err());
    }

    #[test]
    fn environment_wins_over_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "failure_threshold = 5").unwrap();

        unsafe {
            env::set_var("SWITCHYARD_FAILURE_THRESHOLD", "7");
            env::set_var("SWITCHYARD_FX_RATE", "6.0");
        }

        let config = ConfigLoader::new()
            .with_defaults()
            .with_file(file.path())
            .with_env()
            .load()
            .unwrap();

        unsafe {
            env::remove_var("SWITCHYARD_FAILURE_THRESHOLD");
            env::remove_var("SWITCHYARD_FX_RATE");
        }

        assert_eq!(config.failure_threshold, 7);
        assert!((config.quota.fx_rate - 6.0).abs() < 1e-9);
    }
}
