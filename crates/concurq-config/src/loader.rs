//! Configuration loader.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Io(e),
        })?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Config::default()),
        }
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.concurq`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LockOrderMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.dispatcher.worker_pool_size, 5);
        assert_eq!(config.producers.len(), 2);
    }

    #[test]
    fn test_load_dispatcher_section() {
        let content = r#"
            [dispatcher]
            worker_pool_size = 2
            queue_capacity = 4
            lock_order = "conflicting"
            failure_probability = 0.0
            lock_hold = { min_ms = 10, max_ms = 10 }
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.dispatcher.worker_pool_size, 2);
        assert_eq!(config.dispatcher.queue_capacity, 4);
        assert_eq!(config.dispatcher.lock_order, LockOrderMode::Conflicting);
        assert_eq!(config.dispatcher.failure_probability, 0.0);
        assert_eq!(config.dispatcher.lock_hold.min_ms, 10);
        // Unset fields keep their defaults
        assert_eq!(config.dispatcher.max_retries, 3);
    }

    #[test]
    fn test_load_producers() {
        let content = r#"
            [[producers]]
            name = "Producer-HighPriority-1"
            task_count = 3

            [[producers]]
            name = "Producer-Mixed-1"
            interval_ms = 250
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.producers.len(), 2);
        assert_eq!(config.producers[0].task_count, 3);
        assert_eq!(config.producers[1].interval_ms, 250);
        assert_eq!(config.producers[1].task_count, 10);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[monitor]").unwrap();
        writeln!(file, "sample_interval_ms = 1000").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.monitor.sample_interval_ms, 1000);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/concurq.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = ConfigLoader::load_or_default(None).unwrap();
        assert_eq!(config.dispatcher.queue_capacity, 20);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_load_unknown_lock_order() {
        let content = r#"
            [dispatcher]
            lock_order = "sometimes"
        "#;
        assert!(ConfigLoader::load_str(content).is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("CONCURQ_TEST_EXPORT_PATH", "/tmp/statuses.json");
        }
        let content = r#"
            [monitor]
            export_path = "${CONCURQ_TEST_EXPORT_PATH}"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(
            config.monitor.export_path.unwrap().to_str(),
            Some("/tmp/statuses.json")
        );
        unsafe {
            std::env::remove_var("CONCURQ_TEST_EXPORT_PATH");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_CONCURQ_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/logs");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/logs"));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        let path = "/var/log/concurq";
        assert_eq!(ConfigLoader::expand_path(path), path);
    }
}
