//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, LockOrderMode, MAX_RETRIES};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_dispatcher(config, &mut result);
        Self::validate_producers(config, &mut result);
        Self::validate_monitor(config, &mut result);

        Ok(result)
    }

    fn validate_dispatcher(config: &Config, result: &mut ValidationResult) {
        let dispatcher = &config.dispatcher;

        if dispatcher.worker_pool_size == 0 {
            result.add_error(ValidationError::new(
                "dispatcher.worker_pool_size",
                "worker_pool_size must be greater than 0",
            ));
        }

        if dispatcher.queue_capacity == 0 {
            result.add_error(ValidationError::new(
                "dispatcher.queue_capacity",
                "queue_capacity must be greater than 0",
            ));
        }

        if dispatcher.max_retries > MAX_RETRIES {
            result.add_error(ValidationError::new(
                "dispatcher.max_retries",
                format!("max_retries cannot exceed {}", MAX_RETRIES),
            ));
        }

        if !(0.0..=1.0).contains(&dispatcher.failure_probability) {
            result.add_error(ValidationError::new(
                "dispatcher.failure_probability",
                "failure_probability must be within [0, 1]",
            ));
        }

        if !dispatcher.lock_hold.is_valid() {
            result.add_error(ValidationError::new(
                "dispatcher.lock_hold",
                "min_ms cannot be greater than max_ms",
            ));
        }

        if !dispatcher.processing_time.is_valid() {
            result.add_error(ValidationError::new(
                "dispatcher.processing_time",
                "min_ms cannot be greater than max_ms",
            ));
        }

        if dispatcher.lock_order == LockOrderMode::Conflicting {
            result.add_warning(ValidationWarning::new(
                "dispatcher.lock_order",
                "conflicting lock order is deadlock-prone; workers may stall permanently",
            ));
        }

        if dispatcher.lock_order == LockOrderMode::Conflicting && dispatcher.worker_pool_size < 2 {
            result.add_warning(ValidationWarning::new(
                "dispatcher.worker_pool_size",
                "a single worker cannot deadlock with itself",
            ));
        }
    }

    fn validate_producers(config: &Config, result: &mut ValidationResult) {
        if config.producers.is_empty() {
            result.add_warning(ValidationWarning::new(
                "producers",
                "No producers configured, the queue will stay empty",
            ));
        }

        for (i, producer) in config.producers.iter().enumerate() {
            if producer.name.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("producers[{}].name", i),
                    "Producer name cannot be empty",
                ));
            }

            let duplicates = config
                .producers
                .iter()
                .filter(|p| p.name == producer.name)
                .count();
            if duplicates > 1 {
                result.add_warning(ValidationWarning::new(
                    format!("producers[{}].name", i),
                    format!("Producer name '{}' is used more than once", producer.name),
                ));
            }
        }
    }

    fn validate_monitor(config: &Config, result: &mut ValidationResult) {
        let monitor = &config.monitor;

        if monitor.sample_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "monitor.sample_interval_ms",
                "sample_interval_ms must be greater than 0",
            ));
        }

        if monitor.export_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "monitor.export_interval_ms",
                "export_interval_ms must be greater than 0",
            ));
        }

        if monitor.export_interval_ms < monitor.sample_interval_ms {
            result.add_warning(ValidationWarning::new(
                "monitor.export_interval_ms",
                "export interval is shorter than the sampling interval",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
