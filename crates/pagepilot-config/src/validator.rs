//! Configuration validation.

use std::path::Path;

use crate::error::ConfigError;
use crate::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

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

    /// Turn the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(e) => Err(ConfigError::InvalidValue {
                field: e.path,
                message: e.message,
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
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_browser(config, &mut result);
        Self::validate_timing(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        let browser = &config.browser;

        if browser.debug_port == 0 {
            result.add_error(ValidationError::new(
                "browser.debug_port",
                "Port cannot be 0",
            ));
        }

        if browser.host.is_empty() {
            result.add_error(ValidationError::new(
                "browser.host",
                "Host cannot be empty",
            ));
        }

        if browser.viewport_width == 0 || browser.viewport_height == 0 {
            result.add_error(ValidationError::new(
                "browser.viewport",
                "Viewport dimensions must be greater than 0",
            ));
        }

        if let Some(ref path) = browser.chrome_path {
            if !Path::new(path).exists() {
                result.add_warning(ValidationWarning::new(
                    "browser.chrome_path",
                    format!("Chrome executable does not exist: {}", path),
                ));
            }
        }

        if browser.headless && !browser.launch {
            result.add_warning(ValidationWarning::new(
                "browser.headless",
                "headless has no effect when launch is disabled",
            ));
        }
    }

    fn validate_timing(config: &Config, result: &mut ValidationResult) {
        let timing = &config.timing;

        if timing.navigation_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "timing.navigation_timeout_ms",
                "navigation_timeout_ms must be greater than 0",
            ));
        } else if timing.navigation_timeout_ms < 1000 {
            result.add_warning(ValidationWarning::new(
                "timing.navigation_timeout_ms",
                "navigation_timeout_ms is below 1s, most pages will report a timeout",
            ));
        }

        if timing.settle_delay_ms > 5000 {
            result.add_warning(ValidationWarning::new(
                "timing.settle_delay_ms",
                "settle_delay_ms is very high (>5s), every click will be slow",
            ));
        }

        if timing.key_indicator_hide_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "timing.key_indicator_hide_ms",
                "key_indicator_hide_ms is 0, the key-press toast will never be visible",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_lowercase();
        // Full EnvFilter directives are accepted as-is.
        if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ValidationError::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
