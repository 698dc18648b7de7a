use crate::core::{ErrorClass, DEFAULT_ANCHOR_NAME, STABILITY_THRESHOLD, TILT_LIMIT};
use crate::hardware::RadioConfig;
use crate::ranging::RangingParameters;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// System-wide configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Base URL of the anchor service
    pub api_endpoint: String,
    /// Timeout for a single anchor service request (milliseconds)
    pub request_timeout_ms: u64,
    /// Beacons not sighted for this long are not scheduled (milliseconds)
    pub stale_interval_ms: u64,
    /// Largest displacement between samples that still counts as settled
    pub stability_threshold: f32,
    /// How long samples must stay settled before ranging stops (milliseconds)
    pub stability_dwell_ms: u64,
    /// Minimum direction cosine of the up and back axes for heading alignment
    pub tilt_limit: f32,
    /// Start with automatic beacon scheduling enabled
    pub auto_scheduling: bool,
    /// Name of the pose anchors placed in the tracking session
    pub anchor_name: String,
    /// Default tracing filter, overridden by RUST_LOG
    pub log_filter: String,
    /// Ranging radio settings
    pub radio: RadioConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "http://localhost:8080".to_string(),
            request_timeout_ms: 10_000,
            stale_interval_ms: 30_000,
            stability_threshold: STABILITY_THRESHOLD,
            stability_dwell_ms: 15_000,
            tilt_limit: TILT_LIMIT,
            auto_scheduling: false,
            anchor_name: DEFAULT_ANCHOR_NAME.to_string(),
            log_filter: "info".to_string(),
            radio: RadioConfig::default(),
        }
    }
}

impl SystemConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.radio.poll_interval_ms)
    }

    /// Scheduling and settling parameters for the ranging coordinator
    pub fn ranging_parameters(&self) -> RangingParameters {
        RangingParameters {
            stale_interval: Duration::from_millis(self.stale_interval_ms),
            stability_threshold: self.stability_threshold,
            stability_dwell: Duration::from_millis(self.stability_dwell_ms),
            camera_assistance: self.radio.camera_assistance,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Configuration file I/O error
    #[error("{message}")]
    IoError { message: String },
    /// JSON serialization/deserialization error
    #[error("{message}")]
    SerializationError { message: String },
}

impl ConfigError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }

    fn invalid(parameter: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Configuration validation result
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether configuration is valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<ConfigError>,
    /// Validation warnings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn into_result(self) -> Result<(), ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Main configuration manager
pub struct ConfigurationManager {
    /// Current system configuration
    system_config: SystemConfig,
    /// Configuration file path
    config_file_path: Option<String>,
    /// Whether configuration has been modified
    is_modified: bool,
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationManager {
    /// Create a new configuration manager with default settings
    pub fn new() -> Self {
        Self {
            system_config: SystemConfig::default(),
            config_file_path: None,
            is_modified: false,
        }
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    /// Get current system configuration
    pub fn get_system_config(&self) -> &SystemConfig {
        &self.system_config
    }

    /// Update system configuration with validation
    pub fn update_system_config(&mut self, config: SystemConfig) -> Result<(), ConfigError> {
        self.validate_system_config(&config).into_result()?;
        self.system_config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from JSON file; missing fields take defaults
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: SystemConfig = serde_json::from_str(&content).map_err(|e| {
            ConfigError::SerializationError {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            }
        })?;

        // Validate before applying
        self.validate_system_config(&config).into_result()?;

        self.system_config = config;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&self.system_config).map_err(|e| {
            ConfigError::SerializationError {
                message: format!("Failed to serialize config: {}", e),
            }
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })?;

        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the currently loaded file path
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if let Some(path) = self.config_file_path.clone() {
            self.save_to_file(path)
        } else {
            Err(ConfigError::IoError {
                message: "No file path set for saving configuration".to_string(),
            })
        }
    }

    /// Check if configuration has been modified since last save
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Set the settling threshold, returning the previous value
    pub fn set_stability_threshold(&mut self, threshold: f32) -> Result<f32, ConfigError> {
        if !(threshold > 0.0) {
            return Err(ConfigError::invalid(
                "stability_threshold",
                threshold,
                "Stability threshold must be positive",
            ));
        }
        let old = self.system_config.stability_threshold;
        self.system_config.stability_threshold = threshold;
        self.is_modified = true;
        Ok(old)
    }

    /// Set the auto-scheduling start state, returning the previous value
    pub fn set_auto_scheduling(&mut self, enabled: bool) -> bool {
        let old = self.system_config.auto_scheduling;
        self.system_config.auto_scheduling = enabled;
        self.is_modified = true;
        old
    }

    pub fn validate_system_config(&self, config: &SystemConfig) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match Url::parse(&config.api_endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() => {
                if url.scheme() == "http" && url.host_str() != Some("localhost") {
                    warnings.push("Anchor service endpoint is not using TLS".to_string());
                }
            }
            _ => errors.push(ConfigError::invalid(
                "api_endpoint",
                &config.api_endpoint,
                "Endpoint must be an http(s) URL",
            )),
        }

        if config.request_timeout_ms == 0 {
            errors.push(ConfigError::invalid(
                "request_timeout_ms",
                config.request_timeout_ms,
                "Request timeout must be positive",
            ));
        }

        if config.stale_interval_ms == 0 {
            errors.push(ConfigError::invalid(
                "stale_interval_ms",
                config.stale_interval_ms,
                "Staleness window must be positive",
            ));
        } else if config.stale_interval_ms < config.stability_dwell_ms {
            warnings.push("Beacons may go stale before ranging can settle".to_string());
        }

        if !(config.stability_threshold > 0.0) {
            errors.push(ConfigError::invalid(
                "stability_threshold",
                config.stability_threshold,
                "Stability threshold must be positive",
            ));
        }

        if config.stability_dwell_ms == 0 {
            errors.push(ConfigError::invalid(
                "stability_dwell_ms",
                config.stability_dwell_ms,
                "Stability dwell must be positive",
            ));
        }

        if !(config.tilt_limit > 0.0 && config.tilt_limit < 1.0) {
            errors.push(ConfigError::invalid(
                "tilt_limit",
                config.tilt_limit,
                "Tilt limit must be a direction cosine between 0 and 1",
            ));
        }

        if config.anchor_name.trim().is_empty() {
            errors.push(ConfigError::invalid(
                "anchor_name",
                &config.anchor_name,
                "Anchor name must not be empty",
            ));
        }

        if config.radio.poll_interval_ms == 0 {
            errors.push(ConfigError::invalid(
                "radio.poll_interval_ms",
                config.radio.poll_interval_ms,
                "Poll interval must be positive",
            ));
        } else if config.radio.poll_interval_ms > 1000 {
            warnings.push("Slow radio polling delays ranging samples".to_string());
        }

        if config.radio.max_write_length == 0 || config.radio.max_write_length > 4096 {
            errors.push(ConfigError::invalid(
                "radio.max_write_length",
                config.radio.max_write_length,
                "Write length must be between 1 and 4096 bytes",
            ));
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
