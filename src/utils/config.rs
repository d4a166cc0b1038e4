use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::device::{lookup_by_name, lookup_by_tag, DeviceTag};
use crate::errmod::{ErrorMethod, HorizontalPolicy, IhoOrder, ModelParams, SwathErrorModel};
use crate::error::ErrModError;
use crate::vessel::{HeadSet, VesselConfig};

/// Everything needed to attribute uncertainty for one survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Catalog mnemonic of the sonar, e.g. "em3000"
    pub device: String,
    pub method: ErrorMethod,
    pub params: ModelParams,
    /// Vessel used by single-head devices and as the default head
    pub vessel: VesselConfig,
    /// Port head override for dual and split head devices
    pub port: Option<VesselConfig>,
    /// Starboard head override for dual and split head devices
    pub starboard: Option<VesselConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            device: "em3000".to_string(),
            method: ErrorMethod::Full,
            params: ModelParams::default(),
            vessel: VesselConfig::for_device(DeviceTag::Em3000 as u32),
            port: None,
            starboard: None,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Missing required parameter
    #[error("Missing required parameter: {parameter}")]
    MissingParameter { parameter: String },
    /// Configuration file I/O error
    #[error("I/O error: {message}")]
    IoError { message: String },
    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    SerializationError { message: String },
    /// The configuration could not be turned into an error model
    #[error("Model construction failed: {0}")]
    Model(#[from] ErrModError),
}

/// Configuration validation result
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether configuration is valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<ConfigError>,
    /// Validation warnings
    pub warnings: Vec<String>,
    /// Suggested corrections
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    /// Fold another result in, prefixing its warnings with `context`
    fn absorb(&mut self, context: &str, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings
            .extend(other.warnings.into_iter().map(|w| format!("{}: {}", context, w)));
        self.suggestions
            .extend(other.suggestions.into_iter().map(|s| format!("{}: {}", context, s)));
        self.is_valid = self.errors.is_empty();
    }
}

/// Owns a run configuration and the file it came from
pub struct ConfigurationManager {
    config: RunConfig,
    config_file_path: Option<String>,
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
            config: RunConfig::default(),
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

    pub fn get_config(&self) -> &RunConfig {
        &self.config
    }

    /// Replace the whole configuration after validating it
    pub fn update_config(&mut self, config: RunConfig) -> Result<(), ConfigError> {
        let validation = Self::validate_config(&config);
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error);
        }
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: RunConfig = serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to parse config file '{}': {}", path_str, e),
        })?;

        // Validate before applying
        let validation = Self::validate_config(&config);
        for warning in &validation.warnings {
            warn!(file = %path_str, "{}", warning);
        }
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error);
        }

        debug!(file = %path_str, device = %config.device, method = %config.method, "configuration loaded");
        self.config = config;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&self.config).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to serialize config: {}", e),
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

    // Runtime parameter adjustment

    /// Update the fallback sound speed, returning the previous value
    pub fn set_default_sound_speed(&mut self, sound_speed: f64) -> Result<f64, ConfigError> {
        let old_value = self.config.params.default_sound_speed;

        if !(1400.0..=1600.0).contains(&sound_speed) {
            return Err(ConfigError::InvalidParameter {
                parameter: "default_sound_speed".to_string(),
                value: sound_speed.to_string(),
                reason: "Sound speed must be between 1400-1600 m/s for underwater environments".to_string(),
            });
        }

        self.config.params.default_sound_speed = sound_speed;
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_iho_order(&mut self, order: u32) -> Result<IhoOrder, ConfigError> {
        let old_value = self.config.params.iho_order;
        self.config.params.iho_order = IhoOrder::try_from(order)?;
        self.is_modified = true;
        Ok(old_value)
    }

    /// Select the strategy by name ("iho" or "full")
    pub fn set_method(&mut self, method: &str) -> Result<ErrorMethod, ConfigError> {
        let old_value = self.config.method;
        self.config.method = method.parse()?;
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_horizontal_policy(&mut self, policy: HorizontalPolicy) -> HorizontalPolicy {
        let old_value = self.config.params.horizontal_policy;
        self.config.params.horizontal_policy = policy;
        self.is_modified = true;
        old_value
    }

    /// Switch sonar by catalog name. The vessel's device tag follows.
    pub fn set_device(&mut self, name: &str) -> Result<String, ConfigError> {
        let device = lookup_by_name(name)?;
        let old_value = std::mem::replace(&mut self.config.device, device.name.to_string());
        let tag = device.tag as u32;
        self.config.vessel.device = tag;
        for head in [&mut self.config.port, &mut self.config.starboard].into_iter().flatten() {
            head.device = tag;
        }
        self.is_modified = true;
        Ok(old_value)
    }

    /// Validate the current configuration
    pub fn validate(&self) -> ValidationResult {
        Self::validate_config(&self.config)
    }

    /// Validate a run configuration
    pub fn validate_config(config: &RunConfig) -> ValidationResult {
        let mut result = ValidationResult {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
        };

        let sound_speed = config.params.default_sound_speed;
        if !(1400.0..=1600.0).contains(&sound_speed) {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "default_sound_speed".to_string(),
                value: sound_speed.to_string(),
                reason: "Sound speed must be between 1400-1600 m/s for underwater environments".to_string(),
            });
        }

        let device = if config.device.is_empty() {
            result.errors.push(ConfigError::MissingParameter {
                parameter: "device".to_string(),
            });
            None
        } else {
            match lookup_by_name(&config.device) {
                Ok(device) => Some(device),
                Err(e) => {
                    result.errors.push(e.into());
                    result
                        .suggestions
                        .push("Device names are lower-case catalog mnemonics such as 'em3000'".to_string());
                    None
                }
            }
        };

        let heads = [
            ("vessel", Some(&config.vessel)),
            ("port", config.port.as_ref()),
            ("starboard", config.starboard.as_ref()),
        ];
        for (context, vessel) in heads {
            let Some(vessel) = vessel else { continue };
            result.absorb(context, vessel.validate());
            if let (Some(device), Ok(fitted)) = (device, lookup_by_tag(vessel.device)) {
                if fitted.tag != device.tag {
                    result.warnings.push(format!(
                        "{}: vessel is fitted with {} but the run uses {}",
                        context, fitted.name, device.name
                    ));
                }
            }
        }

        if let Some(device) = device {
            let has_overrides = config.port.is_some() || config.starboard.is_some();
            if has_overrides && device.head_boundary().is_none() {
                result
                    .warnings
                    .push(format!("{} has a single head; port/starboard vessels are ignored", device.name));
                result.suggestions.push("Remove the port and starboard sections".to_string());
            }
            if config.method == ErrorMethod::Full && device.head_boundary().is_some() && !has_overrides {
                result
                    .suggestions
                    .push(format!("{} has two heads; consider separate port and starboard vessels", device.name));
            }
        }

        result.is_valid = result.errors.is_empty();
        result
    }

    /// Vessel descriptions for every head. Missing port or starboard
    /// overrides fall back to the default vessel.
    pub fn build_heads(&self) -> HeadSet {
        match (&self.config.port, &self.config.starboard) {
            (None, None) => HeadSet::single(self.config.vessel.clone()),
            (port, starboard) => HeadSet::split(
                self.config.vessel.clone(),
                port.clone().unwrap_or_else(|| self.config.vessel.clone()),
                starboard.clone().unwrap_or_else(|| self.config.vessel.clone()),
            ),
        }
    }

    /// Construct the error model this configuration describes
    pub fn build_model(&self) -> Result<SwathErrorModel, ConfigError> {
        let device = lookup_by_name(&self.config.device)?;
        let model = SwathErrorModel::new(device, &self.build_heads(), self.config.method, self.config.params.clone())?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Platform, Sounding};
    use tempfile::tempdir;

    fn dual_head_config() -> RunConfig {
        let tag = DeviceTag::Em3000D as u32;
        RunConfig {
            device: "em3000d".to_string(),
            vessel: VesselConfig::for_device(tag),
            port: Some(VesselConfig {
                static_roll: -0.4,
                ..VesselConfig::for_device(tag)
            }),
            starboard: Some(VesselConfig {
                static_roll: 0.6,
                ..VesselConfig::for_device(tag)
            }),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_configuration_manager_creation() {
        let manager = ConfigurationManager::new();
        assert_eq!(manager.get_config().device, "em3000");
        assert_eq!(manager.get_config().method, ErrorMethod::Full);
        assert_eq!(manager.get_config().params.default_sound_speed, 1500.0);
        assert!(!manager.is_modified());
        assert!(manager.validate().is_valid);
    }

    #[test]
    fn test_sound_speed_setter() {
        let mut manager = ConfigurationManager::new();
        assert_eq!(manager.set_default_sound_speed(1480.0).unwrap(), 1500.0);
        assert!(manager.is_modified());
        assert!(matches!(
            manager.set_default_sound_speed(1700.0),
            Err(ConfigError::InvalidParameter { .. })
        ));
        assert_eq!(manager.get_config().params.default_sound_speed, 1480.0);
    }

    #[test]
    fn test_order_and_method_setters() {
        let mut manager = ConfigurationManager::new();
        assert_eq!(manager.set_iho_order(3).unwrap(), IhoOrder::Order1);
        assert_eq!(manager.get_config().params.iho_order, IhoOrder::Order3);
        assert_eq!(
            manager.set_iho_order(7),
            Err(ConfigError::Model(ErrModError::UnknownOrder(7)))
        );

        assert_eq!(manager.set_method("iho").unwrap(), ErrorMethod::Full);
        assert!(matches!(
            manager.set_method("cube"),
            Err(ConfigError::Model(ErrModError::UnknownMethod(_)))
        ));
        assert_eq!(manager.get_config().method, ErrorMethod::Iho);

        assert_eq!(manager.set_horizontal_policy(HorizontalPolicy::Fail), HorizontalPolicy::Warn);
    }

    #[test]
    fn test_device_setter_retags_vessels() {
        let mut manager = ConfigurationManager::new();
        assert_eq!(manager.set_device("em120").unwrap(), "em3000");
        assert_eq!(manager.get_config().vessel.device, DeviceTag::Em120 as u32);
        assert!(matches!(
            manager.set_device("EM120"),
            Err(ConfigError::Model(ErrModError::UnknownDeviceName(_)))
        ));
        assert_eq!(manager.get_config().device, "em120");
    }

    #[test]
    fn test_validation_reports_problems() {
        let config = RunConfig {
            device: "em9999".to_string(),
            vessel: VesselConfig { roll_sd: -0.1, ..VesselConfig::null() },
            ..RunConfig::default()
        };
        let result = ConfigurationManager::validate_config(&config);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
        assert!(!result.suggestions.is_empty());
    }

    #[test]
    fn test_validation_warns_on_mismatched_vessel() {
        let config = RunConfig {
            vessel: VesselConfig::for_device(DeviceTag::Em120 as u32),
            ..RunConfig::default()
        };
        let result = ConfigurationManager::validate_config(&config);
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("em120")));
    }

    #[test]
    fn test_single_head_ignores_overrides() {
        let config = RunConfig {
            port: Some(VesselConfig::null()),
            ..RunConfig::default()
        };
        let result = ConfigurationManager::validate_config(&config);
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("single head")));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut manager = ConfigurationManager::new();
        manager.update_config(dual_head_config()).unwrap();
        manager.save_to_file(&path).unwrap();
        assert!(!manager.is_modified());

        let loaded = ConfigurationManager::from_file(&path).unwrap();
        assert_eq!(loaded.get_config(), &dual_head_config());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "device": "em1002", "method": "iho", "params": { "iho_order": 2 } }"#).unwrap();

        let manager = ConfigurationManager::from_file(&path).unwrap();
        let config = manager.get_config();
        assert_eq!(config.method, ErrorMethod::Iho);
        assert_eq!(config.params.iho_order, IhoOrder::Order2);
        assert_eq!(config.params.default_sound_speed, 1500.0);
        assert_eq!(config.vessel.gps_drms, VesselConfig::null().gps_drms);
        assert!(config.port.is_none() && config.starboard.is_none());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "device": "em3000", "params": { "default_sound_speed": 900.0 } }"#).unwrap();
        assert!(matches!(
            ConfigurationManager::from_file(&path),
            Err(ConfigError::InvalidParameter { .. })
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ConfigurationManager::from_file(&path),
            Err(ConfigError::SerializationError { .. })
        ));

        assert!(matches!(
            ConfigurationManager::from_file(dir.path().join("missing.json")),
            Err(ConfigError::IoError { .. })
        ));
    }

    #[test]
    fn test_save_without_path() {
        let mut manager = ConfigurationManager::new();
        assert!(matches!(manager.save(), Err(ConfigError::IoError { .. })));
    }

    #[test]
    fn test_build_heads() {
        let mut manager = ConfigurationManager::new();
        assert!(manager.build_heads().is_shared());

        let mut config = dual_head_config();
        config.starboard = None;
        manager.update_config(config).unwrap();
        let heads = manager.build_heads();
        assert!(!heads.is_shared());
        assert_eq!(heads.head(crate::vessel::Head::Starboard).static_roll, 0.0);
    }

    #[test]
    fn test_build_model_estimates() {
        let mut manager = ConfigurationManager::new();
        manager.update_config(dual_head_config()).unwrap();
        let mut model = manager.build_model().unwrap();
        assert!(model.is_split());

        let mut soundings = vec![Sounding::new(20, 40.0, 30.0), Sounding::new(230, 40.0, 30.0)];
        model.estimate(&Platform::default(), &mut soundings).unwrap();
        assert!(soundings.iter().all(|s| s.vertical_variance > 0.0));
    }
}
