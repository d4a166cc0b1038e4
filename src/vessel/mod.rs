//! Survey vessel installation and calibration description
//!
//! A [`VesselConfig`] holds the lever arms between the positioning and motion
//! sensors and the transducer, together with the accuracy of every sensor that
//! contributes to a sounding's uncertainty. Angles are in degrees, distances
//! in meters, times in seconds and speeds in m/s. Fields are `f32` so that the
//! in-memory layout matches the binary vessel record field for field.

pub mod heads;
pub mod record;

pub use heads::{Head, HeadSet};
pub use record::{decode_vessel, encode_vessel, RecordError};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::device::lookup_by_tag;
use crate::utils::config::{ConfigError, ValidationResult};

/// Sensor offset from the transducer reference point (x forward, y starboard, z down)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LeverArm {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LeverArm {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x as f64, self.y as f64, self.z as f64)
    }
}

/// Installation offsets and sensor accuracies for one transducer head
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VesselConfig {
    /// Start of validity (seconds since epoch)
    pub timestamp: u32,
    /// Device tag of the sonar fitted
    pub device: u32,

    /// GPS antenna position relative to the transducer
    pub gps_offset: LeverArm,
    /// Accuracy of the GPS offset survey (meters)
    pub gps_offset_sd: f32,
    /// IMU position relative to the transducer
    pub imu_offset: LeverArm,
    /// Accuracy of the IMU offset survey (meters)
    pub imu_offset_sd: f32,

    /// Static roll of the transducer mount (degrees)
    pub static_roll: f32,
    /// Accuracy of the static roll calibration (degrees)
    pub static_roll_sd: f32,

    pub roll_sd: f32,
    pub pitch_sd: f32,
    /// Pitch stabilisation accuracy (degrees)
    pub pitch_stab_sd: f32,
    /// Gyro heading accuracy (degrees)
    pub gyro_sd: f32,

    /// Sound speed profile accuracy (m/s)
    pub svp_sd: f32,
    /// Surface sound speed probe accuracy (m/s)
    pub surface_ss_sd: f32,

    /// Fixed heave error (meters)
    pub heave_fixed: f32,
    /// Heave error as a fraction of measured heave
    pub heave_pct: f32,

    /// Positioning latency accuracy (seconds)
    pub gps_latency_sd: f32,
    /// Attitude latency accuracy (seconds)
    pub attitude_latency_sd: f32,

    /// GPS distance root-mean-square error (meters)
    pub gps_drms: f32,

    pub draft: f32,
    pub draft_sd: f32,
    pub dyn_draft_sd: f32,
    pub loading_sd: f32,

    /// Speed over ground accuracy (m/s)
    pub sog_sd: f32,

    pub tide_measured_sd: f32,
    pub tide_predicted_sd: f32,
}

impl Default for VesselConfig {
    fn default() -> Self {
        Self {
            timestamp: 0,
            device: 0,
            gps_offset: LeverArm::default(),
            gps_offset_sd: 0.05,
            imu_offset: LeverArm::default(),
            imu_offset_sd: 0.05,
            static_roll: 0.0,
            static_roll_sd: 0.05,
            roll_sd: 0.05,
            pitch_sd: 0.05,
            pitch_stab_sd: 0.05,
            gyro_sd: 0.5,
            svp_sd: 0.5,
            surface_ss_sd: 0.5,
            heave_fixed: 0.05,
            heave_pct: 0.05,
            gps_latency_sd: 0.01,
            attitude_latency_sd: 0.01,
            gps_drms: 1.0,
            draft: 0.0,
            draft_sd: 0.02,
            dyn_draft_sd: 0.05,
            loading_sd: 0.02,
            sog_sd: 0.2,
            tide_measured_sd: 0.02,
            tide_predicted_sd: 0.1,
        }
    }
}

impl VesselConfig {
    /// Zero offsets with nominal sensor accuracies
    pub fn null() -> Self {
        Self::default()
    }

    /// Null vessel fitted with the given device
    pub fn for_device(device: u32) -> Self {
        Self {
            device,
            ..Self::default()
        }
    }

    /// Parse a JSON parameter set; absent fields keep their null defaults
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to parse vessel description: {}", e),
        })
    }

    /// Load a JSON parameter file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read vessel file '{}': {}", path_str, e),
        })?;
        Self::from_json_str(&content)
    }

    /// Write the configuration as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to serialize vessel: {}", e),
        })?;
        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write vessel file '{}': {}", path_str, e),
        })
    }

    /// Check the configuration for impossible or suspicious values
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut suggestions = Vec::new();

        if lookup_by_tag(self.device).is_err() {
            errors.push(ConfigError::InvalidParameter {
                parameter: "device".to_string(),
                value: self.device.to_string(),
                reason: "No sonar in the catalog carries this tag".to_string(),
            });
        }

        let deviations = [
            ("gps_offset_sd", self.gps_offset_sd),
            ("imu_offset_sd", self.imu_offset_sd),
            ("static_roll_sd", self.static_roll_sd),
            ("roll_sd", self.roll_sd),
            ("pitch_sd", self.pitch_sd),
            ("pitch_stab_sd", self.pitch_stab_sd),
            ("gyro_sd", self.gyro_sd),
            ("svp_sd", self.svp_sd),
            ("surface_ss_sd", self.surface_ss_sd),
            ("heave_fixed", self.heave_fixed),
            ("gps_latency_sd", self.gps_latency_sd),
            ("attitude_latency_sd", self.attitude_latency_sd),
            ("gps_drms", self.gps_drms),
            ("draft_sd", self.draft_sd),
            ("dyn_draft_sd", self.dyn_draft_sd),
            ("loading_sd", self.loading_sd),
            ("sog_sd", self.sog_sd),
            ("tide_measured_sd", self.tide_measured_sd),
            ("tide_predicted_sd", self.tide_predicted_sd),
        ];
        for (name, value) in deviations {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::InvalidParameter {
                    parameter: name.to_string(),
                    value: value.to_string(),
                    reason: "Standard deviations must be finite and non-negative".to_string(),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.heave_pct) {
            errors.push(ConfigError::InvalidParameter {
                parameter: "heave_pct".to_string(),
                value: self.heave_pct.to_string(),
                reason: "Heave error fraction must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.static_roll.abs() > 60.0 {
            warnings.push("Static roll beyond 60 degrees is unusual for a hull mount".to_string());
        }

        for (name, arm) in [("gps_offset", self.gps_offset), ("imu_offset", self.imu_offset)] {
            if arm.to_vector().norm() > 100.0 {
                warnings.push(format!("{} is more than 100 m from the transducer", name));
                suggestions.push(format!("Check the sign and units of {}", name));
            }
        }

        if self.gps_drms == 0.0 {
            warnings.push("Zero GPS DRMS assumes perfect positioning".to_string());
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
        }
    }
}
