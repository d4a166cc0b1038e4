//! Core data types for the uncertainty engine

use serde::{Deserialize, Serialize};

use super::constants::SPEED_OF_SOUND_WATER;

/// Vessel orientation and environment at the time of a ping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    /// Ping time (seconds)
    pub timestamp: f64,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Roll, starboard down positive (degrees)
    pub roll: f64,
    /// Pitch, bow up positive (degrees)
    pub pitch: f64,
    /// Heading from true north (degrees)
    pub heading: f64,
    /// Heave (meters)
    pub heave: f64,
    /// Sound speed at the transducer face (m/s)
    pub surface_sound_speed: f64,
    /// Harmonic mean sound speed through the water column (m/s)
    pub mean_sound_speed: f64,
    /// Speed over ground (m/s)
    pub vessel_speed: f64,
    /// Rate of turn (degrees/s)
    pub heading_rate: f64,
    /// Pitch rate (degrees/s)
    pub pitch_rate: f64,
    /// Number of beams formed in this ping, if fewer than the device maximum
    pub beam_count: Option<u32>,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            timestamp: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            roll: 0.0,
            pitch: 0.0,
            heading: 0.0,
            heave: 0.0,
            surface_sound_speed: SPEED_OF_SOUND_WATER,
            mean_sound_speed: SPEED_OF_SOUND_WATER,
            vessel_speed: 0.0,
            heading_rate: 0.0,
            pitch_rate: 0.0,
            beam_count: None,
        }
    }
}

/// Bottom-detection technique used for a beam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    Amplitude,
    Phase,
}

/// One beam's measurement plus the variances attributed to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sounding {
    /// Beam number, port to starboard from zero
    pub beam: u32,
    /// Slant range (meters)
    pub range: f64,
    /// Depth, positive down (meters)
    pub depth: f64,
    pub detection: DetectionMethod,
    /// Samples in the bottom-detection window (phase detects)
    pub window: u32,
    /// Vertical variance (m²), written by the error model
    pub vertical_variance: f64,
    /// Horizontal variance (m²), written by the error model
    pub horizontal_variance: f64,
}

impl Sounding {
    pub fn new(beam: u32, range: f64, depth: f64) -> Self {
        Self {
            beam,
            range,
            depth,
            detection: DetectionMethod::Amplitude,
            window: 0,
            vertical_variance: 0.0,
            horizontal_variance: 0.0,
        }
    }

    pub fn with_phase_detection(mut self, window: u32) -> Self {
        self.detection = DetectionMethod::Phase;
        self.window = window;
        self
    }

    pub fn is_phase_detect(&self) -> bool {
        self.detection == DetectionMethod::Phase
    }
}
