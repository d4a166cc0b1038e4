//! Uncertainty attribution for multibeam soundings
//!
//! An [`ErrorModel`] binds one catalog device and one vessel description to
//! one of two interchangeable strategies:
//!
//! - [`ErrorMethod::Iho`]: depth-only tolerances from the IHO survey order
//! - [`ErrorMethod::Full`]: the complete physical error budget
//!
//! For every ping the caller passes the platform orientation and the beam
//! array to [`ErrorModel::estimate`], which writes each sounding's vertical
//! and horizontal variance in place.

pub mod full;
pub mod iho;
pub mod swath;

pub use full::FullModel;
pub use iho::{iho_limits, IhoLimits, IhoModel, IhoOrder};
pub use swath::SwathErrorModel;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::core::{Platform, Sounding, SPEED_OF_SOUND_WATER};
use crate::device::DeviceSpec;
use crate::error::{ErrModError, Result};
use crate::vessel::VesselConfig;

/// Strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMethod {
    Iho,
    Full,
}

impl Default for ErrorMethod {
    fn default() -> Self {
        ErrorMethod::Full
    }
}

impl fmt::Display for ErrorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMethod::Iho => write!(f, "iho"),
            ErrorMethod::Full => write!(f, "full"),
        }
    }
}

impl FromStr for ErrorMethod {
    type Err = ErrModError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "iho" => Ok(ErrorMethod::Iho),
            "full" => Ok(ErrorMethod::Full),
            _ => Err(ErrModError::UnknownMethod(s.to_string())),
        }
    }
}

impl TryFrom<u32> for ErrorMethod {
    type Error = ErrModError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(ErrorMethod::Iho),
            1 => Ok(ErrorMethod::Full),
            _ => Err(ErrModError::UnknownMethod(value.to_string())),
        }
    }
}

/// What to do when a horizontal variance is not finite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalPolicy {
    /// Log a warning, store the value and carry on with the ping
    Warn,
    /// Abort the ping like a non-finite vertical variance
    Fail,
}

impl Default for HorizontalPolicy {
    fn default() -> Self {
        HorizontalPolicy::Warn
    }
}

/// Parameters threaded into every strategy at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Sound speed used when a ping carries none (m/s)
    pub default_sound_speed: f64,
    /// Survey order for the IHO strategy
    pub iho_order: IhoOrder,
    pub horizontal_policy: HorizontalPolicy,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            default_sound_speed: SPEED_OF_SOUND_WATER,
            iho_order: IhoOrder::default(),
            horizontal_policy: HorizontalPolicy::default(),
        }
    }
}

/// Active strategy and its private workspace
#[derive(Debug, Clone, PartialEq)]
enum Strategy {
    Iho(IhoModel),
    Full(Box<FullModel>),
}

impl Strategy {
    fn build(method: ErrorMethod, device: &DeviceSpec, vessel: &VesselConfig, params: &ModelParams) -> Result<Self> {
        match method {
            ErrorMethod::Iho => Ok(Strategy::Iho(IhoModel::new(params.iho_order))),
            ErrorMethod::Full => Ok(Strategy::Full(Box::new(FullModel::new(device, vessel, params)?))),
        }
    }

    fn method(&self) -> ErrorMethod {
        match self {
            Strategy::Iho(_) => ErrorMethod::Iho,
            Strategy::Full(_) => ErrorMethod::Full,
        }
    }
}

/// One device and vessel bound to an uncertainty strategy
///
/// Instances are independent and may be used from different threads; a
/// single instance is driven by one caller at a time through `&mut self`.
#[derive(Debug, Clone)]
pub struct ErrorModel {
    device: &'static DeviceSpec,
    vessel: Arc<VesselConfig>,
    params: ModelParams,
    strategy: Strategy,
}

impl ErrorModel {
    /// Bind `device` and `vessel` to `method` with default parameters
    pub fn new(device: &'static DeviceSpec, vessel: Arc<VesselConfig>, method: ErrorMethod) -> Result<Self> {
        Self::with_params(device, vessel, method, ModelParams::default())
    }

    pub fn with_params(
        device: &'static DeviceSpec,
        vessel: Arc<VesselConfig>,
        method: ErrorMethod,
        params: ModelParams,
    ) -> Result<Self> {
        let strategy = Strategy::build(method, device, &vessel, &params)?;
        debug!(device = device.name, method = %method, "error model created");
        Ok(Self {
            device,
            vessel,
            params,
            strategy,
        })
    }

    pub fn device(&self) -> &'static DeviceSpec {
        self.device
    }

    pub fn vessel(&self) -> &Arc<VesselConfig> {
        &self.vessel
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn method(&self) -> ErrorMethod {
        self.strategy.method()
    }

    /// Switch strategy. The new workspace is built before the old one is
    /// dropped, so on failure the model keeps its previous strategy.
    pub fn set_method(&mut self, method: ErrorMethod) -> Result<()> {
        let strategy = self.prepare(method)?;
        self.install(strategy);
        Ok(())
    }

    fn prepare(&self, method: ErrorMethod) -> Result<Strategy> {
        Strategy::build(method, self.device, &self.vessel, &self.params)
    }

    fn install(&mut self, strategy: Strategy) {
        debug!(device = self.device.name, from = %self.method(), to = %strategy.method(), "switching method");
        self.strategy = strategy;
    }

    /// Attribute vertical and horizontal variance to every sounding of a ping.
    ///
    /// Beam indices are checked first against the beams the ping formed
    /// (`platform.beam_count`, or the device maximum); an out-of-range beam
    /// fails the call before any sounding is touched. A non-finite vertical
    /// variance stops the ping at that beam.
    pub fn estimate(&mut self, platform: &Platform, soundings: &mut [Sounding]) -> Result<()> {
        let beams_formed = self.device.beams_formed(platform.beam_count);
        for sounding in soundings.iter() {
            self.device.check_beam_formed(sounding.beam, beams_formed)?;
        }
        match &mut self.strategy {
            Strategy::Iho(model) => model.compute(soundings),
            Strategy::Full(model) => model.compute(self.device, platform, soundings),
        }
    }

    /// Vertical-referenced, static-roll corrected angle of `beam` in degrees.
    /// Only the full strategy resolves beam angles.
    pub fn beam_angle(&self, beam: u32) -> Option<f64> {
        match &self.strategy {
            Strategy::Full(model) => model.beam_angle(beam),
            Strategy::Iho(_) => None,
        }
    }
}
