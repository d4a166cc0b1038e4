//! Multibeam Sounding Uncertainty
//!
//! Attributes a vertical and horizontal variance to every sounding of a
//! multibeam echosounder ping, from the sonar model, the vessel installation
//! and the platform attitude at the time of the ping.

pub mod core;
pub mod device;
pub mod errmod;
pub mod error;
pub mod utils;
pub mod vessel;

// Re-export commonly used types
pub use core::{DetectionMethod, Platform, Sounding, SPEED_OF_SOUND_WATER, UNUSABLE_VARIANCE};
pub use device::{beam_to_angle, catalog, lookup_by_name, lookup_by_tag, DeviceSpec, DeviceTag};
pub use errmod::{
    iho_limits, ErrorMethod, ErrorModel, HorizontalPolicy, IhoLimits, IhoOrder, ModelParams, SwathErrorModel,
};
pub use error::{ErrModError, Result};
pub use utils::{ConfigError, ConfigurationManager, RunConfig};
pub use vessel::{Head, HeadSet, LeverArm, VesselConfig};
