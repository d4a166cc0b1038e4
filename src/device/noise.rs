//! Per-device angular and range measurement noise

use super::{AngleErrorModel, DeviceSpec, RangeErrorModel};
use crate::core::{Platform, Sounding, UNUSABLE_VARIANCE};

/// Fraction of the beamwidth to which phase detection resolves the angle
/// with a single-sample window.
const PHASE_DETECT_FRACTION: f64 = 0.2;

/// Effective across-track beamwidth (radians) at `angle` degrees off the face.
fn effective_beamwidth(device: &DeviceSpec, angle: f64) -> Option<f64> {
    let nominal = device.across_beamwidth.to_radians();
    match device.angle_model {
        AngleErrorModel::Uniform => Some(nominal),
        AngleErrorModel::FlatPlate => Some(nominal / angle.to_radians().cos()),
        AngleErrorModel::None => None,
    }
}

/// Variance (rad²) of the beam pointing angle for one sounding.
///
/// Amplitude detects are uniformly distributed across the beam footprint;
/// phase detects shrink with the square root of the detection window length.
/// Devices with no model report [`UNUSABLE_VARIANCE`].
pub fn angle_error_variance(device: &DeviceSpec, _platform: &Platform, sounding: &Sounding, angle: f64) -> f64 {
    let Some(beamwidth) = effective_beamwidth(device, angle) else {
        return UNUSABLE_VARIANCE;
    };
    if sounding.is_phase_detect() {
        let window = sounding.window.max(1) as f64;
        let sd = PHASE_DETECT_FRACTION * beamwidth / window.sqrt();
        sd * sd
    } else {
        beamwidth * beamwidth / 12.0
    }
}

/// Variance (m²) of the slant range for one sounding.
pub fn range_error_variance(device: &DeviceSpec, platform: &Platform, sounding: &Sounding) -> f64 {
    match device.range_model {
        RangeErrorModel::DepthProportional { fraction, floor } => {
            let sd = (fraction * sounding.depth.abs()).max(floor);
            sd * sd
        }
        RangeErrorModel::RangeCell => {
            let cell = device.range_spacing / 2.0;
            let pulse = platform.vessel_speed * device.min_pulse_length / 4.0;
            cell * cell + pulse * pulse
        }
        RangeErrorModel::None => UNUSABLE_VARIANCE,
    }
}
