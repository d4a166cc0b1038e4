//! Beam number to pointing angle conversion

use super::{BeamGeometry, DeviceSpec};
use crate::core::INVALID_ANGLE;

/// Pointing angle of `beam` relative to the transducer face, in degrees with
/// port negative, assuming the device forms its full complement of beams.
///
/// Returns [`INVALID_ANGLE`] for beams the device cannot form or for devices
/// with no known geometry.
pub fn beam_to_angle(device: &DeviceSpec, sound_speed: f64, beam: u32) -> f64 {
    beam_to_angle_with_count(device, sound_speed, device.max_beams, beam)
}

/// As [`beam_to_angle`], for a ping that formed only `beam_count` beams.
pub fn beam_to_angle_with_count(device: &DeviceSpec, sound_speed: f64, beam_count: u32, beam: u32) -> f64 {
    let n = beam_count.min(device.max_beams);
    if n < 2 || beam >= n {
        return INVALID_ANGLE;
    }
    let half = n / 2;
    let offset = beam as f64 - half as f64;

    match device.geometry {
        BeamGeometry::EquiAngular => offset * (2.0 * device.max_angle / (n - 1) as f64),
        BeamGeometry::Phased => {
            // Element spacing is fixed so that the edge beam reaches max_angle
            // at the design sound speed; other sound speeds stretch the fan.
            let k = device.max_angle.to_radians().sin() / (half as f64 * device.nominal_wavelength());
            let s = (k * offset * device.wavelength(sound_speed)).clamp(-1.0, 1.0);
            s.asin().to_degrees()
        }
        BeamGeometry::DualHead { outer_angle, spacing } => {
            if beam < half {
                -outer_angle + beam as f64 * spacing
            } else {
                outer_angle - (n - 1 - beam) as f64 * spacing
            }
        }
        BeamGeometry::SplitHead { inner_angle, spacing } => {
            if beam < half {
                -inner_angle - (half - 1 - beam) as f64 * spacing
            } else {
                inner_angle + (beam - half) as f64 * spacing
            }
        }
        BeamGeometry::Unsupported => INVALID_ANGLE,
    }
}
