//! Full physical error budget
//!
//! Propagates every independent error source of the installation into a
//! vertical and horizontal variance per sounding: reduction to datum, heave
//! (measured, fixed and induced by the IMU lever arm), attitude sensor errors,
//! lever-arm survey errors, latency, positioning, sound speed (profile and
//! steering) and the device's own range and angle measurement noise.
//!
//! Ping-invariant terms are reduced once at construction. The per-ping work is
//! the attitude-dependent coupling of those terms plus the per-beam projection
//! through the pointing angle.

use nalgebra::{Rotation3, Vector3};
use tracing::{debug, warn};

use super::{HorizontalPolicy, ModelParams};
use crate::core::{Platform, Sounding};
use crate::device::{angle_error_variance, beam_to_angle_with_count, range_error_variance, BeamGeometry, DeviceSpec};
use crate::error::{ErrModError, Result};
use crate::vessel::VesselConfig;

fn sq(x: f64) -> f64 {
    x * x
}

/// Variance in rad² of a standard deviation given in degrees
fn angular_var(sd_deg: f32) -> f64 {
    sq((sd_deg as f64).to_radians())
}

fn linear_var(sd: f32) -> f64 {
    sq(sd as f64)
}

/// Window of face angles (degrees) inside which beams are not steered
#[derive(Debug, Clone, Copy, PartialEq)]
struct Steering {
    /// Surface sound speed probe variance (m/s)²
    surface_ss_var: f64,
    min_angle: f64,
    max_angle: f64,
}

impl Steering {
    fn applies(&self, face_angle: f64) -> bool {
        face_angle < self.min_angle || face_angle > self.max_angle
    }
}

/// Full strategy state: ping-invariant variances plus the beam angle table
#[derive(Debug, Clone, PartialEq)]
pub struct FullModel {
    /// Draft, dynamic draft, loading and tide (m²)
    rtd_var: f64,
    heave_fixed_var: f64,
    heave_pct: f64,
    /// Roll sensor plus mount alignment (rad²)
    roll_var: f64,
    /// Pitch sensor plus stabilisation (rad²)
    pitch_var: f64,
    gyro_var: f64,
    gps_offset_var: f64,
    imu_offset_var: f64,
    /// Sound speed profile (m/s)²
    svp_var: f64,
    along_coeff: f64,
    gps_latency_var: f64,
    latency_var: f64,
    sog_var: f64,
    /// Nominal positioning variance from GPS DRMS (m²)
    gps_var: f64,
    steering: Option<Steering>,
    gps_arm: Vector3<f64>,
    imu_arm: Vector3<f64>,
    static_roll: f64,
    default_sound_speed: f64,
    horizontal_policy: HorizontalPolicy,
    /// Vertical-referenced beam angles (radians), static roll applied
    angles: Vec<f64>,
    table_sound_speed: f64,
}

/// Attitude-dependent terms shared by every beam of a ping
#[derive(Debug, Clone, Copy)]
struct PingTerms {
    sin_pitch: f64,
    cos_pitch: f64,
    roll: f64,
    heave_var: f64,
    horizontal_var: f64,
}

impl FullModel {
    pub fn new(device: &DeviceSpec, vessel: &VesselConfig, params: &ModelParams) -> Result<Self> {
        if device.geometry == BeamGeometry::Unsupported {
            return Err(ErrModError::Unsupported {
                device: device.name,
                operation: "beam angle resolution",
            });
        }

        let rtd_var = linear_var(vessel.draft_sd)
            + linear_var(vessel.dyn_draft_sd)
            + linear_var(vessel.loading_sd)
            + linear_var(vessel.tide_measured_sd)
            + linear_var(vessel.tide_predicted_sd);

        let half_along = device.along_beamwidth.to_radians() / 2.0;

        let steering = device.is_steered().then(|| Steering {
            surface_ss_var: linear_var(vessel.surface_ss_sd),
            min_angle: -device.steer_angle,
            max_angle: device.steer_angle,
        });

        let mut model = Self {
            rtd_var,
            heave_fixed_var: linear_var(vessel.heave_fixed),
            heave_pct: vessel.heave_pct as f64,
            roll_var: angular_var(vessel.roll_sd) + angular_var(vessel.static_roll_sd),
            pitch_var: angular_var(vessel.pitch_sd) + angular_var(vessel.pitch_stab_sd),
            gyro_var: angular_var(vessel.gyro_sd),
            gps_offset_var: linear_var(vessel.gps_offset_sd),
            imu_offset_var: linear_var(vessel.imu_offset_sd),
            svp_var: linear_var(vessel.svp_sd),
            along_coeff: sq(1.0 - half_along.cos()),
            gps_latency_var: linear_var(vessel.gps_latency_sd),
            latency_var: linear_var(vessel.gps_latency_sd) + linear_var(vessel.attitude_latency_sd),
            sog_var: linear_var(vessel.sog_sd),
            gps_var: linear_var(vessel.gps_drms),
            steering,
            gps_arm: vessel.gps_offset.to_vector(),
            imu_arm: vessel.imu_offset.to_vector(),
            static_roll: (vessel.static_roll as f64).to_radians(),
            default_sound_speed: params.default_sound_speed,
            horizontal_policy: params.horizontal_policy,
            angles: Vec::new(),
            table_sound_speed: params.default_sound_speed,
        };
        model.rebuild_angles(device, device.max_beams, params.default_sound_speed);

        debug!(
            device = device.name,
            beams = model.angles.len(),
            steered = device.is_steered(),
            "full error model constructed"
        );
        Ok(model)
    }

    fn rebuild_angles(&mut self, device: &DeviceSpec, beam_count: u32, sound_speed: f64) {
        self.angles = (0..beam_count)
            .map(|beam| beam_to_angle_with_count(device, sound_speed, beam_count, beam).to_radians() + self.static_roll)
            .collect();
        self.table_sound_speed = sound_speed;
    }

    /// Beam angle table (radians), as last built
    pub fn beam_angles(&self) -> &[f64] {
        &self.angles
    }

    /// Vertical-referenced angle of `beam` in degrees
    pub fn beam_angle(&self, beam: u32) -> Option<f64> {
        self.angles.get(beam as usize).map(|angle| angle.to_degrees())
    }

    fn surface_sound_speed(&self, platform: &Platform) -> f64 {
        let ss = platform.surface_sound_speed;
        if ss.is_finite() && ss > 0.0 {
            ss
        } else {
            self.default_sound_speed
        }
    }

    fn mean_sound_speed(&self, platform: &Platform) -> f64 {
        let ss = platform.mean_sound_speed;
        if ss.is_finite() && ss > 0.0 {
            ss
        } else {
            self.default_sound_speed
        }
    }

    /// Rebuild the angle table when the ping formed a different number of
    /// beams, or when a steered device sees a new surface sound speed.
    fn refresh_angles(&mut self, device: &DeviceSpec, platform: &Platform) {
        let beam_count = device.beams_formed(platform.beam_count);
        if let Some(requested) = platform.beam_count.filter(|&n| n != beam_count) {
            warn!(
                device = device.name,
                requested,
                max_beams = device.max_beams,
                "ping beam count outside device range, using full complement"
            );
        }
        let surface_ss = self.surface_sound_speed(platform);
        let count_changed = beam_count as usize != self.angles.len();
        let speed_changed = device.is_steered() && surface_ss != self.table_sound_speed;
        if count_changed || speed_changed {
            debug!(
                device = device.name,
                beams = beam_count,
                sound_speed = surface_ss,
                "rebuilding beam angle table"
            );
            let sound_speed = if device.is_steered() { surface_ss } else { self.table_sound_speed };
            self.rebuild_angles(device, beam_count, sound_speed);
        }
    }

    fn ping_terms(&self, platform: &Platform) -> PingTerms {
        let roll = platform.roll.to_radians();
        let pitch = platform.pitch.to_radians();
        let cos_roll = roll.cos();
        let (sin_pitch, cos_pitch) = pitch.sin_cos();

        let roll_rot = Rotation3::from_axis_angle(&Vector3::x_axis(), roll);
        let pitch_rot = Rotation3::from_axis_angle(&Vector3::y_axis(), pitch);
        let attitude = pitch_rot * roll_rot;

        // Sensitivity of a rotated lever arm to roll and pitch
        let d_roll = |arm: &Vector3<f64>| attitude * Vector3::x().cross(arm);
        let d_pitch = |arm: &Vector3<f64>| pitch_rot * Vector3::y().cross(&(roll_rot * arm));

        // Heave: measured (or its floor) plus heave induced at the IMU
        let measured = sq(self.heave_pct * platform.heave);
        let imu_roll = d_roll(&self.imu_arm);
        let imu_pitch = d_pitch(&self.imu_arm);
        let induced = self.pitch_var * sq(imu_pitch.z)
            + self.roll_var * sq(imu_roll.z)
            + 2.0 * self.imu_offset_var * (1.0 - cos_pitch * cos_roll);
        let heave_var = measured.max(self.heave_fixed_var) + induced;

        // GPS antenna to transducer transfer
        let arm = attitude * self.gps_arm;
        let gps_roll = d_roll(&self.gps_arm);
        let gps_pitch = d_pitch(&self.gps_arm);
        let horizontal_arm = sq(arm.x) + sq(arm.y);
        let offset_var = 2.0 * (self.gps_offset_var + self.imu_offset_var)
            + self.gyro_var * horizontal_arm
            + self.roll_var * (sq(gps_roll.x) + sq(gps_roll.y))
            + self.pitch_var * (sq(gps_pitch.x) + sq(gps_pitch.y));

        // Latency: position lag along track, speed error over the total lag,
        // and the lever arm swinging with heading and pitch rates
        let speed = platform.vessel_speed;
        let heading_rate = platform.heading_rate.to_radians();
        let pitch_rate = platform.pitch_rate.to_radians();
        let latency_var = sq(cos_pitch) * (sq(speed) * self.gps_latency_var + self.sog_var * self.latency_var)
            + sq(heading_rate) * self.latency_var * horizontal_arm
            + sq(pitch_rate) * self.latency_var * (sq(gps_pitch.x) + sq(gps_pitch.y));

        PingTerms {
            sin_pitch,
            cos_pitch,
            roll,
            heave_var,
            horizontal_var: self.gps_var + latency_var + offset_var,
        }
    }

    /// Attribute a ping's soundings. Every beam is checked against the beams
    /// the ping formed before any sounding is written. Stops at the first
    /// beam whose vertical variance is not finite; beams already written
    /// stay written.
    pub fn compute(&mut self, device: &DeviceSpec, platform: &Platform, soundings: &mut [Sounding]) -> Result<()> {
        self.refresh_angles(device, platform);
        let beams_formed = self.angles.len() as u32;
        for sounding in soundings.iter() {
            device.check_beam_formed(sounding.beam, beams_formed)?;
        }
        let ping = self.ping_terms(platform);
        let surface_ss = self.surface_sound_speed(platform);
        let mean_ss = self.mean_sound_speed(platform);
        let svp_rel_var = self.svp_var / sq(mean_ss);

        for sounding in soundings.iter_mut() {
            let angle = self.angles[sounding.beam as usize];

            let face = angle - self.static_roll;
            let face_deg = face.to_degrees();
            let tilt = angle + ping.roll;
            let (sin_tilt, cos_tilt) = tilt.sin_cos();

            // Pointing angle: device noise, refraction, steering and roll
            let mut angle_var = angle_error_variance(device, platform, sounding, face_deg)
                + svp_rel_var * sq(tilt.tan())
                + self.roll_var;
            if let Some(steering) = self.steering {
                if steering.applies(face_deg) {
                    angle_var += steering.surface_ss_var / sq(surface_ss) * sq(face.tan());
                }
            }

            let range = sounding.range;
            let depth = sounding.depth.abs();
            let range_var = range_error_variance(device, platform, sounding) + svp_rel_var * sq(range);

            let swath_var = range_var * sq(ping.cos_pitch * cos_tilt)
                + angle_var * sq(range * sin_tilt * ping.cos_pitch)
                + self.pitch_var * sq(range * cos_tilt * ping.sin_pitch)
                + self.along_coeff * sq(depth);
            let vertical = self.rtd_var + ping.heave_var + swath_var;

            let beam_horizontal = range_var * sq(sin_tilt)
                + self.gyro_var * sq(range * sin_tilt)
                + angle_var * sq(range * cos_tilt)
                + self.pitch_var * sq(range * cos_tilt * ping.cos_pitch);
            let horizontal = ping.horizontal_var + beam_horizontal;

            if !vertical.is_finite() {
                return Err(ErrModError::NonFiniteVertical { beam: sounding.beam });
            }
            if !horizontal.is_finite() {
                match self.horizontal_policy {
                    HorizontalPolicy::Warn => {
                        warn!(device = device.name, beam = sounding.beam, "non-finite horizontal variance");
                    }
                    HorizontalPolicy::Fail => {
                        return Err(ErrModError::NonFiniteHorizontal { beam: sounding.beam });
                    }
                }
            }

            sounding.vertical_variance = vertical;
            sounding.horizontal_variance = horizontal;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SPEED_OF_SOUND_WATER;
    use crate::device::DeviceTag;
    use crate::vessel::LeverArm;
    use approx::assert_relative_eq;

    fn quiet_vessel() -> VesselConfig {
        VesselConfig {
            timestamp: 0,
            device: 0,
            gps_offset: LeverArm::default(),
            gps_offset_sd: 0.0,
            imu_offset: LeverArm::default(),
            imu_offset_sd: 0.0,
            static_roll: 0.0,
            static_roll_sd: 0.0,
            roll_sd: 0.0,
            pitch_sd: 0.0,
            pitch_stab_sd: 0.0,
            gyro_sd: 0.0,
            svp_sd: 0.0,
            surface_ss_sd: 0.0,
            heave_fixed: 0.0,
            heave_pct: 0.0,
            gps_latency_sd: 0.0,
            attitude_latency_sd: 0.0,
            gps_drms: 0.0,
            draft: 0.0,
            draft_sd: 0.0,
            dyn_draft_sd: 0.0,
            loading_sd: 0.0,
            sog_sd: 0.0,
            tide_measured_sd: 0.0,
            tide_predicted_sd: 0.0,
        }
    }

    fn survey_vessel() -> VesselConfig {
        VesselConfig {
            gps_offset: LeverArm::new(1.8, -0.6, -11.5),
            imu_offset: LeverArm::new(0.4, 0.1, -1.3),
            static_roll: 0.3,
            ..VesselConfig::null()
        }
    }

    fn swath(device: &DeviceSpec, depth: f64) -> Vec<Sounding> {
        (0..device.max_beams)
            .map(|beam| {
                let angle = crate::device::beam_to_angle(device, SPEED_OF_SOUND_WATER, beam).to_radians();
                Sounding::new(beam, depth / angle.cos(), depth)
            })
            .collect()
    }

    fn rolling_platform() -> Platform {
        Platform {
            roll: 2.5,
            pitch: -1.2,
            heading: 47.0,
            heave: 0.8,
            vessel_speed: 4.5,
            heading_rate: 1.5,
            pitch_rate: 0.7,
            surface_sound_speed: 1492.0,
            mean_sound_speed: 1487.0,
            ..Platform::default()
        }
    }

    #[test]
    fn test_nadir_beam_quiet_vessel() {
        let device = DeviceTag::Sb8101.spec();
        let vessel = VesselConfig { draft_sd: 0.1, ..quiet_vessel() };
        let mut model = FullModel::new(device, &vessel, &ModelParams::default()).unwrap();

        let mut soundings = vec![Sounding::new(50, 40.0, 40.0)];
        model.compute(device, &Platform::default(), &mut soundings).unwrap();

        let range_var = sq(0.052 / 2.0);
        let along = sq(1.0 - (0.75f64).to_radians().cos());
        let bw = 1.5f64.to_radians();
        assert_relative_eq!(
            soundings[0].vertical_variance,
            0.01 + range_var + along * 1600.0,
            max_relative = 1e-6
        );
        assert_relative_eq!(soundings[0].horizontal_variance, bw * bw / 12.0 * 1600.0, max_relative = 1e-9);
    }

    #[test]
    fn test_outputs_finite_and_positive() {
        for tag in [DeviceTag::Em3000, DeviceTag::Em120, DeviceTag::Em3000D, DeviceTag::Sb1180, DeviceTag::Em2000] {
            let device = tag.spec();
            let mut model = FullModel::new(device, &survey_vessel(), &ModelParams::default()).unwrap();
            let mut soundings = swath(device, 75.0);
            model.compute(device, &rolling_platform(), &mut soundings).unwrap();
            for s in &soundings {
                assert!(s.vertical_variance.is_finite() && s.vertical_variance > 0.0, "{} {}", device.name, s.beam);
                assert!(s.horizontal_variance.is_finite() && s.horizontal_variance > 0.0);
            }
        }
    }

    #[test]
    fn test_outer_beams_less_certain_than_nadir() {
        let device = DeviceTag::Em3000.spec();
        let mut model = FullModel::new(device, &survey_vessel(), &ModelParams::default()).unwrap();
        let mut soundings = swath(device, 30.0);
        model.compute(device, &Platform::default(), &mut soundings).unwrap();
        let nadir = &soundings[64];
        assert!(soundings[0].vertical_variance > nadir.vertical_variance);
        assert!(soundings[127].vertical_variance > nadir.vertical_variance);
        assert!(soundings[0].horizontal_variance > nadir.horizontal_variance);
    }

    #[test]
    fn test_identical_inputs_identical_outputs() {
        let device = DeviceTag::Em3000D.spec();
        let params = ModelParams::default();
        let mut first = FullModel::new(device, &survey_vessel(), &params).unwrap();
        let mut second = FullModel::new(device, &survey_vessel(), &params).unwrap();
        assert_eq!(first, second);

        let mut a = swath(device, 42.0);
        let mut b = a.clone();
        first.compute(device, &rolling_platform(), &mut a).unwrap();
        second.compute(device, &rolling_platform(), &mut b).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.vertical_variance.to_bits(), y.vertical_variance.to_bits());
            assert_eq!(x.horizontal_variance.to_bits(), y.horizontal_variance.to_bits());
        }
    }

    #[test]
    fn test_sound_speed_rebuilds_steered_table() {
        let device = DeviceTag::Em3000.spec();
        let mut model = FullModel::new(device, &survey_vessel(), &ModelParams::default()).unwrap();
        let before = model.beam_angles().to_vec();

        let platform = Platform { surface_sound_speed: 1530.0, ..Platform::default() };
        model.compute(device, &platform, &mut swath(device, 20.0)).unwrap();
        let after = model.beam_angles();
        assert!(before.iter().zip(after).any(|(x, y)| x != y));
        assert_eq!(before[64], after[64]);
    }

    #[test]
    fn test_sound_speed_leaves_unsteered_table_alone() {
        let device = DeviceTag::Sb8101.spec();
        let mut model = FullModel::new(device, &survey_vessel(), &ModelParams::default()).unwrap();
        let before = model.beam_angles().to_vec();

        let platform = Platform { surface_sound_speed: 1530.0, ..Platform::default() };
        model.compute(device, &platform, &mut swath(device, 20.0)).unwrap();
        assert_eq!(before, model.beam_angles());
    }

    #[test]
    fn test_table_follows_beam_count() {
        let device = DeviceTag::Em120.spec();
        let mut model = FullModel::new(device, &survey_vessel(), &ModelParams::default()).unwrap();
        assert_eq!(model.beam_angles().len(), 191);

        let platform = Platform { beam_count: Some(101), ..Platform::default() };
        let mut soundings = vec![Sounding::new(100, 3000.0, 2900.0)];
        model.compute(device, &platform, &mut soundings).unwrap();
        assert_eq!(model.beam_angles().len(), 101);
        assert_relative_eq!(model.beam_angle(100).unwrap(), 75.0 + 0.3, epsilon = 1e-5);

        let mut beyond = vec![Sounding::new(150, 3000.0, 2900.0)];
        assert!(matches!(
            model.compute(device, &platform, &mut beyond),
            Err(ErrModError::BeamOutOfRange { beam: 150, max_beams: 101, .. })
        ));
    }

    #[test]
    fn test_static_roll_applied_to_angles() {
        let device = DeviceTag::Em3000.spec();
        let vessel = VesselConfig { static_roll: 2.0, ..quiet_vessel() };
        let model = FullModel::new(device, &vessel, &ModelParams::default()).unwrap();
        assert_relative_eq!(model.beam_angle(64).unwrap(), 2.0, epsilon = 1e-5);
        assert_relative_eq!(model.beam_angle(0).unwrap(), -63.0, epsilon = 1e-5);
        assert_eq!(model.beam_angle(128), None);
    }

    #[test]
    fn test_flat_plate_steering_outside_nadir_only() {
        let device = DeviceTag::Em3000.spec();
        let calm = quiet_vessel();
        let probe = VesselConfig { surface_ss_sd: 2.0, ..quiet_vessel() };
        let mut base = FullModel::new(device, &calm, &ModelParams::default()).unwrap();
        let mut noisy = FullModel::new(device, &probe, &ModelParams::default()).unwrap();

        let mut a = swath(device, 30.0);
        let mut b = a.clone();
        base.compute(device, &Platform::default(), &mut a).unwrap();
        noisy.compute(device, &Platform::default(), &mut b).unwrap();

        assert_eq!(a[64].vertical_variance, b[64].vertical_variance);
        assert!(b[10].vertical_variance > a[10].vertical_variance);
        assert!(b[120].horizontal_variance > a[120].horizontal_variance);
    }

    #[test]
    fn test_partial_steering_window() {
        let device = DeviceTag::Em2000.spec();
        let probe = VesselConfig { surface_ss_sd: 2.0, ..quiet_vessel() };
        let mut base = FullModel::new(device, &quiet_vessel(), &ModelParams::default()).unwrap();
        let mut noisy = FullModel::new(device, &probe, &ModelParams::default()).unwrap();

        let mut a = swath(device, 30.0);
        let mut b = a.clone();
        base.compute(device, &Platform::default(), &mut a).unwrap();
        noisy.compute(device, &Platform::default(), &mut b).unwrap();

        // Beam 55 is nadir, beam 30 about -27 degrees: both inside +/-45
        assert_eq!(a[55].vertical_variance, b[55].vertical_variance);
        assert_eq!(a[30].vertical_variance, b[30].vertical_variance);
        // Beam 2 is beyond -45 degrees and steered
        assert!(b[2].vertical_variance > a[2].vertical_variance);
    }

    #[test]
    fn test_unsteered_ignores_surface_probe() {
        let device = DeviceTag::Sb8101.spec();
        let probe = VesselConfig { surface_ss_sd: 2.0, ..quiet_vessel() };
        let mut base = FullModel::new(device, &quiet_vessel(), &ModelParams::default()).unwrap();
        let mut noisy = FullModel::new(device, &probe, &ModelParams::default()).unwrap();
        let mut a = swath(device, 30.0);
        let mut b = a.clone();
        base.compute(device, &Platform::default(), &mut a).unwrap();
        noisy.compute(device, &Platform::default(), &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_measured_heave_overrides_floor() {
        let device = DeviceTag::Sb8111.spec();
        let vessel = VesselConfig { heave_fixed: 0.05, heave_pct: 0.05, ..quiet_vessel() };
        let mut model = FullModel::new(device, &vessel, &ModelParams::default()).unwrap();

        let mut calm = vec![Sounding::new(50, 40.0, 40.0)];
        model.compute(device, &Platform::default(), &mut calm).unwrap();
        let mut heaving = calm.clone();
        let platform = Platform { heave: 3.0, ..Platform::default() };
        model.compute(device, &platform, &mut heaving).unwrap();

        // floor 0.05^2 replaced by (0.05 * 3)^2
        assert_relative_eq!(
            heaving[0].vertical_variance - calm[0].vertical_variance,
            0.0225 - 0.0025,
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_imu_lever_arm_induces_heave() {
        let device = DeviceTag::Sb8111.spec();
        let vessel = VesselConfig {
            imu_offset: LeverArm::new(5.0, 2.0, -1.0),
            pitch_sd: 0.5,
            roll_sd: 0.5,
            ..quiet_vessel()
        };
        let mut model = FullModel::new(device, &vessel, &ModelParams::default()).unwrap();
        let mut level = vec![Sounding::new(50, 40.0, 40.0)];
        model.compute(device, &Platform::default(), &mut level).unwrap();

        let mut no_arm = FullModel::new(device, &VesselConfig { imu_offset: LeverArm::default(), ..vessel }, &ModelParams::default()).unwrap();
        let mut reference = vec![Sounding::new(50, 40.0, 40.0)];
        no_arm.compute(device, &Platform::default(), &mut reference).unwrap();

        // At level trim the forward arm couples pitch, the athwartships arm roll
        let pitch_var = sq(0.5f64.to_radians());
        let roll_var = sq(0.5f64.to_radians());
        assert_relative_eq!(
            level[0].vertical_variance - reference[0].vertical_variance,
            pitch_var * 25.0 + roll_var * 4.0,
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_non_finite_vertical_stops_ping() {
        let device = DeviceTag::Em3000.spec();
        let mut model = FullModel::new(device, &survey_vessel(), &ModelParams::default()).unwrap();
        let mut soundings = vec![
            Sounding::new(60, 20.0, 20.0),
            Sounding::new(61, f64::NAN, 20.0),
            Sounding::new(62, 20.0, 20.0),
        ];
        let result = model.compute(device, &Platform::default(), &mut soundings);
        assert_eq!(result, Err(ErrModError::NonFiniteVertical { beam: 61 }));
        assert!(soundings[0].vertical_variance > 0.0);
        assert_eq!(soundings[1].vertical_variance, 0.0);
        assert_eq!(soundings[2].vertical_variance, 0.0);

        // The model stays usable
        let mut next = vec![Sounding::new(61, 20.0, 20.0)];
        assert!(model.compute(device, &Platform::default(), &mut next).is_ok());
    }

    #[test]
    fn test_horizontal_policy_warn_continues() {
        let device = DeviceTag::Em3000.spec();
        let mut model = FullModel::new(device, &survey_vessel(), &ModelParams::default()).unwrap();
        let platform = Platform { heading_rate: f64::NAN, ..Platform::default() };
        let mut soundings = vec![Sounding::new(60, 20.0, 20.0), Sounding::new(70, 20.0, 20.0)];
        model.compute(device, &platform, &mut soundings).unwrap();
        assert!(soundings.iter().all(|s| s.vertical_variance.is_finite()));
        assert!(soundings.iter().all(|s| s.horizontal_variance.is_nan()));
    }

    #[test]
    fn test_horizontal_policy_fail_aborts() {
        let device = DeviceTag::Em3000.spec();
        let params = ModelParams { horizontal_policy: HorizontalPolicy::Fail, ..ModelParams::default() };
        let mut model = FullModel::new(device, &survey_vessel(), &params).unwrap();
        let platform = Platform { heading_rate: f64::NAN, ..Platform::default() };
        let mut soundings = vec![Sounding::new(60, 20.0, 20.0), Sounding::new(70, 20.0, 20.0)];
        assert_eq!(
            model.compute(device, &platform, &mut soundings),
            Err(ErrModError::NonFiniteHorizontal { beam: 60 })
        );
        assert_eq!(soundings[0].horizontal_variance, 0.0);
    }

    #[test]
    fn test_unsupported_geometry_rejected() {
        let device = DeviceTag::Unknown.spec();
        assert!(matches!(
            FullModel::new(device, &VesselConfig::null(), &ModelParams::default()),
            Err(ErrModError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_invalid_sound_speed_falls_back_to_default() {
        let device = DeviceTag::Em3000.spec();
        let mut model = FullModel::new(device, &survey_vessel(), &ModelParams::default()).unwrap();
        let before = model.beam_angles().to_vec();
        let platform = Platform { surface_sound_speed: 0.0, mean_sound_speed: f64::NAN, ..Platform::default() };
        let mut soundings = swath(device, 20.0);
        model.compute(device, &platform, &mut soundings).unwrap();
        assert_eq!(before, model.beam_angles());
        assert!(soundings.iter().all(|s| s.vertical_variance.is_finite()));
    }

    /// Horizontal variance of the sb8111 nadir beam. Tilt is zero there, so
    /// the beam's range and gyro projections drop out.
    fn nadir_horizontal(vessel: &VesselConfig, platform: &Platform) -> f64 {
        let device = DeviceTag::Sb8111.spec();
        let mut model = FullModel::new(device, vessel, &ModelParams::default()).unwrap();
        let mut soundings = vec![Sounding::new(50, 40.0, 40.0)];
        model.compute(device, platform, &mut soundings).unwrap();
        soundings[0].horizontal_variance
    }

    fn latent_vessel() -> VesselConfig {
        VesselConfig {
            gps_latency_sd: 0.1,
            attitude_latency_sd: 0.1,
            ..quiet_vessel()
        }
    }

    #[test]
    fn test_gps_drms_adds_to_horizontal() {
        let level = Platform::default();
        let base = nadir_horizontal(&quiet_vessel(), &level);
        let gps = nadir_horizontal(&VesselConfig { gps_drms: 1.5, ..quiet_vessel() }, &level);
        assert_relative_eq!(gps - base, 2.25, max_relative = 1e-9);
    }

    #[test]
    fn test_offset_determination_adds_to_horizontal() {
        let level = Platform::default();
        let base = nadir_horizontal(&quiet_vessel(), &level);
        let surveyed = VesselConfig {
            gps_offset_sd: 0.1,
            imu_offset_sd: 0.05,
            ..quiet_vessel()
        };
        assert_relative_eq!(
            nadir_horizontal(&surveyed, &level) - base,
            2.0 * (sq(0.1) + sq(0.05)),
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_gyro_couples_horizontal_gps_arm() {
        let level = Platform::default();
        let armed = VesselConfig { gps_offset: LeverArm::new(2.0, 1.0, -10.0), ..quiet_vessel() };
        let base = nadir_horizontal(&armed, &level);
        let gyro = nadir_horizontal(&VesselConfig { gyro_sd: 0.5, ..armed }, &level);
        assert_relative_eq!(gyro - base, sq(0.5f64.to_radians()) * 5.0, max_relative = 1e-6);
    }

    #[test]
    fn test_roll_and_pitch_couple_vertical_gps_arm() {
        let level = Platform::default();
        let attitude = VesselConfig { roll_sd: 0.5, pitch_sd: 0.3, ..quiet_vessel() };
        let base = nadir_horizontal(&attitude, &level);
        let armed = nadir_horizontal(
            &VesselConfig { gps_offset: LeverArm::new(0.0, 0.0, -10.0), ..attitude },
            &level,
        );
        // A mast 10 m above the transducer swings 10 m per radian of roll or pitch
        let expected = (sq(0.5f64.to_radians()) + sq(0.3f64.to_radians())) * 100.0;
        assert_relative_eq!(armed - base, expected, max_relative = 1e-6);
    }

    #[test]
    fn test_speed_over_position_latency() {
        let underway = Platform { vessel_speed: 5.0, ..Platform::default() };
        let base = nadir_horizontal(&quiet_vessel(), &underway);
        let lagged = nadir_horizontal(&VesselConfig { gps_latency_sd: 0.1, ..quiet_vessel() }, &underway);
        assert_relative_eq!(lagged - base, 25.0 * sq(0.1), max_relative = 1e-6);
    }

    #[test]
    fn test_speed_error_over_total_latency() {
        let level = Platform::default();
        let vessel = VesselConfig {
            gps_latency_sd: 0.1,
            attitude_latency_sd: 0.2,
            ..quiet_vessel()
        };
        let base = nadir_horizontal(&vessel, &level);
        let sog = nadir_horizontal(&VesselConfig { sog_sd: 0.3, ..vessel }, &level);
        assert_relative_eq!(sog - base, sq(0.3) * (sq(0.1) + sq(0.2)), max_relative = 1e-6);
    }

    #[test]
    fn test_heading_rate_swings_gps_arm() {
        let vessel = VesselConfig { gps_offset: LeverArm::new(2.0, 1.0, -10.0), ..latent_vessel() };
        let steady = nadir_horizontal(&vessel, &Platform::default());
        let turning = nadir_horizontal(&vessel, &Platform { heading_rate: 3.0, ..Platform::default() });
        let expected = sq(3.0f64.to_radians()) * (sq(0.1) + sq(0.1)) * 5.0;
        assert_relative_eq!(turning - steady, expected, max_relative = 1e-6);
    }

    #[test]
    fn test_pitch_rate_swings_gps_arm() {
        let vessel = VesselConfig { gps_offset: LeverArm::new(0.0, 0.0, -10.0), ..latent_vessel() };
        let steady = nadir_horizontal(&vessel, &Platform::default());
        let pitching = nadir_horizontal(&vessel, &Platform { pitch_rate: 2.0, ..Platform::default() });
        let expected = sq(2.0f64.to_radians()) * (sq(0.1) + sq(0.1)) * 100.0;
        assert_relative_eq!(pitching - steady, expected, max_relative = 1e-6);
    }

    #[test]
    fn test_unformable_beam_count_uses_full_table() {
        let device = DeviceTag::Em120.spec();
        let mut model = FullModel::new(device, &survey_vessel(), &ModelParams::default()).unwrap();
        for requested in [0, 1, 192, 4000] {
            let platform = Platform { beam_count: Some(requested), ..Platform::default() };
            let mut soundings = vec![Sounding::new(190, 3000.0, 2900.0)];
            model.compute(device, &platform, &mut soundings).unwrap();
            assert_eq!(model.beam_angles().len(), 191);
        }
    }

    #[test]
    fn test_reduced_ping_rejects_before_writing() {
        let device = DeviceTag::Em120.spec();
        let mut model = FullModel::new(device, &survey_vessel(), &ModelParams::default()).unwrap();
        let platform = Platform { beam_count: Some(101), ..Platform::default() };
        let mut soundings = vec![Sounding::new(10, 3000.0, 2900.0), Sounding::new(150, 3000.0, 2900.0)];
        assert!(matches!(
            model.compute(device, &platform, &mut soundings),
            Err(ErrModError::BeamOutOfRange { beam: 150, max_beams: 101, .. })
        ));
        assert_eq!(soundings[0].vertical_variance, 0.0);
        assert_eq!(soundings[0].horizontal_variance, 0.0);
    }
}
