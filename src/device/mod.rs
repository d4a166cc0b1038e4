//! Compiled-in catalog of multibeam sonar devices
//!
//! Each entry describes the geometry and timing of one sonar model together
//! with the noise models used to attribute angular and range uncertainty to
//! its soundings. Entries are looked up by integer tag (as stored in native
//! dump files) or by short mnemonic such as `"em120"`.

pub mod geometry;
pub mod noise;

pub use geometry::{beam_to_angle, beam_to_angle_with_count};
pub use noise::{angle_error_variance, range_error_variance};

use crate::core::SPEED_OF_SOUND_WATER;
use crate::error::{ErrModError, Result};

/// How beam numbers map onto pointing angles
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeamGeometry {
    /// Beams spaced evenly in angle across the swath
    EquiAngular,
    /// FFT-beamformed flat array; angle follows the phased-array steering law
    Phased,
    /// Two heads rolled outward, each a linear fan anchored at `outer_angle`
    DualHead { outer_angle: f64, spacing: f64 },
    /// Two fixed flat plates whose innermost beams sit `inner_angle` off nadir
    SplitHead { inner_angle: f64, spacing: f64 },
    /// No geometry known; angles cannot be resolved
    Unsupported,
}

/// Angular pointing error model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AngleErrorModel {
    /// Beamwidth independent of pointing angle
    Uniform,
    /// Effective aperture narrows off nadir: beamwidth grows as 1/cos(angle)
    FlatPlate,
    None,
}

/// Range measurement error model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeErrorModel {
    /// Standard deviation proportional to depth, with a floor (meters)
    DepthProportional { fraction: f64, floor: f64 },
    /// Sample spacing and pulse length dominate
    RangeCell,
    None,
}

/// Capability flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Beams are electronically steered, so pointing depends on sound speed
    pub steered: bool,
    /// Bottom detection may use phase
    pub phase_detect: bool,
    /// Sidescan/snippet imagery available
    pub imagery: bool,
    /// Two transducer heads sharing one beam numbering
    pub dual_head: bool,
}

/// Integer tags as written to native dump files
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceTag {
    Unknown = 0,
    Sb8101 = 1,
    Sb8111 = 2,
    Sb8125 = 3,
    Sb8150 = 4,
    Sb1180 = 5,
    Em1000 = 6,
    Em1002 = 7,
    Em12 = 8,
    Em120 = 9,
    Em300 = 10,
    Em3000 = 11,
    Em3000D = 12,
    Em2000 = 13,
}

impl DeviceTag {
    /// Serialized form used by the native dump format
    pub fn to_bytes(self) -> [u8; 4] {
        (self as u32).to_le_bytes()
    }

    /// Decode a serialized tag
    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        Self::try_from(u32::from_le_bytes(bytes))
    }
}

impl TryFrom<u32> for DeviceTag {
    type Error = ErrModError;

    fn try_from(value: u32) -> Result<Self> {
        CATALOG
            .iter()
            .map(|spec| spec.tag)
            .find(|tag| *tag as u32 == value)
            .ok_or(ErrModError::UnknownDevice(value))
    }
}

/// Static description of one sonar model
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    pub tag: DeviceTag,
    pub name: &'static str,
    pub geometry: BeamGeometry,
    pub max_beams: u32,
    /// Primary and secondary operating frequencies (Hz)
    pub frequencies: [f64; 2],
    /// Maximum swath half-angle (degrees)
    pub max_angle: f64,
    /// Across-track receive beamwidth (degrees)
    pub across_beamwidth: f64,
    /// Along-track transmit beamwidth (degrees)
    pub along_beamwidth: f64,
    pub ping_rate: f64,
    pub bathy_rate: f64,
    pub attitude_rate: f64,
    pub imagery_rate: f64,
    /// Off-nadir angle beyond which beams are steered (degrees, 0 = all beams)
    pub steer_angle: f64,
    /// Amplitude envelope sampling frequency (Hz)
    pub sample_frequency: f64,
    /// Range-sample spacing (meters)
    pub range_spacing: f64,
    /// Shortest transmit pulse (seconds)
    pub min_pulse_length: f64,
    pub capabilities: Capabilities,
    pub angle_model: AngleErrorModel,
    pub range_model: RangeErrorModel,
}

impl DeviceSpec {
    /// Acoustic wavelength at the primary frequency (meters)
    pub fn wavelength(&self, sound_speed: f64) -> f64 {
        sound_speed / self.frequencies[0]
    }

    /// Nominal wavelength used to design the array
    pub fn nominal_wavelength(&self) -> f64 {
        self.wavelength(SPEED_OF_SOUND_WATER)
    }

    pub fn is_steered(&self) -> bool {
        self.capabilities.steered
    }

    /// True when every beam is steered (flat transducer plate)
    pub fn is_flat_plate(&self) -> bool {
        self.capabilities.steered && self.steer_angle == 0.0
    }

    /// First starboard-head beam for dual and split head systems
    pub fn head_boundary(&self) -> Option<u32> {
        match self.geometry {
            BeamGeometry::DualHead { .. } | BeamGeometry::SplitHead { .. } => Some(self.max_beams / 2),
            _ => None,
        }
    }

    /// Beams formed by a ping that reports `requested` beams. Counts the
    /// device cannot form fall back to the full complement.
    pub fn beams_formed(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(n) if (2..=self.max_beams).contains(&n) => n,
            _ => self.max_beams,
        }
    }

    /// Reject beam numbers the device cannot form
    pub fn check_beam(&self, beam: u32) -> Result<()> {
        self.check_beam_formed(beam, self.max_beams)
    }

    /// Reject beam numbers outside a ping of `beams_formed` beams
    pub fn check_beam_formed(&self, beam: u32, beams_formed: u32) -> Result<()> {
        if beam >= beams_formed {
            return Err(ErrModError::BeamOutOfRange {
                beam,
                device: self.name,
                max_beams: beams_formed,
            });
        }
        Ok(())
    }
}

const NONE: Capabilities = Capabilities {
    steered: false,
    phase_detect: false,
    imagery: false,
    dual_head: false,
};

const FLAT_ARRAY: Capabilities = Capabilities {
    steered: true,
    phase_detect: true,
    imagery: true,
    dual_head: false,
};

/// Every device this crate knows how to attribute
pub static CATALOG: [DeviceSpec; 14] = [
    DeviceSpec {
        tag: DeviceTag::Unknown,
        name: "unknown",
        geometry: BeamGeometry::Unsupported,
        max_beams: 512,
        frequencies: [0.0, 0.0],
        max_angle: 90.0,
        across_beamwidth: 1.0,
        along_beamwidth: 1.0,
        ping_rate: 0.0,
        bathy_rate: 0.0,
        attitude_rate: 0.0,
        imagery_rate: 0.0,
        steer_angle: 0.0,
        sample_frequency: 0.0,
        range_spacing: 0.0,
        min_pulse_length: 0.0,
        capabilities: NONE,
        angle_model: AngleErrorModel::None,
        range_model: RangeErrorModel::None,
    },
    DeviceSpec {
        tag: DeviceTag::Sb8101,
        name: "sb8101",
        geometry: BeamGeometry::EquiAngular,
        max_beams: 101,
        frequencies: [240.0e3, 240.0e3],
        max_angle: 75.0,
        across_beamwidth: 1.5,
        along_beamwidth: 1.5,
        ping_rate: 30.0,
        bathy_rate: 30.0,
        attitude_rate: 100.0,
        imagery_rate: 0.0,
        steer_angle: 0.0,
        sample_frequency: 14.4e3,
        range_spacing: 0.052,
        min_pulse_length: 21.0e-6,
        capabilities: Capabilities { phase_detect: true, ..NONE },
        angle_model: AngleErrorModel::Uniform,
        range_model: RangeErrorModel::RangeCell,
    },
    DeviceSpec {
        tag: DeviceTag::Sb8111,
        name: "sb8111",
        geometry: BeamGeometry::EquiAngular,
        max_beams: 101,
        frequencies: [100.0e3, 100.0e3],
        max_angle: 75.0,
        across_beamwidth: 1.5,
        along_beamwidth: 1.5,
        ping_rate: 35.0,
        bathy_rate: 35.0,
        attitude_rate: 100.0,
        imagery_rate: 0.0,
        steer_angle: 0.0,
        sample_frequency: 5.0e3,
        range_spacing: 0.15,
        min_pulse_length: 100.0e-6,
        capabilities: Capabilities { phase_detect: true, ..NONE },
        angle_model: AngleErrorModel::Uniform,
        range_model: RangeErrorModel::RangeCell,
    },
    DeviceSpec {
        tag: DeviceTag::Sb8125,
        name: "sb8125",
        geometry: BeamGeometry::Phased,
        max_beams: 240,
        frequencies: [455.0e3, 455.0e3],
        max_angle: 60.0,
        across_beamwidth: 0.5,
        along_beamwidth: 1.0,
        ping_rate: 40.0,
        bathy_rate: 40.0,
        attitude_rate: 100.0,
        imagery_rate: 40.0,
        steer_angle: 0.0,
        sample_frequency: 34.1e3,
        range_spacing: 0.022,
        min_pulse_length: 30.0e-6,
        capabilities: FLAT_ARRAY,
        angle_model: AngleErrorModel::FlatPlate,
        range_model: RangeErrorModel::RangeCell,
    },
    DeviceSpec {
        tag: DeviceTag::Sb8150,
        name: "sb8150",
        geometry: BeamGeometry::EquiAngular,
        max_beams: 234,
        frequencies: [12.0e3, 24.0e3],
        max_angle: 75.0,
        across_beamwidth: 2.0,
        along_beamwidth: 2.0,
        ping_rate: 0.5,
        bathy_rate: 0.5,
        attitude_rate: 50.0,
        imagery_rate: 0.0,
        steer_angle: 0.0,
        sample_frequency: 3.0e3,
        range_spacing: 0.25,
        min_pulse_length: 1.0e-3,
        capabilities: NONE,
        angle_model: AngleErrorModel::Uniform,
        range_model: RangeErrorModel::DepthProportional { fraction: 0.003, floor: 0.5 },
    },
    DeviceSpec {
        tag: DeviceTag::Sb1180,
        name: "sb1180",
        geometry: BeamGeometry::SplitHead { inner_angle: 2.1, spacing: 1.2 },
        max_beams: 126,
        frequencies: [180.0e3, 180.0e3],
        max_angle: 76.5,
        across_beamwidth: 1.5,
        along_beamwidth: 1.5,
        ping_rate: 10.0,
        bathy_rate: 10.0,
        attitude_rate: 100.0,
        imagery_rate: 10.0,
        steer_angle: 0.0,
        sample_frequency: 18.0e3,
        range_spacing: 0.042,
        min_pulse_length: 150.0e-6,
        capabilities: Capabilities { dual_head: true, ..FLAT_ARRAY },
        angle_model: AngleErrorModel::FlatPlate,
        range_model: RangeErrorModel::RangeCell,
    },
    DeviceSpec {
        tag: DeviceTag::Em1000,
        name: "em1000",
        geometry: BeamGeometry::EquiAngular,
        max_beams: 60,
        frequencies: [95.0e3, 95.0e3],
        max_angle: 75.0,
        across_beamwidth: 3.3,
        along_beamwidth: 3.3,
        ping_rate: 10.0,
        bathy_rate: 10.0,
        attitude_rate: 50.0,
        imagery_rate: 10.0,
        steer_angle: 0.0,
        sample_frequency: 7.5e3,
        range_spacing: 0.1,
        min_pulse_length: 0.2e-3,
        capabilities: Capabilities { phase_detect: true, imagery: true, ..NONE },
        angle_model: AngleErrorModel::Uniform,
        range_model: RangeErrorModel::RangeCell,
    },
    DeviceSpec {
        tag: DeviceTag::Em1002,
        name: "em1002",
        geometry: BeamGeometry::EquiAngular,
        max_beams: 111,
        frequencies: [95.0e3, 98.0e3],
        max_angle: 75.0,
        across_beamwidth: 2.0,
        along_beamwidth: 2.0,
        ping_rate: 10.0,
        bathy_rate: 10.0,
        attitude_rate: 50.0,
        imagery_rate: 10.0,
        steer_angle: 0.0,
        sample_frequency: 7.5e3,
        range_spacing: 0.1,
        min_pulse_length: 0.2e-3,
        capabilities: FLAT_ARRAY,
        angle_model: AngleErrorModel::FlatPlate,
        range_model: RangeErrorModel::RangeCell,
    },
    DeviceSpec {
        tag: DeviceTag::Em12,
        name: "em12",
        geometry: BeamGeometry::EquiAngular,
        max_beams: 81,
        frequencies: [13.0e3, 13.0e3],
        max_angle: 75.0,
        across_beamwidth: 1.8,
        along_beamwidth: 1.8,
        ping_rate: 0.1,
        bathy_rate: 0.1,
        attitude_rate: 20.0,
        imagery_rate: 0.1,
        steer_angle: 0.0,
        sample_frequency: 1.0e3,
        range_spacing: 0.75,
        min_pulse_length: 2.0e-3,
        capabilities: Capabilities { imagery: true, ..NONE },
        angle_model: AngleErrorModel::Uniform,
        range_model: RangeErrorModel::DepthProportional { fraction: 0.0025, floor: 0.5 },
    },
    DeviceSpec {
        tag: DeviceTag::Em120,
        name: "em120",
        geometry: BeamGeometry::EquiAngular,
        max_beams: 191,
        frequencies: [11.5e3, 12.5e3],
        max_angle: 75.0,
        across_beamwidth: 1.0,
        along_beamwidth: 2.0,
        ping_rate: 0.2,
        bathy_rate: 0.2,
        attitude_rate: 100.0,
        imagery_rate: 0.2,
        steer_angle: 0.0,
        sample_frequency: 2.0e3,
        range_spacing: 0.375,
        min_pulse_length: 2.0e-3,
        capabilities: FLAT_ARRAY,
        angle_model: AngleErrorModel::FlatPlate,
        range_model: RangeErrorModel::DepthProportional { fraction: 0.002, floor: 0.3 },
    },
    DeviceSpec {
        tag: DeviceTag::Em300,
        name: "em300",
        geometry: BeamGeometry::EquiAngular,
        max_beams: 135,
        frequencies: [30.0e3, 30.0e3],
        max_angle: 75.0,
        across_beamwidth: 1.0,
        along_beamwidth: 2.0,
        ping_rate: 2.0,
        bathy_rate: 2.0,
        attitude_rate: 100.0,
        imagery_rate: 2.0,
        steer_angle: 0.0,
        sample_frequency: 4.5e3,
        range_spacing: 0.167,
        min_pulse_length: 0.7e-3,
        capabilities: FLAT_ARRAY,
        angle_model: AngleErrorModel::FlatPlate,
        range_model: RangeErrorModel::DepthProportional { fraction: 0.002, floor: 0.2 },
    },
    DeviceSpec {
        tag: DeviceTag::Em3000,
        name: "em3000",
        geometry: BeamGeometry::Phased,
        max_beams: 128,
        frequencies: [300.0e3, 300.0e3],
        max_angle: 65.0,
        across_beamwidth: 1.5,
        along_beamwidth: 1.5,
        ping_rate: 25.0,
        bathy_rate: 25.0,
        attitude_rate: 100.0,
        imagery_rate: 25.0,
        steer_angle: 0.0,
        sample_frequency: 14.293e3,
        range_spacing: 0.0525,
        min_pulse_length: 150.0e-6,
        capabilities: FLAT_ARRAY,
        angle_model: AngleErrorModel::FlatPlate,
        range_model: RangeErrorModel::RangeCell,
    },
    DeviceSpec {
        tag: DeviceTag::Em3000D,
        name: "em3000d",
        geometry: BeamGeometry::DualHead { outer_angle: 75.0, spacing: 0.9 },
        max_beams: 254,
        frequencies: [293.0e3, 307.0e3],
        max_angle: 75.0,
        across_beamwidth: 1.5,
        along_beamwidth: 1.5,
        ping_rate: 25.0,
        bathy_rate: 25.0,
        attitude_rate: 100.0,
        imagery_rate: 25.0,
        steer_angle: 0.0,
        sample_frequency: 14.293e3,
        range_spacing: 0.0525,
        min_pulse_length: 150.0e-6,
        capabilities: Capabilities { dual_head: true, ..FLAT_ARRAY },
        angle_model: AngleErrorModel::FlatPlate,
        range_model: RangeErrorModel::RangeCell,
    },
    DeviceSpec {
        tag: DeviceTag::Em2000,
        name: "em2000",
        geometry: BeamGeometry::EquiAngular,
        max_beams: 111,
        frequencies: [200.0e3, 200.0e3],
        max_angle: 60.0,
        across_beamwidth: 1.5,
        along_beamwidth: 2.5,
        ping_rate: 10.0,
        bathy_rate: 10.0,
        attitude_rate: 100.0,
        imagery_rate: 10.0,
        steer_angle: 45.0,
        sample_frequency: 18.75e3,
        range_spacing: 0.04,
        min_pulse_length: 0.1e-3,
        capabilities: FLAT_ARRAY,
        angle_model: AngleErrorModel::Uniform,
        range_model: RangeErrorModel::RangeCell,
    },
];

/// All catalog entries
pub fn catalog() -> &'static [DeviceSpec] {
    &CATALOG
}

/// Find a device by its serialized tag
pub fn lookup_by_tag(tag: u32) -> Result<&'static DeviceSpec> {
    CATALOG
        .iter()
        .find(|spec| spec.tag as u32 == tag)
        .ok_or(ErrModError::UnknownDevice(tag))
}

/// Find a device by exact, case-sensitive mnemonic
pub fn lookup_by_name(name: &str) -> Result<&'static DeviceSpec> {
    CATALOG
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| ErrModError::UnknownDeviceName(name.to_string()))
}

impl DeviceTag {
    pub fn spec(self) -> &'static DeviceSpec {
        // Every tag has a catalog row; the table is indexed by discriminant.
        &CATALOG[self as usize]
    }
}
