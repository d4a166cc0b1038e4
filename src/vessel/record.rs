//! Binary vessel record used by the native dump format
//!
//! Layout (all little-endian):
//!
//! ```text
//! [magic "MBVR" (4)] [version (2)] [timestamp u32 (4)] [device u32 (4)]
//! [28 x f32 (112)] [crc16 (2)]
//! ```
//!
//! The float block follows the field order of [`VesselConfig`]. The CRC covers
//! every byte before it.

use thiserror::Error;

use super::{LeverArm, VesselConfig};

pub const RECORD_MAGIC: [u8; 4] = *b"MBVR";
pub const RECORD_VERSION: u16 = 1;

const FLOAT_FIELDS: usize = 28;
const HEADER_SIZE: usize = 4 + 2;
/// Size of an encoded record in bytes
pub const RECORD_SIZE: usize = HEADER_SIZE + 4 + 4 + FLOAT_FIELDS * 4 + 2;

/// Errors raised while decoding a vessel record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("bad record magic {found:?}")]
    BadMagic { found: [u8; 4] },
    #[error("unsupported vessel record version {0}")]
    UnsupportedVersion(u16),
    #[error("insufficient data: need {required} bytes, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[error("checksum mismatch: expected 0x{expected:04X}, computed 0x{actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },
}

/// CRC-16 (Modbus polynomial) over `data`
pub fn calculate_checksum(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;

    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

fn float_fields(vessel: &VesselConfig) -> [f32; FLOAT_FIELDS] {
    [
        vessel.gps_offset.x,
        vessel.gps_offset.y,
        vessel.gps_offset.z,
        vessel.gps_offset_sd,
        vessel.imu_offset.x,
        vessel.imu_offset.y,
        vessel.imu_offset.z,
        vessel.imu_offset_sd,
        vessel.static_roll,
        vessel.static_roll_sd,
        vessel.roll_sd,
        vessel.pitch_sd,
        vessel.pitch_stab_sd,
        vessel.gyro_sd,
        vessel.svp_sd,
        vessel.surface_ss_sd,
        vessel.heave_fixed,
        vessel.heave_pct,
        vessel.gps_latency_sd,
        vessel.attitude_latency_sd,
        vessel.gps_drms,
        vessel.draft,
        vessel.draft_sd,
        vessel.dyn_draft_sd,
        vessel.loading_sd,
        vessel.sog_sd,
        vessel.tide_measured_sd,
        vessel.tide_predicted_sd,
    ]
}

fn from_float_fields(timestamp: u32, device: u32, f: [f32; FLOAT_FIELDS]) -> VesselConfig {
    VesselConfig {
        timestamp,
        device,
        gps_offset: LeverArm::new(f[0], f[1], f[2]),
        gps_offset_sd: f[3],
        imu_offset: LeverArm::new(f[4], f[5], f[6]),
        imu_offset_sd: f[7],
        static_roll: f[8],
        static_roll_sd: f[9],
        roll_sd: f[10],
        pitch_sd: f[11],
        pitch_stab_sd: f[12],
        gyro_sd: f[13],
        svp_sd: f[14],
        surface_ss_sd: f[15],
        heave_fixed: f[16],
        heave_pct: f[17],
        gps_latency_sd: f[18],
        attitude_latency_sd: f[19],
        gps_drms: f[20],
        draft: f[21],
        draft_sd: f[22],
        dyn_draft_sd: f[23],
        loading_sd: f[24],
        sog_sd: f[25],
        tide_measured_sd: f[26],
        tide_predicted_sd: f[27],
    }
}

/// Serialize a vessel into a versioned, checksummed record
pub fn encode_vessel(vessel: &VesselConfig) -> Vec<u8> {
    let mut data = Vec::with_capacity(RECORD_SIZE);
    data.extend_from_slice(&RECORD_MAGIC);
    data.extend_from_slice(&RECORD_VERSION.to_le_bytes());
    data.extend_from_slice(&vessel.timestamp.to_le_bytes());
    data.extend_from_slice(&vessel.device.to_le_bytes());
    for value in float_fields(vessel) {
        data.extend_from_slice(&value.to_le_bytes());
    }
    let checksum = calculate_checksum(&data);
    data.extend_from_slice(&checksum.to_le_bytes());
    data
}

fn word(data: &[u8], offset: usize) -> [u8; 4] {
    [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]
}

/// Decode a record produced by [`encode_vessel`]; trailing bytes are ignored
pub fn decode_vessel(data: &[u8]) -> Result<VesselConfig, RecordError> {
    if data.len() < HEADER_SIZE {
        return Err(RecordError::InsufficientData {
            required: HEADER_SIZE,
            available: data.len(),
        });
    }

    let magic = word(data, 0);
    if magic != RECORD_MAGIC {
        return Err(RecordError::BadMagic { found: magic });
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != RECORD_VERSION {
        return Err(RecordError::UnsupportedVersion(version));
    }

    if data.len() < RECORD_SIZE {
        return Err(RecordError::InsufficientData {
            required: RECORD_SIZE,
            available: data.len(),
        });
    }

    let body_end = RECORD_SIZE - 2;
    let expected = u16::from_le_bytes([data[body_end], data[body_end + 1]]);
    let actual = calculate_checksum(&data[..body_end]);
    if expected != actual {
        return Err(RecordError::ChecksumMismatch { expected, actual });
    }

    let mut offset = HEADER_SIZE;
    let timestamp = u32::from_le_bytes(word(data, offset));
    offset += 4;
    let device = u32::from_le_bytes(word(data, offset));
    offset += 4;

    let mut fields = [0.0f32; FLOAT_FIELDS];
    for field in fields.iter_mut() {
        *field = f32::from_le_bytes(word(data, offset));
        offset += 4;
    }

    Ok(from_float_fields(timestamp, device, fields))
}
