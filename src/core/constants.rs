//! Physical constants and system parameters

/// Speed of sound in water under standard conditions (m/s)
pub const SPEED_OF_SOUND_WATER: f64 = 1500.0;

/// Sentinel returned by `beam_to_angle` for beams it cannot resolve
pub const INVALID_ANGLE: f64 = -1.0;

/// Variance reported by device noise models that have no formula for a device.
/// Large enough that any weighting scheme ignores the sounding.
pub const UNUSABLE_VARIANCE: f64 = 1.0e10;

/// Two-sided 95% scale factor for a normal distribution
pub const CI95_SCALE: f64 = 1.96;
