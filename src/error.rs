//! Error types for device lookup and uncertainty estimation.

use thiserror::Error;

/// Errors raised while selecting devices or attributing uncertainty.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrModError {
    /// No catalog entry carries this tag.
    #[error("unknown device tag {0}")]
    UnknownDevice(u32),

    /// No catalog entry carries this name.
    #[error("unknown device name '{0}'")]
    UnknownDeviceName(String),

    /// Strategy selector not recognised.
    #[error("unknown error model method '{0}'")]
    UnknownMethod(String),

    /// IHO survey order outside 1..=4.
    #[error("unknown IHO survey order {0}")]
    UnknownOrder(u32),

    /// Beam index beyond the device's beam count.
    #[error("beam {beam} out of range for {device} ({max_beams} beams)")]
    BeamOutOfRange {
        /// Offending beam index.
        beam: u32,
        /// Device name.
        device: &'static str,
        /// Beams the device forms.
        max_beams: u32,
    },

    /// Vertical variance evaluated to NaN or infinity.
    #[error("non-finite vertical variance for beam {beam}")]
    NonFiniteVertical {
        /// Beam being processed when the failure occurred.
        beam: u32,
    },

    /// Horizontal variance evaluated to NaN or infinity under a strict policy.
    #[error("non-finite horizontal variance for beam {beam}")]
    NonFiniteHorizontal {
        /// Beam being processed when the failure occurred.
        beam: u32,
    },

    /// Operation not meaningful for the bound device.
    #[error("device {device} does not support {operation}")]
    Unsupported {
        /// Device name.
        device: &'static str,
        /// What was attempted.
        operation: &'static str,
    },
}

/// Result alias for estimation operations.
pub type Result<T> = std::result::Result<T, ErrModError>;
