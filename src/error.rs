//! Error types for locking and blending
//!
//! Everything here is recoverable: a failed blend aborts that one click and
//! the session keeps running. Window/SDL failures stay `String` errors in the
//! glue code.

use std::fmt::{self, Display};

use crate::bitmap::BitmapDescriptor;

/// A lock on a bitmap's pixel memory could not be granted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionFailure {
    /// The bitmap is already locked by someone else
    AlreadyLocked { name: String },
    /// The resource has no usable pixel memory (empty, zero-sized, ...)
    Invalid { name: String, reason: String },
}

impl Display for AcquisitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyLocked { name } => write!(f, "cannot lock {name}: already locked"),
            Self::Invalid { name, reason } => write!(f, "cannot lock {name}: {reason}"),
        }
    }
}

impl std::error::Error for AcquisitionFailure {}

#[derive(Debug, Clone, PartialEq)]
pub enum BlendError {
    /// One of the two locks could not be obtained
    Acquisition(AcquisitionFailure),
    /// Source and destination sizes differ; detected before locking
    DimensionMismatch {
        source: BitmapDescriptor,
        destination: BitmapDescriptor,
    },
    /// A lock succeeded but handed back no pixel memory
    BufferUnavailable { name: String },
    /// Pitch/length do not describe the claimed geometry
    InvalidLayout(String),
    /// Mixing ratio must be finite and positive
    InvalidRatio(f64),
}

impl Display for BlendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquisition(e) => write!(f, "lock failed: {e}"),
            Self::DimensionMismatch {
                source,
                destination,
            } => write!(
                f,
                "bitmaps have different resolutions: {} is {}x{}, {} is {}x{}",
                source.name,
                source.width,
                source.height,
                destination.name,
                destination.width,
                destination.height
            ),
            Self::BufferUnavailable { name } => write!(f, "no pixel memory behind lock on {name}"),
            Self::InvalidLayout(msg) => write!(f, "invalid pixel layout: {msg}"),
            Self::InvalidRatio(r) => write!(f, "invalid mixing ratio {r}: must be finite and > 0"),
        }
    }
}

impl std::error::Error for BlendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Acquisition(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AcquisitionFailure> for BlendError {
    fn from(e: AcquisitionFailure) -> Self {
        Self::Acquisition(e)
    }
}
