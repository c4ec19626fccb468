use thiserror::Error;

/// Errors raised by the registration and error-estimation core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FredError {
    /// A value or array shape is outside what the operation accepts.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// An input is not a real-valued array, or a sampling function returned
    /// something other than one value per axis.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// The requested configuration is not modelled.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// `register` was called before a target and FLE statistics were set.
    #[error("point based registration has not been initialised with a target")]
    Uninitialised,

    /// Numerically degenerate geometry (collinear fiducials, zero-length axis).
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    /// The orthogonal Procrustes solve failed.
    #[error("procrustes registration failed: {0}")]
    Procrustes(String),
}

pub type Result<T> = std::result::Result<T, FredError>;
