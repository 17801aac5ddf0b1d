use thiserror::Error;

/// Errors surfaced by the DSP primitives and the fingerprint extractor.
///
/// These map to the `InvalidInput` / `UnsupportedChannels` branches of the
/// error taxonomy; everything else (degraded sub-features) is recovered
/// locally and never reaches this type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannels(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
