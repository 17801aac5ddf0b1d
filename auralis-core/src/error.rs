use thiserror::Error;

/// Errors surfaced across the orchestration layer: caching, content
/// analysis, the processing pipeline, streaming, and the worker pool.
///
/// `AnalysisDegraded` is deliberately absent here — a degraded analysis is
/// recovered locally and logged, never propagated as an error. `CacheIo`
/// likewise never aborts a caller; it is returned from cache internals so
/// callers can downgrade to a cache-miss and keep going.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Dsp(#[from] auralis_dsp::Error),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("cache I/O error: {0}")]
    CacheIo(String),

    #[error("worker failure on track {track_id}: {message}")]
    WorkerFailure { track_id: String, message: String },

    #[error("shutdown timed out after {0:?}")]
    ShutdownTimeout(std::time::Duration),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::CacheIo(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
