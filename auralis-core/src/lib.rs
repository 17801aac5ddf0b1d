//! Orchestration layer for Auralis: caching, content analysis, the
//! continuous processing space, the DSP pipeline, chunked streaming, and
//! the background extraction worker pool. Built entirely on top of
//! `auralis-dsp`'s stateless primitives.
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod pipeline;
pub mod space;
pub mod streaming;
pub mod worker;

pub use cache::{cache_key, CacheStats, FingerprintCache};
pub use config::UnifiedConfig;
pub use content::{
    analyze_batch, analyze_content, analyze_content_quick, classify_genre, detect_recording_type, AdaptiveParameters,
    ContentProfile, EnergyLevel, Genre, GenreClassification, MasteringPhilosophy, RecordingType, StereoStrategy,
};
pub use error::{Error, Result};
pub use pipeline::{adaptive_blend_weight, blend_adaptive_dynamics, blend_adaptive_eq, process as process_buffer};
pub use space::{generate as generate_parameters, PreferenceVector, ProcessingCoordinates, ProcessingParameters};
pub use streaming::{AnalysisCache, TrackAnalysis};
pub use worker::{Extractor, ExtractionJob, InMemoryQueue, Repository, TrackStatus, WorkerPool};

pub use auralis_dsp::{AnalysisStrategy, AudioBuffer, AudioFingerprint};
