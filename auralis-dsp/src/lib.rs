//! Stateless DSP primitives and 25-D fingerprint extraction for Auralis.
//!
//! No I/O, no async, no caching or scheduling — those concerns live in
//! `auralis-core`. Every public function here is a pure transform over
//! `f64` sample buffers.

pub mod biquad;
pub mod buffer;
pub mod dynamics;
pub mod envelope;
pub mod eq;
pub mod error;
pub mod fingerprint;
pub mod frequency_analysis;
pub mod limiter;
pub mod primitives;
pub mod spectral_features;
pub mod stereo;
pub mod variation_analysis;
pub mod windowing;

pub use buffer::AudioBuffer;
pub use error::{Error, Result};
pub use fingerprint::{AnalysisStrategy, AudioFingerprint};
