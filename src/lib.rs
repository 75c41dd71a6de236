//! Deterministic I/Q test-vector generation for HDL memory initialization.
//!
//! Pipeline: [`waveform`] synthesizes tones, [`quantizer`] maps them to
//! signed fixed-point codes, [`serializer`] renders the codes as
//! two's-complement text and [`output`] writes the file atomically.

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod quantizer;
pub mod serializer;
pub mod spectrum;
pub mod waveform;

pub use error::{Result, VectorError};
