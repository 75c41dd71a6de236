use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while generating a test vector
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A code reached the serializer outside the range the quantizer guarantees.
    /// Never recoverable: it means the clamp step was bypassed.
    #[error("Code {code} does not fit in {bit_width} bits")]
    EncodingRange { code: i64, bit_width: u32 },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl VectorError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        VectorError::InvalidParameter(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VectorError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, VectorError>;
