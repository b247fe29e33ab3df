use std::path::PathBuf;

use anchor_simplex::SimplexError;
use thiserror::Error;

pub type Result<T, E = FitError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("degenerate box at record {index}: width={width}, height={height}")]
    DegenerateBox { index: usize, width: f64, height: f64 },

    #[error("failed to read box dump {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("box dump {path} is malformed: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error(transparent)]
    Search(#[from] SimplexError),
}

impl FitError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        FitError::InvalidInput(msg.into())
    }
}
