//! Crate-level error types.

use std::fmt;

use crate::fetch::FetchError;
use crate::gpu::render_context::RenderContextError;
use crate::structure::ParseError;

/// Errors produced by the molstage crate.
#[derive(Debug)]
pub enum StageError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// Connection-table text could not be turned into a molecule.
    Parse(ParseError),
    /// The structure file could not be fetched.
    Fetch(FetchError),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Parse(e) => write!(f, "structure parse error: {e}"),
            Self::Fetch(e) => write!(f, "structure fetch error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Fetch(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::OptionsParse(_) | Self::Viewer(_) => None,
        }
    }
}

impl From<RenderContextError> for StageError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<ParseError> for StageError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<FetchError> for StageError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl From<std::io::Error> for StageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
