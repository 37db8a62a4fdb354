//! Error types for the spectrogram engine.

use thiserror::Error;

/// Failures that the engine reports to its controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The drawable surface could not be created or sized.
    #[error("drawable surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// The upstream analysis source could not be connected.
    #[error("audio source unavailable: {0}")]
    AudioSourceUnavailable(String),

    /// A pulled frame did not have the configured number of bins.
    #[error("malformed frame: expected {expected} bins, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },
}

/// Reasons a raster refuses a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RasterError {
    #[error("raster has not been allocated")]
    Unallocated,

    #[error("column has {actual} pixels but the raster is {expected} tall")]
    ColumnLength { expected: usize, actual: usize },
}

/// Coarse failure category shown to the user alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCategory {
    /// Surface or rendering context could not be set up
    Surface,
    /// Audio analysis source could not be connected
    AudioSource,
    /// A tick failed unexpectedly
    Tick,
}

impl std::fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Surface => write!(f, "Canvas Error"),
            Self::AudioSource => write!(f, "Audio Error"),
            Self::Tick => write!(f, "Render Error"),
        }
    }
}

/// Category plus human-readable cause for a `Failed` engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub message: String,
}

impl Diagnostic {
    pub fn new(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl From<&EngineError> for Diagnostic {
    fn from(err: &EngineError) -> Self {
        let category = match err {
            EngineError::SurfaceUnavailable(_) => DiagnosticCategory::Surface,
            EngineError::AudioSourceUnavailable(_) => DiagnosticCategory::AudioSource,
            EngineError::MalformedFrame { .. } => DiagnosticCategory::Tick,
        };
        Diagnostic::new(category, err.to_string())
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}
