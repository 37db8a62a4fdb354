//! Scrolling spectrogram engine.
//!
//! Turns a stream of per-bin magnitude frames into a left-scrolling raster:
//! each frame is colored and appended as one new column at the right edge.
//! The engine does no spectral analysis itself and draws no text; frames come
//! from an [`AnalysisSource`] and labels are drawn by the presenter from the
//! [`FrequencyAxis`] geometry.

pub mod axis;
pub mod color;
pub mod controller;
pub mod engine;
pub mod error;
pub mod frame;
pub mod raster;
pub mod sensitivity;

pub use axis::{FrequencyAxis, GridLine, DEFAULT_MARGIN};
pub use color::{map_intensity, ColorScheme, Rgb};
pub use controller::{EngineController, EngineState, EngineStatus};
pub use engine::{EngineSettings, TickOutcome};
pub use error::{Diagnostic, DiagnosticCategory, EngineError};
pub use frame::{AnalysisSource, MagnitudeFrame, SourceError, SourceInfo};
pub use raster::{PixelRaster, RasterSurface, SurfaceSize};
pub use sensitivity::{Sensitivity, SENSITIVITY_STEP};
