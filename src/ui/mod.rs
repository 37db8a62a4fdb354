//! Terminal user interface components.
//!
//! - `view`: ratatui widget presenting the spectrogram raster
//! - `terminal`: full-screen spectrogram interface with status footer and key handling
//! - `error`: full-screen error display

pub mod error;
pub mod terminal;
pub mod view;

pub use error::ErrorScreen;
pub use terminal::{SpectrogramCommand, SpectrogramTui, StatusLine};
