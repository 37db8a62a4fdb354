//! Magnitude frames and the upstream source contract.

use thiserror::Error;

/// One tick's worth of per-bin energy, low frequency first, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MagnitudeFrame(Vec<f32>);

impl MagnitudeFrame {
    pub fn new(bins: Vec<f32>) -> Self {
        Self(bins)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bins(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for MagnitudeFrame {
    fn from(bins: Vec<f32>) -> Self {
        Self(bins)
    }
}

/// What a source reports once connected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    /// Number of bins in every frame this source produces.
    pub bin_count: usize,
    /// Frequency of the last bin edge, when known.
    pub nyquist_hz: Option<f32>,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SourceError(pub String);

impl From<anyhow::Error> for SourceError {
    fn from(err: anyhow::Error) -> Self {
        SourceError(format!("{err:#}"))
    }
}

/// Upstream producer of magnitude frames.
///
/// `poll_frame` must never block: it returns `None` when no new frame is ready.
pub trait AnalysisSource {
    fn connect(&mut self) -> Result<SourceInfo, SourceError>;

    fn poll_frame(&mut self) -> Option<MagnitudeFrame>;

    /// The engine started ticking.
    fn resume(&mut self) {}

    /// The engine stopped ticking.
    fn pause(&mut self) {}

    /// True once a finite source has nothing more to deliver.
    fn is_exhausted(&self) -> bool {
        false
    }
}

impl<T: AnalysisSource + ?Sized> AnalysisSource for Box<T> {
    fn connect(&mut self) -> Result<SourceInfo, SourceError> {
        (**self).connect()
    }

    fn poll_frame(&mut self) -> Option<MagnitudeFrame> {
        (**self).poll_frame()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}
