//! Lifecycle state machine around the visualization engine.
//!
//! The controller owns the surface, the upstream source and the engine. It is
//! the only place that arms or cancels the next tick: the host calls
//! [`EngineController::on_display_frame`] once per display refresh, and a
//! tick runs only if one is scheduled.

use std::panic::{self, AssertUnwindSafe};

use super::color::{ColorScheme, UnknownScheme};
use super::engine::{EngineSettings, TickOutcome, VisualizationEngine};
use super::error::{Diagnostic, DiagnosticCategory, EngineError};
use super::frame::{AnalysisSource, SourceInfo};
use super::raster::{RasterSurface, SurfaceSize};

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No surface yet
    Uninitialized,
    /// Surface ready, not ticking
    Idle,
    /// Ticking once per display frame
    Running,
    /// Stopped on an unrecoverable error until re-initialized
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Initializing"),
            Self::Idle => write!(f, "Ready"),
            Self::Running => write!(f, "Running"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Snapshot of the controller for status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub state: EngineState,
    pub diagnostic: Option<Diagnostic>,
}

/// Identifies the single outstanding scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TickToken(u64);

pub struct EngineController<S, A> {
    state: EngineState,
    diagnostic: Option<Diagnostic>,
    surface: S,
    source: A,
    source_info: Option<SourceInfo>,
    engine: VisualizationEngine,
    scheduled: Option<TickToken>,
    next_token: u64,
}

impl<S: RasterSurface, A: AnalysisSource> EngineController<S, A> {
    pub fn new(surface: S, source: A, settings: EngineSettings) -> Self {
        Self {
            state: EngineState::Uninitialized,
            diagnostic: None,
            surface,
            source,
            source_info: None,
            engine: VisualizationEngine::new(settings),
            scheduled: None,
            next_token: 0,
        }
    }

    /// Allocates the surface and draws the placeholder frame.
    ///
    /// Valid from `Uninitialized` and `Failed`; a no-op otherwise.
    ///
    /// # Errors
    /// - `SurfaceUnavailable` if the surface cannot be allocated (state becomes `Failed`)
    pub fn initialize(&mut self, viewport: SurfaceSize) -> Result<(), EngineError> {
        match self.state {
            EngineState::Idle | EngineState::Running => {
                tracing::debug!("Initialize ignored: engine is {:?}", self.state);
                return Ok(());
            }
            EngineState::Uninitialized | EngineState::Failed => {}
        }

        self.scheduled = None;
        let size = viewport.or_fallback();

        if let Err(err) = self.surface.allocate(size) {
            self.fail(Diagnostic::from(&err));
            return Err(err);
        }

        self.engine.draw_placeholder(&mut self.surface);
        self.diagnostic = None;
        self.transition(EngineState::Idle);
        Ok(())
    }

    /// Starts ticking. Connects the source on first use.
    ///
    /// Idempotent while running; ignored before initialization or after failure.
    ///
    /// # Errors
    /// - `AudioSourceUnavailable` if the source cannot be connected (state becomes `Failed`)
    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Running => {
                tracing::debug!("Start ignored: already running");
                return Ok(());
            }
            EngineState::Uninitialized | EngineState::Failed => {
                tracing::warn!("Start ignored: engine is {:?}", self.state);
                return Ok(());
            }
            EngineState::Idle => {}
        }

        if self.source_info.is_none() {
            let info = match self.source.connect() {
                Ok(info) if info.bin_count > 0 => info,
                Ok(_) => {
                    let err = EngineError::AudioSourceUnavailable(
                        "source reported zero frequency bins".to_string(),
                    );
                    self.fail(Diagnostic::from(&err));
                    return Err(err);
                }
                Err(e) => {
                    let err = EngineError::AudioSourceUnavailable(e.to_string());
                    self.fail(Diagnostic::from(&err));
                    return Err(err);
                }
            };
            self.engine.configure(info);
            self.source_info = Some(info);
        }

        self.source.resume();
        self.schedule();
        self.transition(EngineState::Running);
        Ok(())
    }

    /// Stops ticking. The pending tick is cancelled before this returns.
    pub fn stop(&mut self) {
        if self.state != EngineState::Running {
            tracing::debug!("Stop ignored: engine is {:?}", self.state);
            return;
        }
        self.scheduled = None;
        self.source.pause();
        self.transition(EngineState::Idle);
    }

    /// Display refresh callback. Runs the scheduled tick, if any, and
    /// schedules the next one.
    ///
    /// Any error or panic inside the tick moves the engine to `Failed`.
    pub fn on_display_frame(&mut self) -> Option<TickOutcome> {
        let token = self.scheduled.take()?;
        if self.state != EngineState::Running {
            return None;
        }
        tracing::trace!("Running tick {:?}", token);

        let engine = &mut self.engine;
        let surface = &mut self.surface;
        let source = &mut self.source;
        let result = panic::catch_unwind(AssertUnwindSafe(|| engine.tick(surface, source)));

        match result {
            Ok(Ok(outcome)) => {
                self.schedule();
                Some(outcome)
            }
            Ok(Err(err)) => {
                tracing::error!("Tick failed: {}", err);
                let mut diagnostic = Diagnostic::from(&err);
                diagnostic.category = DiagnosticCategory::Tick;
                self.fail(diagnostic);
                None
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("Tick panicked: {}", message);
                self.fail(Diagnostic::new(DiagnosticCategory::Tick, message));
                None
            }
        }
    }

    /// Selects a color scheme by name. Unknown names leave the scheme unchanged.
    pub fn set_color_scheme(&mut self, name: &str) -> Result<ColorScheme, UnknownScheme> {
        let scheme: ColorScheme = name.parse()?;
        self.engine.set_scheme(scheme);
        tracing::info!("Color scheme changed to: {}", scheme);
        Ok(scheme)
    }

    pub fn toggle_color_scheme(&mut self) -> ColorScheme {
        let scheme = self.engine.scheme().toggled();
        self.engine.set_scheme(scheme);
        tracing::info!("Color scheme changed to: {}", scheme);
        scheme
    }

    /// Adjusts sensitivity by `delta`, clamped to its bounds. Returns the new value.
    pub fn adjust_sensitivity(&mut self, delta: f32) -> f32 {
        let value = self.engine.adjust_sensitivity(delta);
        tracing::info!("Sensitivity changed to: {}", value);
        value
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state,
            diagnostic: self.diagnostic.clone(),
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.engine.stats().ticks
    }

    pub fn columns_appended(&self) -> u64 {
        self.engine.stats().columns_appended
    }

    pub fn frames_dropped(&self) -> u64 {
        self.engine.stats().frames_dropped
    }

    pub fn is_tick_scheduled(&self) -> bool {
        self.scheduled.is_some()
    }

    pub fn engine(&self) -> &VisualizationEngine {
        &self.engine
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn source(&self) -> &A {
        &self.source
    }

    #[cfg(test)]
    pub fn source_mut(&mut self) -> &mut A {
        &mut self.source
    }

    fn schedule(&mut self) {
        self.next_token = self.next_token.wrapping_add(1);
        self.scheduled = Some(TickToken(self.next_token));
    }

    fn fail(&mut self, diagnostic: Diagnostic) {
        tracing::error!("Engine failed: {}", diagnostic);
        if self.state == EngineState::Running {
            self.source.pause();
        }
        self.scheduled = None;
        self.diagnostic = Some(diagnostic);
        self.transition(EngineState::Failed);
    }

    fn transition(&mut self, next: EngineState) {
        if self.state != next {
            tracing::info!("Engine state: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tick panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::axis::DEFAULT_MARGIN;
    use crate::spectrogram::color::map_intensity;
    use crate::spectrogram::frame::{MagnitudeFrame, SourceError};
    use crate::spectrogram::raster::PixelRaster;
    use std::collections::VecDeque;

    /// Source fed by the test; counts polls and can fail to connect.
    #[derive(Default)]
    struct FakeSource {
        frames: VecDeque<Vec<f32>>,
        bins: usize,
        polls: usize,
        connects: usize,
        failing_connects: usize,
        panic_on_poll: bool,
    }

    impl FakeSource {
        fn with_bins(bins: usize) -> Self {
            Self {
                bins,
                ..Default::default()
            }
        }

        fn push(&mut self, frame: Vec<f32>) {
            self.frames.push_back(frame);
        }
    }

    impl AnalysisSource for FakeSource {
        fn connect(&mut self) -> Result<SourceInfo, SourceError> {
            self.connects += 1;
            if self.failing_connects > 0 {
                self.failing_connects -= 1;
                return Err(SourceError("no input device".to_string()));
            }
            Ok(SourceInfo {
                bin_count: self.bins,
                nyquist_hz: None,
            })
        }

        fn poll_frame(&mut self) -> Option<MagnitudeFrame> {
            self.polls += 1;
            if self.panic_on_poll {
                panic!("analyser exploded");
            }
            self.frames.pop_front().map(MagnitudeFrame::new)
        }
    }

    fn controller(source: FakeSource) -> EngineController<PixelRaster, FakeSource> {
        EngineController::new(
            PixelRaster::new(DEFAULT_MARGIN),
            source,
            EngineSettings::default(),
        )
    }

    fn ready(source: FakeSource) -> EngineController<PixelRaster, FakeSource> {
        let mut c = controller(source);
        c.initialize(SurfaceSize::new(0, 0)).unwrap();
        c
    }

    #[test]
    fn test_initialize_moves_to_idle_with_fallback_size() {
        let mut c = controller(FakeSource::with_bins(8));
        assert_eq!(c.state(), EngineState::Uninitialized);

        c.initialize(SurfaceSize::new(0, 0)).unwrap();
        assert_eq!(c.state(), EngineState::Idle);
        assert_eq!((c.surface().width(), c.surface().height()), (800, 400));
        assert_eq!(c.surface().drawable_width(), 750);
        assert!(!c.is_tick_scheduled());
    }

    #[test]
    fn test_surface_failure_is_reported_and_not_retried() {
        let mut c = controller(FakeSource::with_bins(8));
        let err = c.initialize(SurfaceSize::new(40, 10)).unwrap_err();
        assert!(matches!(err, EngineError::SurfaceUnavailable(_)));

        let status = c.status();
        assert_eq!(status.state, EngineState::Failed);
        assert_eq!(
            status.diagnostic.map(|d| d.category),
            Some(DiagnosticCategory::Surface)
        );

        c.start().unwrap();
        assert_eq!(c.state(), EngineState::Failed);
        assert_eq!(c.on_display_frame(), None);

        // Explicit re-initialization recovers
        c.initialize(SurfaceSize::new(400, 100)).unwrap();
        assert_eq!(c.state(), EngineState::Idle);
        assert_eq!(c.status().diagnostic, None);
    }

    #[test]
    fn test_audio_failure_moves_to_failed_until_reinitialized() {
        let mut source = FakeSource::with_bins(8);
        source.failing_connects = 1;
        let mut c = ready(source);

        let err = c.start().unwrap_err();
        assert!(matches!(err, EngineError::AudioSourceUnavailable(_)));
        assert_eq!(c.state(), EngineState::Failed);
        assert_eq!(
            c.status().diagnostic.map(|d| d.category),
            Some(DiagnosticCategory::AudioSource)
        );
        assert!(!c.is_tick_scheduled());

        c.initialize(SurfaceSize::new(0, 0)).unwrap();
        c.start().unwrap();
        assert_eq!(c.state(), EngineState::Running);
        assert_eq!(c.source().connects, 2);
    }

    #[test]
    fn test_zero_bin_source_is_rejected() {
        let mut c = ready(FakeSource::with_bins(0));
        assert!(matches!(
            c.start(),
            Err(EngineError::AudioSourceUnavailable(_))
        ));
        assert_eq!(c.state(), EngineState::Failed);
    }

    #[test]
    fn test_stop_from_idle_is_noop() {
        let mut c = ready(FakeSource::with_bins(8));
        c.stop();
        assert_eq!(c.state(), EngineState::Idle);
        assert_eq!(c.status().diagnostic, None);
    }

    #[test]
    fn test_start_is_idempotent_while_running() {
        let mut c = ready(FakeSource::with_bins(8));
        c.start().unwrap();
        c.start().unwrap();
        c.start().unwrap();
        assert_eq!(c.state(), EngineState::Running);
        assert_eq!(c.source().connects, 1);

        for _ in 0..10 {
            assert_eq!(c.on_display_frame(), Some(TickOutcome::Skipped));
        }
        assert_eq!(c.source().polls, 10);
        assert_eq!(c.tick_count(), 10);
    }

    #[test]
    fn test_restart_reuses_connection() {
        let mut c = ready(FakeSource::with_bins(8));
        c.start().unwrap();
        c.stop();
        assert!(!c.is_tick_scheduled());
        c.start().unwrap();
        assert_eq!(c.source().connects, 1);
        assert!(c.is_tick_scheduled());
    }

    #[test]
    fn test_malformed_frame_is_skipped_and_loop_continues() {
        let mut c = ready(FakeSource::with_bins(8));
        c.start().unwrap();
        let before = c.surface().clone();

        c.source_mut().push(vec![0.5; 5]);
        assert!(matches!(
            c.on_display_frame(),
            Some(TickOutcome::Dropped(EngineError::MalformedFrame {
                expected: 8,
                actual: 5
            }))
        ));
        assert_eq!(c.state(), EngineState::Running);
        assert!(c.is_tick_scheduled());
        for y in 0..400 {
            assert_eq!(c.surface().row(y), before.row(y));
        }

        c.source_mut().push(vec![0.5; 8]);
        assert_eq!(c.on_display_frame(), Some(TickOutcome::Appended));
    }

    #[test]
    fn test_panicking_tick_is_caught_and_reported() {
        let mut c = ready(FakeSource::with_bins(8));
        c.start().unwrap();
        c.source_mut().panic_on_poll = true;

        assert_eq!(c.on_display_frame(), None);
        let status = c.status();
        assert_eq!(status.state, EngineState::Failed);
        let diagnostic = status.diagnostic.unwrap();
        assert_eq!(diagnostic.category, DiagnosticCategory::Tick);
        assert!(diagnostic.message.contains("analyser exploded"));
        assert!(!c.is_tick_scheduled());
    }

    #[test]
    fn test_scheme_and_sensitivity_commands() {
        let mut c = ready(FakeSource::with_bins(8));
        assert_eq!(c.set_color_scheme("heatmap"), Ok(ColorScheme::Heatmap));
        assert!(c.set_color_scheme("rainbow").is_err());
        assert_eq!(c.engine().scheme(), ColorScheme::Heatmap);
        assert_eq!(c.toggle_color_scheme(), ColorScheme::Grayscale);

        for _ in 0..20 {
            c.adjust_sensitivity(0.5);
        }
        assert_eq!(c.engine().sensitivity().value(), 5.0);
        for _ in 0..20 {
            c.adjust_sensitivity(-0.5);
        }
        assert_eq!(c.engine().sensitivity().value(), 0.5);
    }

    #[test]
    fn test_end_to_end_three_frames_then_stop() {
        let mut c = ready(FakeSource::with_bins(8));
        assert_eq!(c.surface().drawable_width(), 750);
        c.start().unwrap();

        let frames: Vec<Vec<f32>> = vec![
            vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7],
            vec![0.6, 0.5, 0.4, 0.3, 0.2, 0.1, 0.05, 0.0],
            vec![0.25; 8],
        ];
        for frame in &frames {
            c.source_mut().push(frame.clone());
            assert_eq!(c.on_display_frame(), Some(TickOutcome::Appended));
        }

        let sensitivity = c.engine().sensitivity().value();
        let scheme = c.engine().scheme();
        let height = c.surface().height();
        for (k, frame) in frames.iter().enumerate() {
            let x = 800 - frames.len() + k;
            for row in 0..height {
                let bin = row * frame.len() / height;
                let expected = map_intensity(frame[bin] * sensitivity, scheme);
                assert_eq!(c.surface().pixel(x, height - 1 - row), Some(expected));
            }
        }
        assert_eq!(c.columns_appended(), 3);

        c.stop();
        let snapshot = c.surface().clone();
        c.source_mut().push(vec![1.0; 8]);
        assert_eq!(c.on_display_frame(), None);
        for y in 0..height {
            assert_eq!(c.surface().row(y), snapshot.row(y));
        }
        assert_eq!(c.source().frames.len(), 1);
        assert_eq!(c.columns_appended(), 3);
    }
}
