//! Per-tick spectrogram update: pull a frame, color it, append it.

use super::axis::{FrequencyAxis, GridLine};
use super::color::{map_intensity, ColorScheme, Rgb};
use super::error::EngineError;
use super::frame::{AnalysisSource, MagnitudeFrame, SourceInfo};
use super::raster::RasterSurface;
use super::sensitivity::Sensitivity;

/// Background of the label strip.
pub const AXIS_STRIP: Rgb = Rgb::new(0, 0, 28);
/// Tick marks drawn inside the label strip at each gridline.
pub const AXIS_TICK: Rgb = Rgb::new(70, 70, 100);

const PLACEHOLDER_TOP: Rgb = Rgb::new(0x00, 0x00, 0x33);
const PLACEHOLDER_BOTTOM: Rgb = Rgb::new(0x00, 0x00, 0x11);
const TEST_PATTERN_HEIGHT: usize = 20;
const TEST_PATTERN: [Rgb; 5] = [
    Rgb::new(255, 0, 0),
    Rgb::new(255, 165, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(0, 128, 0),
    Rgb::new(0, 0, 255),
];

/// Display settings that users can change while the engine runs.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub scheme: ColorScheme,
    pub sensitivity: Sensitivity,
    pub axis: FrequencyAxis,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            scheme: ColorScheme::default(),
            sensitivity: Sensitivity::default(),
            axis: FrequencyAxis::default(),
        }
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new column was written.
    Appended,
    /// No frame was ready; nothing was drawn.
    Skipped,
    /// The frame was rejected; nothing was drawn.
    Dropped(EngineError),
}

/// Running counters, mostly for status display and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    pub columns_appended: u64,
    pub frames_skipped: u64,
    pub frames_dropped: u64,
}

pub struct VisualizationEngine {
    scheme: ColorScheme,
    sensitivity: Sensitivity,
    axis: FrequencyAxis,
    grid_lines: Vec<GridLine>,
    bin_count: usize,
    visible_bins: usize,
    column: Vec<Rgb>,
    stats: EngineStats,
}

impl VisualizationEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            scheme: settings.scheme,
            sensitivity: settings.sensitivity,
            axis: settings.axis,
            grid_lines: Vec::new(),
            bin_count: 0,
            visible_bins: 0,
            column: Vec::new(),
            stats: EngineStats::default(),
        }
    }

    /// Fixes the frame length and the visible bin range for a connected source.
    ///
    /// With a known Nyquist frequency only the bins up to the axis maximum are
    /// shown; if the source tops out below that maximum the axis is narrowed.
    pub fn configure(&mut self, info: SourceInfo) {
        self.bin_count = info.bin_count;
        self.visible_bins = info.bin_count;

        if let Some(nyquist) = info.nyquist_hz.filter(|n| *n > 0.0) {
            let max_freq = self.axis.max_freq();
            if nyquist <= max_freq {
                self.axis = self.axis.with_max_freq(nyquist);
                self.grid_lines.clear();
            } else {
                let visible = ((max_freq / nyquist) * info.bin_count as f32).ceil() as usize;
                self.visible_bins = visible.clamp(1, info.bin_count);
            }
        }

        tracing::info!(
            "Engine configured: {} bins, {} visible up to {} Hz",
            self.bin_count,
            self.visible_bins,
            self.axis.max_freq()
        );
    }

    /// Draws the idle placeholder: navy gradient, label strip and a test pattern.
    pub fn draw_placeholder<S: RasterSurface + ?Sized>(&mut self, surface: &mut S) {
        let (width, height, margin) = (surface.width(), surface.height(), surface.margin());
        if height == 0 {
            return;
        }

        for y in 0..height {
            let t = y as f32 / (height.max(2) - 1) as f32;
            surface.clear_region(0, y, width, 1, PLACEHOLDER_TOP.lerp(PLACEHOLDER_BOTTOM, t));
        }

        let drawable = width.saturating_sub(margin);
        let bar_height = TEST_PATTERN_HEIGHT.min(height);
        let bar_width = drawable / TEST_PATTERN.len();
        for (i, &color) in TEST_PATTERN.iter().enumerate() {
            surface.clear_region(
                margin + i * bar_width,
                height - bar_height,
                bar_width,
                bar_height,
                color,
            );
        }

        self.grid_lines = self.axis.compute_grid_lines(height);
        self.redraw_axis(surface);
    }

    /// Repaints the label strip. It is never scrolled, so it is redrawn whole.
    pub fn redraw_axis<S: RasterSurface + ?Sized>(&self, surface: &mut S) {
        let (height, margin) = (surface.height(), surface.margin());
        if margin == 0 {
            return;
        }
        surface.clear_region(0, 0, margin, height, AXIS_STRIP);

        let tick_width = (margin / 5).max(1);
        for line in &self.grid_lines {
            let y = (line.y.round() as usize).min(height.saturating_sub(1));
            surface.clear_region(margin - tick_width, y, tick_width, 1, AXIS_TICK);
        }
    }

    /// Runs one pull-map-append-redraw cycle.
    ///
    /// Missing and malformed frames leave the surface untouched. An error is
    /// returned only when the surface itself cannot be drawn to.
    pub fn tick<S, A>(&mut self, surface: &mut S, source: &mut A) -> Result<TickOutcome, EngineError>
    where
        S: RasterSurface + ?Sized,
        A: AnalysisSource + ?Sized,
    {
        self.stats.ticks += 1;

        let Some(frame) = source.poll_frame() else {
            self.stats.frames_skipped += 1;
            tracing::trace!("No frame ready, skipping tick {}", self.stats.ticks);
            return Ok(TickOutcome::Skipped);
        };

        if frame.len() != self.bin_count || frame.is_empty() {
            let err = EngineError::MalformedFrame {
                expected: self.bin_count,
                actual: frame.len(),
            };
            self.stats.frames_dropped += 1;
            tracing::warn!("Dropping frame: {}", err);
            return Ok(TickOutcome::Dropped(err));
        }

        if !surface.is_allocated() {
            return Err(EngineError::SurfaceUnavailable(
                "surface is not allocated".to_string(),
            ));
        }

        let height = surface.height();
        self.build_column(&frame, height);
        surface
            .append_column(&self.column)
            .map_err(|e| EngineError::SurfaceUnavailable(e.to_string()))?;

        if self.grid_lines.is_empty() {
            self.grid_lines = self.axis.compute_grid_lines(height);
        }
        self.redraw_axis(surface);

        self.stats.columns_appended += 1;
        Ok(TickOutcome::Appended)
    }

    /// Resamples the frame onto `height` rows, row 0 being the lowest bin.
    fn build_column(&mut self, frame: &MagnitudeFrame, height: usize) {
        let bins = frame.bins();
        let visible = self.visible_bins.clamp(1, bins.len());
        let (sensitivity, scheme) = (self.sensitivity, self.scheme);

        self.column.clear();
        self.column.extend((0..height).map(|row| {
            let bin = row * visible / height;
            map_intensity(sensitivity.apply(bins[bin]), scheme)
        }));
    }

    pub fn scheme(&self) -> ColorScheme {
        self.scheme
    }

    pub fn set_scheme(&mut self, scheme: ColorScheme) {
        self.scheme = scheme;
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    pub fn adjust_sensitivity(&mut self, delta: f32) -> f32 {
        self.sensitivity.adjust(delta)
    }

    pub fn axis(&self) -> &FrequencyAxis {
        &self.axis
    }

    /// Gridlines for the current surface height; empty before the first draw.
    pub fn grid_lines(&self) -> &[GridLine] {
        &self.grid_lines
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn visible_bins(&self) -> usize {
        self.visible_bins
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::frame::SourceError;
    use crate::spectrogram::raster::{PixelRaster, SurfaceSize};
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Option<Vec<f32>>>);

    impl AnalysisSource for Scripted {
        fn connect(&mut self) -> Result<SourceInfo, SourceError> {
            Ok(SourceInfo {
                bin_count: 4,
                nyquist_hz: None,
            })
        }

        fn poll_frame(&mut self) -> Option<MagnitudeFrame> {
            self.0.pop_front().flatten().map(MagnitudeFrame::new)
        }
    }

    fn setup(height: usize) -> (VisualizationEngine, PixelRaster) {
        let mut engine = VisualizationEngine::new(EngineSettings::default());
        engine.configure(SourceInfo {
            bin_count: 4,
            nyquist_hz: None,
        });
        let mut raster = PixelRaster::new(2);
        raster.allocate(SurfaceSize::new(10, height)).unwrap();
        engine.draw_placeholder(&mut raster);
        (engine, raster)
    }

    #[test]
    fn test_tick_maps_bins_bottom_up_with_sensitivity() {
        let (mut engine, mut raster) = setup(8);
        let mut source = Scripted(VecDeque::from([Some(vec![0.0, 0.1, 0.2, 0.4])]));

        assert_eq!(engine.tick(&mut raster, &mut source), Ok(TickOutcome::Appended));

        // Eight rows over four bins: two rows per bin, bin 0 at the bottom
        let expect = |v: f32| map_intensity(v * 1.5, ColorScheme::Grayscale);
        assert_eq!(raster.pixel(9, 7), Some(expect(0.0)));
        assert_eq!(raster.pixel(9, 6), Some(expect(0.0)));
        assert_eq!(raster.pixel(9, 5), Some(expect(0.1)));
        assert_eq!(raster.pixel(9, 2), Some(expect(0.2)));
        assert_eq!(raster.pixel(9, 0), Some(expect(0.4)));
    }

    #[test]
    fn test_missing_and_malformed_frames_do_not_draw() {
        let (mut engine, mut raster) = setup(4);
        let before = raster.clone();
        let mut source = Scripted(VecDeque::from([None, Some(vec![1.0; 3])]));

        assert_eq!(engine.tick(&mut raster, &mut source), Ok(TickOutcome::Skipped));
        assert_eq!(
            engine.tick(&mut raster, &mut source),
            Ok(TickOutcome::Dropped(EngineError::MalformedFrame {
                expected: 4,
                actual: 3
            }))
        );
        for y in 0..4 {
            assert_eq!(raster.row(y), before.row(y));
        }

        let stats = engine.stats();
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.frames_skipped, 1);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.columns_appended, 0);
    }

    #[test]
    fn test_unallocated_surface_is_an_error() {
        let mut engine = VisualizationEngine::new(EngineSettings::default());
        engine.configure(SourceInfo {
            bin_count: 4,
            nyquist_hz: None,
        });
        let mut raster = PixelRaster::new(0);
        let mut source = Scripted(VecDeque::from([Some(vec![0.5; 4])]));
        assert!(matches!(
            engine.tick(&mut raster, &mut source),
            Err(EngineError::SurfaceUnavailable(_))
        ));
    }

    #[test]
    fn test_visible_bins_follow_axis_range() {
        let mut engine = VisualizationEngine::new(EngineSettings::default());
        engine.configure(SourceInfo {
            bin_count: 512,
            nyquist_hz: Some(20_000.0),
        });
        assert_eq!(engine.visible_bins(), 256);

        let mut narrow = VisualizationEngine::new(EngineSettings::default());
        narrow.configure(SourceInfo {
            bin_count: 512,
            nyquist_hz: Some(4_000.0),
        });
        assert_eq!(narrow.visible_bins(), 512);
        assert_eq!(narrow.axis().max_freq(), 4_000.0);
        let labels: Vec<f32> = narrow
            .axis()
            .compute_grid_lines(100)
            .iter()
            .map(|l| l.freq)
            .collect();
        assert_eq!(labels, vec![0.0, 2_500.0]);
    }

    #[test]
    fn test_placeholder_paints_strip_and_pattern() {
        let (_engine, raster) = setup(30);
        assert_eq!(raster.pixel(0, 5), Some(AXIS_STRIP));
        // Drawable width 8 over 5 bars gives 1px bars starting at the margin
        assert_eq!(raster.pixel(2, 29), Some(TEST_PATTERN[0]));
        assert_eq!(raster.pixel(6, 29), Some(TEST_PATTERN[4]));
        assert_eq!(raster.pixel(5, 0), Some(PLACEHOLDER_TOP));
    }
}
