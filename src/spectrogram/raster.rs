//! Scrolling pixel raster.
//!
//! The raster is a fixed-size grid of [`Rgb`] pixels. Each append shifts the
//! drawable region (everything right of the label margin) one column to the
//! left and writes the new column at the right edge, so time runs left to
//! right and frequency runs bottom to top.

use super::color::Rgb;
use super::error::{EngineError, RasterError};

pub const FALLBACK_WIDTH: usize = 800;
pub const FALLBACK_HEIGHT: usize = 400;

/// Pixel dimensions of a surface or viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: usize,
    pub height: usize,
}

impl SurfaceSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Replaces any zero dimension with the 800×400 fallback.
    pub fn or_fallback(self) -> Self {
        Self {
            width: if self.width == 0 { FALLBACK_WIDTH } else { self.width },
            height: if self.height == 0 { FALLBACK_HEIGHT } else { self.height },
        }
    }
}

/// Minimal drawing capability the engine needs from a surface.
pub trait RasterSurface {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Width of the left label strip, excluded from scrolling.
    fn margin(&self) -> usize;

    /// Sizes the surface. Dimensions are fixed after the first success.
    fn allocate(&mut self, size: SurfaceSize) -> Result<(), EngineError>;

    /// Shifts the drawable region left by one column and writes `colors` at
    /// the right edge, index 0 at the bottom row.
    fn append_column(&mut self, colors: &[Rgb]) -> Result<(), RasterError>;

    /// Fills a rectangle, clipped to the surface.
    fn clear_region(&mut self, x: usize, y: usize, width: usize, height: usize, color: Rgb);

    fn is_allocated(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }
}

/// In-memory row-major raster.
#[derive(Debug, Clone)]
pub struct PixelRaster {
    width: usize,
    height: usize,
    margin: usize,
    pixels: Vec<Rgb>,
}

impl PixelRaster {
    /// Creates an unallocated raster with the given label margin.
    pub fn new(margin: usize) -> Self {
        Self {
            width: 0,
            height: 0,
            margin,
            pixels: Vec::new(),
        }
    }

    /// Width of the scrolling region.
    pub fn drawable_width(&self) -> usize {
        self.width.saturating_sub(self.margin)
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// One full row of pixels, top row first.
    pub fn row(&self, y: usize) -> &[Rgb] {
        if y >= self.height {
            return &[];
        }
        &self.pixels[y * self.width..(y + 1) * self.width]
    }
}

impl RasterSurface for PixelRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn margin(&self) -> usize {
        self.margin
    }

    fn allocate(&mut self, size: SurfaceSize) -> Result<(), EngineError> {
        if self.is_allocated() {
            tracing::debug!(
                "Raster already allocated at {}x{}, keeping dimensions",
                self.width,
                self.height
            );
            return Ok(());
        }

        if size.width == 0 || size.height == 0 {
            return Err(EngineError::SurfaceUnavailable(format!(
                "surface has zero area ({}x{})",
                size.width, size.height
            )));
        }
        if self.margin >= size.width {
            return Err(EngineError::SurfaceUnavailable(format!(
                "label margin {}px leaves no drawable area in a {}px wide surface",
                self.margin, size.width
            )));
        }

        let len = size.width.checked_mul(size.height).ok_or_else(|| {
            EngineError::SurfaceUnavailable(format!(
                "surface {}x{} is too large",
                size.width, size.height
            ))
        })?;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|e| EngineError::SurfaceUnavailable(format!("pixel buffer: {e}")))?;
        pixels.resize(len, Rgb::BLACK);

        self.pixels = pixels;
        self.width = size.width;
        self.height = size.height;
        tracing::debug!(
            "Raster allocated: {}x{} ({}px margin)",
            self.width,
            self.height,
            self.margin
        );
        Ok(())
    }

    fn append_column(&mut self, colors: &[Rgb]) -> Result<(), RasterError> {
        if !self.is_allocated() {
            return Err(RasterError::Unallocated);
        }
        if colors.len() != self.height {
            return Err(RasterError::ColumnLength {
                expected: self.height,
                actual: colors.len(),
            });
        }

        let width = self.width;
        let margin = self.margin;

        // Block-move each row's drawable span one pixel left
        for row in self.pixels.chunks_exact_mut(width) {
            row.copy_within(margin + 1..width, margin);
        }

        let right = width - 1;
        for (i, &color) in colors.iter().enumerate() {
            let y = self.height - 1 - i;
            self.pixels[y * width + right] = color;
        }

        Ok(())
    }

    fn clear_region(&mut self, x: usize, y: usize, width: usize, height: usize, color: Rgb) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        if x >= x_end || y >= y_end {
            return;
        }
        for row in y..y_end {
            let start = row * self.width;
            self.pixels[start + x..start + x_end].fill(color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width: usize, height: usize, margin: usize) -> PixelRaster {
        let mut r = PixelRaster::new(margin);
        r.allocate(SurfaceSize::new(width, height)).unwrap();
        r
    }

    fn solid(height: usize, level: u8) -> Vec<Rgb> {
        vec![Rgb::new(level, level, level); height]
    }

    #[test]
    fn test_fallback_size() {
        assert_eq!(
            SurfaceSize::new(0, 0).or_fallback(),
            SurfaceSize::new(FALLBACK_WIDTH, FALLBACK_HEIGHT)
        );
        assert_eq!(SurfaceSize::new(120, 0).or_fallback(), SurfaceSize::new(120, 400));
    }

    #[test]
    fn test_allocation_rejects_unusable_sizes() {
        let mut r = PixelRaster::new(50);
        assert!(matches!(
            r.allocate(SurfaceSize::new(0, 10)),
            Err(EngineError::SurfaceUnavailable(_))
        ));
        assert!(matches!(
            r.allocate(SurfaceSize::new(50, 10)),
            Err(EngineError::SurfaceUnavailable(_))
        ));
        assert!(matches!(
            r.allocate(SurfaceSize::new(usize::MAX, 2)),
            Err(EngineError::SurfaceUnavailable(_))
        ));
        assert!(!r.is_allocated());
    }

    #[test]
    fn test_dimensions_fixed_after_allocation() {
        let mut r = raster(80, 20, 10);
        r.allocate(SurfaceSize::new(200, 200)).unwrap();
        assert_eq!((r.width(), r.height()), (80, 20));
        assert_eq!(r.drawable_width(), 70);
    }

    #[test]
    fn test_column_index_zero_lands_at_bottom() {
        let mut r = raster(8, 4, 2);
        let column: Vec<Rgb> = (0..4).map(|i| Rgb::new(i * 10, 0, 0)).collect();
        r.append_column(&column).unwrap();
        assert_eq!(r.pixel(7, 3), Some(Rgb::new(0, 0, 0)));
        assert_eq!(r.pixel(7, 2), Some(Rgb::new(10, 0, 0)));
        assert_eq!(r.pixel(7, 0), Some(Rgb::new(30, 0, 0)));
    }

    #[test]
    fn test_appends_scroll_left_in_order() {
        let (width, height, margin) = (16, 3, 4);
        let mut r = raster(width, height, margin);
        let drawable = width - margin;

        // Seed recognisable content across the drawable region
        for x in margin..width {
            r.clear_region(x, 0, 1, height, Rgb::new(0, x as u8, 0));
        }

        let n = 5;
        for i in 0..n {
            r.append_column(&solid(height, 100 + i as u8)).unwrap();
        }

        for y in 0..height {
            for i in 0..n {
                let x = width - n + i;
                assert_eq!(r.pixel(x, y), Some(Rgb::new(100 + i as u8, 100 + i as u8, 100 + i as u8)));
            }
            for x in margin..margin + drawable - n {
                assert_eq!(r.pixel(x, y), Some(Rgb::new(0, (x + n) as u8, 0)));
            }
        }
    }

    #[test]
    fn test_old_content_evicted_after_full_width() {
        let (width, height, margin) = (12, 2, 2);
        let mut r = raster(width, height, margin);
        r.clear_region(0, 0, width, height, Rgb::WHITE);

        for _ in 0..(width - margin) {
            r.append_column(&solid(height, 7)).unwrap();
        }
        for y in 0..height {
            for x in margin..width {
                assert_eq!(r.pixel(x, y), Some(Rgb::new(7, 7, 7)));
            }
            // Margin is never scrolled
            for x in 0..margin {
                assert_eq!(r.pixel(x, y), Some(Rgb::WHITE));
            }
        }
    }

    #[test]
    fn test_length_mismatch_leaves_raster_untouched() {
        let mut r = raster(10, 4, 2);
        r.append_column(&solid(4, 9)).unwrap();
        let before = r.clone();

        assert_eq!(
            r.append_column(&solid(3, 1)),
            Err(RasterError::ColumnLength { expected: 4, actual: 3 })
        );
        assert_eq!(r.pixels, before.pixels);
    }

    #[test]
    fn test_unallocated_append_is_noop() {
        let mut r = PixelRaster::new(0);
        assert_eq!(r.append_column(&[]), Err(RasterError::Unallocated));
        r.clear_region(0, 0, 5, 5, Rgb::WHITE);
        assert_eq!(r.pixel(0, 0), None);
    }

    #[test]
    fn test_clear_region_is_clipped() {
        let mut r = raster(6, 3, 1);
        r.clear_region(4, 1, 10, 10, Rgb::WHITE);
        assert_eq!(r.pixel(5, 2), Some(Rgb::WHITE));
        assert_eq!(r.pixel(3, 2), Some(Rgb::BLACK));
        assert_eq!(r.pixel(4, 0), Some(Rgb::BLACK));
        assert_eq!(r.row(1).len(), 6);
    }
}
