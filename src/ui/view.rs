//! Widget that presents a [`PixelRaster`] inside a terminal area.
//!
//! Each terminal cell shows two vertically stacked raster samples using an
//! upper half block: the foreground paints the top sample, the background the
//! bottom one. Frequency labels, translucent gridlines and the idle
//! placeholder text are overlaid here rather than drawn into the raster, so
//! they never scroll.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use crate::spectrogram::{GridLine, PixelRaster, RasterSurface, Rgb};

const UPPER_HALF: &str = "▀";
const GRIDLINE_ALPHA: f32 = 0.2;
const TEST_PATTERN_CAPTION: &str = "Color Test Pattern";

pub struct SpectrogramView<'a> {
    raster: &'a PixelRaster,
    grid_lines: &'a [GridLine],
    placeholder: &'a [String],
}

impl<'a> SpectrogramView<'a> {
    pub fn new(raster: &'a PixelRaster, grid_lines: &'a [GridLine]) -> Self {
        Self {
            raster,
            grid_lines,
            placeholder: &[],
        }
    }

    /// Centered message lines shown over the idle placeholder frame.
    pub fn placeholder(mut self, lines: &'a [String]) -> Self {
        self.placeholder = lines;
        self
    }

    fn render_pixels(&self, area: Rect, buf: &mut Buffer) {
        let (width, height) = (self.raster.width(), self.raster.height());
        let margin_cols = label_columns(self.raster.margin(), width, area.width);
        let half_rows = area.height as usize * 2;
        let grid_rows: Vec<usize> = self
            .grid_lines
            .iter()
            .map(|line| half_row(line.y, height, half_rows))
            .collect();

        for cy in 0..area.height {
            let top_y = sample_index(cy, area.height, height, 0, 2);
            let bottom_y = sample_index(cy, area.height, height, 1, 2);
            let (top_row, bottom_row) = (cy as usize * 2, cy as usize * 2 + 1);

            for cx in 0..area.width {
                let x = sample_index(cx, area.width, width, 0, 1);
                let mut top = self.raster.pixel(x, top_y).unwrap_or(Rgb::BLACK);
                let mut bottom = self.raster.pixel(x, bottom_y).unwrap_or(Rgb::BLACK);

                if cx >= margin_cols {
                    if grid_rows.contains(&top_row) {
                        top = top.lerp(Rgb::WHITE, GRIDLINE_ALPHA);
                    }
                    if grid_rows.contains(&bottom_row) {
                        bottom = bottom.lerp(Rgb::WHITE, GRIDLINE_ALPHA);
                    }
                }

                if let Some(cell) = buf.cell_mut((area.x + cx, area.y + cy)) {
                    cell.set_symbol(UPPER_HALF)
                        .set_fg(top.into())
                        .set_bg(bottom.into());
                }
            }
        }
    }

    fn render_labels(&self, area: Rect, buf: &mut Buffer) {
        let half_rows = area.height as usize * 2;
        let style = Style::default().fg(Color::White);
        for line in self.grid_lines {
            let row = half_row(line.y, self.raster.height(), half_rows) / 2;
            buf.set_stringn(
                area.x,
                area.y + row as u16,
                line.label(),
                area.width as usize,
                style,
            );
        }
    }

    fn render_placeholder(&self, area: Rect, buf: &mut Buffer) {
        let count = self.placeholder.len() as u16;
        let first_row = (area.height / 2).saturating_sub(count / 2);

        for (i, text) in self.placeholder.iter().enumerate() {
            let y = first_row + i as u16;
            if y >= area.height {
                break;
            }
            let mut style = Style::default().fg(Color::White);
            if i == 0 {
                style = style.add_modifier(Modifier::BOLD);
            }
            write_centered(buf, area, y, text, style);
        }

        if area.height > count + 1 {
            write_centered(
                buf,
                area,
                area.height - 1,
                TEST_PATTERN_CAPTION,
                Style::default().fg(Color::White),
            );
        }
    }
}

impl Widget for SpectrogramView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        if !self.raster.is_allocated() {
            buf.set_style(area, Style::default().bg(Color::Black));
            return;
        }

        self.render_pixels(area, buf);
        self.render_labels(area, buf);
        if !self.placeholder.is_empty() {
            self.render_placeholder(area, buf);
        }
    }
}

fn write_centered(buf: &mut Buffer, area: Rect, y: u16, text: &str, style: Style) {
    let len = text.chars().count() as u16;
    let x = area.x + area.width.saturating_sub(len) / 2;
    buf.set_stringn(x, area.y + y, text, area.width as usize, style);
}

/// Pixel index sampled for part `part` of `parts` within cell `cell`.
///
/// Samples the center of each sub-cell so downscaling stays symmetric.
fn sample_index(cell: u16, cells: u16, pixels: usize, part: usize, parts: usize) -> usize {
    let numerator = (cell as usize * parts + part) * 2 + 1;
    let denominator = cells as usize * parts * 2;
    (numerator * pixels / denominator).min(pixels.saturating_sub(1))
}

/// Half-row of the presented area that contains raster row `y`.
fn half_row(y: f32, raster_height: usize, half_rows: usize) -> usize {
    let scaled = (y / raster_height.max(1) as f32) * half_rows as f32;
    (scaled.max(0.0) as usize).min(half_rows.saturating_sub(1))
}

/// Number of cell columns covered by the label strip.
fn label_columns(margin: usize, raster_width: usize, cols: u16) -> u16 {
    if raster_width == 0 {
        return 0;
    }
    (margin * cols as usize).div_ceil(raster_width) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::{FrequencyAxis, SurfaceSize};

    fn raster(width: usize, height: usize, margin: usize) -> PixelRaster {
        let mut raster = PixelRaster::new(margin);
        raster.allocate(SurfaceSize::new(width, height)).unwrap();
        raster
    }

    #[test]
    fn test_sample_index_covers_range() {
        assert_eq!(sample_index(0, 10, 20, 0, 1), 1);
        assert_eq!(sample_index(9, 10, 20, 0, 1), 19);
        assert_eq!(sample_index(3, 4, 8, 0, 2), 6);
        assert_eq!(sample_index(3, 4, 8, 1, 2), 7);
        // Upscaling repeats pixels
        assert_eq!(sample_index(5, 10, 2, 0, 1), 1);
    }

    #[test]
    fn test_newest_bottom_bin_lands_in_bottom_right_cell() {
        let mut raster = raster(20, 8, 2);
        let red = Rgb::new(255, 0, 0);
        let mut column = vec![Rgb::BLACK; 8];
        column[0] = red;
        raster.append_column(&column).unwrap();

        let area = Rect::new(0, 0, 10, 4);
        let mut buf = Buffer::empty(area);
        SpectrogramView::new(&raster, &[]).render(area, &mut buf);

        let cell = buf.cell((9, 3)).unwrap();
        assert_eq!(cell.symbol(), UPPER_HALF);
        assert_eq!(cell.bg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.fg, Color::Rgb(0, 0, 0));
    }

    #[test]
    fn test_labels_and_gridlines_are_overlaid() {
        let raster = raster(40, 16, 4);
        let grid = FrequencyAxis::default().compute_grid_lines(16);
        let area = Rect::new(0, 0, 20, 8);
        let mut buf = Buffer::empty(area);
        SpectrogramView::new(&raster, &grid).render(area, &mut buf);

        // 10000 Hz at the top row, 0 Hz at the bottom row
        let top: String = (0..8).map(|x| buf.cell((x, 0)).unwrap().symbol()).collect();
        assert_eq!(top, "10000 Hz");
        let bottom: String = (0..4).map(|x| buf.cell((x, 7)).unwrap().symbol()).collect();
        assert_eq!(bottom, "0 Hz");

        // Gridline at the top half of row 0 lightens a black pixel
        let cell = buf.cell((15, 0)).unwrap();
        assert_eq!(cell.fg, Color::Rgb(51, 51, 51));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 0));
    }

    #[test]
    fn test_placeholder_text_is_centered() {
        let raster = raster(40, 16, 4);
        let lines = vec!["Hi".to_string()];
        let area = Rect::new(0, 0, 20, 8);
        let mut buf = Buffer::empty(area);
        SpectrogramView::new(&raster, &[])
            .placeholder(&lines)
            .render(area, &mut buf);

        assert_eq!(buf.cell((9, 4)).unwrap().symbol(), "H");
        assert_eq!(buf.cell((10, 4)).unwrap().symbol(), "i");
        let caption: String = (1..19).map(|x| buf.cell((x, 7)).unwrap().symbol()).collect();
        assert_eq!(caption, TEST_PATTERN_CAPTION);
    }

    #[test]
    fn test_unallocated_raster_renders_blank() {
        let raster = PixelRaster::new(50);
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        SpectrogramView::new(&raster, &[]).render(area, &mut buf);
        assert_eq!(buf.cell((0, 0)).unwrap().bg, Color::Black);
    }
}
