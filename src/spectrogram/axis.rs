//! Frequency axis geometry.
//!
//! Only computes where labels and gridlines go; drawing them is left to the
//! presenter.

/// Width in pixels of the left strip reserved for axis labels.
pub const DEFAULT_MARGIN: usize = 50;

pub const DEFAULT_MAX_FREQ: f32 = 10_000.0;

pub const DEFAULT_LABELS: [f32; 5] = [0.0, 2_500.0, 5_000.0, 7_500.0, 10_000.0];

/// One labelled horizontal gridline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub freq: f32,
    /// Distance from the top edge, in pixels. 0 Hz sits at the bottom.
    pub y: f32,
}

impl GridLine {
    pub fn label(&self) -> String {
        format!("{} Hz", self.freq.round() as i64)
    }
}

/// Frequency range and label set for the spectrogram's vertical axis.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyAxis {
    min_freq: f32,
    max_freq: f32,
    labels: Vec<f32>,
}

impl Default for FrequencyAxis {
    fn default() -> Self {
        Self::new(0.0, DEFAULT_MAX_FREQ, DEFAULT_LABELS.to_vec())
    }
}

impl FrequencyAxis {
    /// Creates an axis; labels are sorted ascending.
    pub fn new(min_freq: f32, max_freq: f32, mut labels: Vec<f32>) -> Self {
        labels.sort_by(|a, b| a.total_cmp(b));
        Self {
            min_freq,
            max_freq,
            labels,
        }
    }

    pub fn min_freq(&self) -> f32 {
        self.min_freq
    }

    pub fn max_freq(&self) -> f32 {
        self.max_freq
    }

    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    /// Same labels over a different upper bound.
    pub fn with_max_freq(&self, max_freq: f32) -> Self {
        Self::new(self.min_freq, max_freq, self.labels.clone())
    }

    /// Computes the y coordinate for every label inside `[min_freq, max_freq]`.
    pub fn compute_grid_lines(&self, surface_height: usize) -> Vec<GridLine> {
        let height = surface_height as f32;
        self.labels
            .iter()
            .copied()
            .filter(|&f| f >= self.min_freq && f <= self.max_freq)
            .map(|freq| GridLine {
                freq,
                y: height - (freq / self.max_freq) * height,
            })
            .collect()
    }
}

/// Grid lines for the default 0–10 kHz axis.
pub fn compute_grid_lines(surface_height: usize) -> Vec<GridLine> {
    FrequencyAxis::default().compute_grid_lines(surface_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_lines_for_400px() {
        let lines = compute_grid_lines(400);
        let pairs: Vec<(f32, f32)> = lines.iter().map(|l| (l.freq, l.y)).collect();
        assert_eq!(
            pairs,
            vec![
                (0.0, 400.0),
                (2500.0, 300.0),
                (5000.0, 200.0),
                (7500.0, 100.0),
                (10000.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_labels_outside_range_are_dropped() {
        let axis = FrequencyAxis::new(0.0, 4_000.0, vec![8_000.0, 0.0, 2_000.0]);
        let lines = axis.compute_grid_lines(100);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].y, 50.0);
        assert_eq!(lines[1].label(), "2000 Hz");
    }
}
