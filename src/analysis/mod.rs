//! Upstream audio analysis sources.
//!
//! Each source turns some audio signal into [`MagnitudeFrame`]s through a
//! shared [`SpectrumAnalyser`]:
//! - [`LiveInput`] captures from an input device with cpal
//! - [`WavPlayback`] plays a WAV file back at real-time pace
//! - [`SweepSource`] synthesizes a repeating frequency sweep
//!
//! [`MagnitudeFrame`]: crate::spectrogram::MagnitudeFrame

pub mod analyser;
pub mod capture;
pub mod clock;
pub mod synthetic;
pub mod wav;

pub use analyser::{AnalyserConfig, SpectrumAnalyser};
pub use capture::LiveInput;
pub use synthetic::SweepSource;
pub use wav::WavPlayback;

use std::collections::VecDeque;

/// Bounded window of the most recent mono samples.
///
/// Tracks how many samples arrived since the last snapshot so readers can
/// tell whether a new frame is worth computing.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    samples: VecDeque<f32>,
    capacity: usize,
    fresh: usize,
}

impl SampleHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::from(vec![0.0; capacity]),
            capacity,
            fresh: 0,
        }
    }

    pub fn extend<I: IntoIterator<Item = f32>>(&mut self, samples: I) {
        for s in samples {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(s);
            self.fresh = self.fresh.saturating_add(1);
        }
    }

    /// Copies the window into `out` if new samples arrived since the last call.
    pub fn take_snapshot(&mut self, out: &mut Vec<f32>) -> bool {
        if self.fresh == 0 {
            return false;
        }
        self.fresh = 0;
        out.clear();
        out.extend(self.samples.iter().copied());
        true
    }
}

/// Averages interleaved frames down to mono.
pub(crate) fn downmix(data: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    let channels = channels.max(1);
    data.chunks_exact(channels)
        .map(move |frame| frame.iter().sum::<f32>() / channels as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keeps_latest_window() {
        let mut history = SampleHistory::new(4);
        let mut out = Vec::new();
        assert!(!history.take_snapshot(&mut out));

        history.extend([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(history.take_snapshot(&mut out));
        assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);
        assert!(!history.take_snapshot(&mut out));
    }

    #[test]
    fn test_downmix_averages_channels() {
        let mono: Vec<f32> = downmix(&[1.0, 3.0, -1.0, 1.0, 9.0], 2).collect();
        assert_eq!(mono, vec![2.0, 0.0]);
        let same: Vec<f32> = downmix(&[0.5, 0.25], 1).collect();
        assert_eq!(same, vec![0.5, 0.25]);
    }
}
