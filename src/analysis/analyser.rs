//! FFT magnitude analyser producing normalized frames.
//!
//! Blackman window, per-bin temporal smoothing, then decibels mapped linearly
//! from `[min_db, max_db]` onto `[0, 1]`.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::spectrogram::MagnitudeFrame;

/// Analyser settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserConfig {
    /// FFT length, a power of two. Frames have `fft_size / 2` bins.
    pub fft_size: usize,
    /// Weight of the previous frame, in `[0, 1)`.
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyserConfig {
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Stateful analyser; keeps the smoothed spectrum between calls.
pub struct SpectrumAnalyser {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyser {
    pub fn new(config: AnalyserConfig) -> Self {
        let n = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);

        Self {
            config,
            fft,
            window: blackman(n),
            buffer: vec![Complex::new(0.0, 0.0); n],
            smoothed: vec![0.0; n / 2],
        }
    }

    pub fn bin_count(&self) -> usize {
        self.config.bin_count()
    }

    /// Analyses the most recent `fft_size` samples (zero-padded in front if short).
    pub fn analyse(&mut self, samples: &[f32]) -> MagnitudeFrame {
        let n = self.config.fft_size;
        let take = samples.len().min(n);
        let recent = &samples[samples.len() - take..];
        let pad = n - take;

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = if i < pad { 0.0 } else { recent[i - pad] };
            *slot = Complex::new(s * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let tau = self.config.smoothing;
        let min_db = self.config.min_db;
        let range = self.config.max_db - min_db;
        let scale = 1.0 / n as f32;

        let bins = self
            .smoothed
            .iter_mut()
            .zip(self.buffer.iter())
            .map(|(prev, x)| {
                let magnitude = x.norm() * scale;
                *prev = tau * *prev + (1.0 - tau) * magnitude;

                let db = if *prev > 0.0 {
                    20.0 * prev.log10()
                } else {
                    f32::NEG_INFINITY
                };
                ((db - min_db) / range).clamp(0.0, 1.0)
            })
            .collect();

        MagnitudeFrame::new(bins)
    }
}

fn blackman(n: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    let two_pi = 2.0 * std::f32::consts::PI;

    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (two_pi * x).cos() + a2 * (2.0 * two_pi * x).cos()
        })
        .collect()
}
