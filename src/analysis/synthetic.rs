//! Synthetic sweep source for running without audio hardware.

use std::f64::consts::TAU;

use super::analyser::{AnalyserConfig, SpectrumAnalyser};
use super::clock::PlaybackClock;
use crate::spectrogram::{AnalysisSource, MagnitudeFrame, SourceError, SourceInfo};

const SAMPLE_RATE: u32 = 44_100;
const SWEEP_START_HZ: f64 = 100.0;
const SWEEP_END_HZ: f64 = 8_000.0;
const SWEEP_SECONDS: f64 = 6.0;
const PILOT_HZ: f64 = 1_000.0;

/// Exponential sine sweep with a half-level second harmonic and a pulsing
/// 1 kHz pilot tone, repeating every few seconds.
pub struct SweepSource {
    config: AnalyserConfig,
    analyser: SpectrumAnalyser,
    clock: PlaybackClock,
    scratch: Vec<f32>,
    last_position: Option<usize>,
}

impl SweepSource {
    pub fn new(config: AnalyserConfig) -> Self {
        Self {
            config,
            analyser: SpectrumAnalyser::new(config),
            clock: PlaybackClock::new(),
            scratch: Vec::with_capacity(config.fft_size),
            last_position: None,
        }
    }

    /// Value of the synthesized signal at sample index `n`.
    pub fn sample(n: usize) -> f32 {
        let t = n as f64 / SAMPLE_RATE as f64;
        let local = t % SWEEP_SECONDS;
        let k = (SWEEP_END_HZ / SWEEP_START_HZ).ln() / SWEEP_SECONDS;
        let phase = TAU * SWEEP_START_HZ * ((k * local).exp() - 1.0) / k;

        let sweep = 0.4 * phase.sin() + 0.2 * (2.0 * phase).sin();
        let pilot_on = (t.fract() < 0.25) as u8 as f64;
        let pilot = 0.1 * pilot_on * (TAU * PILOT_HZ * t).sin();

        (sweep + pilot) as f32
    }

    fn frame_at(&mut self, position: usize) -> MagnitudeFrame {
        let start = position.saturating_sub(self.config.fft_size);
        self.scratch.clear();
        self.scratch.extend((start..position).map(Self::sample));
        self.analyser.analyse(&self.scratch)
    }
}

impl AnalysisSource for SweepSource {
    fn connect(&mut self) -> Result<SourceInfo, SourceError> {
        tracing::info!(
            "Synthetic sweep {}-{} Hz over {}s at {}Hz",
            SWEEP_START_HZ,
            SWEEP_END_HZ,
            SWEEP_SECONDS,
            SAMPLE_RATE
        );
        Ok(SourceInfo {
            bin_count: self.config.bin_count(),
            nyquist_hz: Some(SAMPLE_RATE as f32 / 2.0),
        })
    }

    fn poll_frame(&mut self) -> Option<MagnitudeFrame> {
        let position = self.clock.position(SAMPLE_RATE);
        if self.last_position == Some(position) {
            return None;
        }
        self.last_position = Some(position);
        Some(self.frame_at(position))
    }

    fn resume(&mut self) {
        self.clock.resume();
    }

    fn pause(&mut self) {
        self.clock.pause();
    }
}
