//! WAV file playback source.
//!
//! Decodes the whole file up front (hound), downmixes to mono and then walks
//! through it at real-time pace while the engine runs. Playback is silent;
//! only the spectrum is shown.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::analyser::{AnalyserConfig, SpectrumAnalyser};
use super::clock::PlaybackClock;
use super::downmix;
use crate::spectrogram::{AnalysisSource, MagnitudeFrame, SourceError, SourceInfo};

/// Decoded mono audio.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Reads a PCM or float WAV file and downmixes it to mono `f32`.
///
/// # Errors
/// - If the file cannot be opened or is not a valid WAV file
/// - If a sample cannot be decoded
pub fn decode_wav(path: &Path) -> Result<DecodedAudio> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to decode float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1) as u32)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Failed to decode integer samples")?
        }
    };

    let samples: Vec<f32> = downmix(&interleaved, channels).collect();
    tracing::info!(
        "Decoded {}: {} samples at {}Hz ({} channels, {}-bit)",
        path.display(),
        samples.len(),
        spec.sample_rate,
        channels,
        spec.bits_per_sample
    );

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Spectrum source that plays a WAV file.
pub struct WavPlayback {
    path: PathBuf,
    config: AnalyserConfig,
    audio: Option<DecodedAudio>,
    analyser: SpectrumAnalyser,
    clock: PlaybackClock,
    last_position: Option<usize>,
}

impl WavPlayback {
    pub fn new(path: PathBuf, config: AnalyserConfig) -> Self {
        Self {
            path,
            config,
            audio: None,
            analyser: SpectrumAnalyser::new(config),
            clock: PlaybackClock::new(),
            last_position: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Playback position in seconds and total duration, once decoded.
    pub fn progress(&self) -> Option<(f32, f32)> {
        let audio = self.audio.as_ref()?;
        let total = audio.duration_secs();
        let played = self.clock.elapsed().as_secs_f32().min(total);
        Some((played, total))
    }

    /// Analyses the window ending at `position`, or `None` past the end.
    pub(crate) fn frame_at(&mut self, position: usize) -> Option<MagnitudeFrame> {
        let audio = self.audio.as_ref()?;
        if position >= audio.samples.len() {
            return None;
        }
        let end = position + 1;
        let start = end.saturating_sub(self.config.fft_size);
        Some(self.analyser.analyse(&audio.samples[start..end]))
    }
}

impl AnalysisSource for WavPlayback {
    fn connect(&mut self) -> Result<SourceInfo, SourceError> {
        let audio = decode_wav(&self.path)?;
        if audio.samples.is_empty() {
            return Err(SourceError::from(anyhow!(
                "{} contains no audio",
                self.path.display()
            )));
        }
        let nyquist = audio.sample_rate as f32 / 2.0;
        self.audio = Some(audio);

        Ok(SourceInfo {
            bin_count: self.config.bin_count(),
            nyquist_hz: Some(nyquist),
        })
    }

    fn poll_frame(&mut self) -> Option<MagnitudeFrame> {
        let sample_rate = self.audio.as_ref()?.sample_rate;
        let position = self.clock.position(sample_rate);
        if self.last_position == Some(position) {
            return None;
        }
        self.last_position = Some(position);
        self.frame_at(position)
    }

    fn resume(&mut self) {
        self.clock.resume();
    }

    fn pause(&mut self) {
        self.clock.pause();
    }

    fn is_exhausted(&self) -> bool {
        match &self.audio {
            Some(audio) => self.clock.position(audio.sample_rate) >= audio.samples.len(),
            None => false,
        }
    }
}
