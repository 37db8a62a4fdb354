//! Live audio input via cpal.
//!
//! The cpal callback runs on the audio thread and only appends mono samples to
//! a shared [`SampleHistory`]. Frames are computed on the engine's thread when
//! polled, and polling never waits on the audio thread.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::{Arc, Mutex};

use super::analyser::{AnalyserConfig, SpectrumAnalyser};
use super::{downmix, SampleHistory};
use crate::spectrogram::{AnalysisSource, MagnitudeFrame, SourceError, SourceInfo};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Spectrum source fed by an audio input device.
///
/// Features:
/// - Uses a named, indexed, or default input device at its native sample rate
/// - Converts multi-channel input to mono by averaging channels
/// - Pause and resume without tearing down the stream
pub struct LiveInput {
    /// Device name, numeric index, or "default"
    device_name: String,
    config: AnalyserConfig,
    history: Arc<Mutex<SampleHistory>>,
    is_paused: Arc<Mutex<bool>>,
    /// Active input stream (kept alive while connected)
    stream: Option<cpal::Stream>,
    analyser: SpectrumAnalyser,
    scratch: Vec<f32>,
    sample_rate: u32,
}

impl LiveInput {
    pub fn new(device_name: String, config: AnalyserConfig) -> Self {
        Self {
            device_name,
            config,
            history: Arc::new(Mutex::new(SampleHistory::new(config.fft_size))),
            is_paused: Arc::new(Mutex::new(true)),
            stream: None,
            analyser: SpectrumAnalyser::new(config),
            scratch: Vec::with_capacity(config.fft_size),
            sample_rate: 0,
        }
    }

    /// Opens the device and starts the input stream.
    ///
    /// # Errors
    /// - If the specified device is not available
    /// - If the device configuration cannot be read
    /// - If the sample format is unsupported or stream creation fails
    fn open_stream(&mut self) -> Result<SourceInfo> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device_by_name(&host, &self.device_name)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Input device: {}", device_name);

        let device_config = device.default_input_config()?;
        let sample_format = device_config.sample_format();
        let sample_rate = device_config.sample_rate().0;
        let channels = device_config.channels() as usize;

        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}",
            sample_rate,
            channels,
            sample_format
        );

        let stream_config: cpal::StreamConfig = device_config.into();
        let stream = build_stream(
            &device,
            &stream_config,
            sample_format,
            channels,
            Arc::clone(&self.history),
            Arc::clone(&self.is_paused),
        )?;

        stream.play()?;
        self.stream = Some(stream);
        self.sample_rate = sample_rate;

        tracing::debug!("Audio stream started");
        Ok(SourceInfo {
            bin_count: self.config.bin_count(),
            nyquist_hz: Some(sample_rate as f32 / 2.0),
        })
    }

    /// Returns the device sample rate, or 0 before connecting.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl AnalysisSource for LiveInput {
    fn connect(&mut self) -> Result<SourceInfo, SourceError> {
        self.open_stream().map_err(|e| {
            tracing::error!("Failed to open audio input: {e:#}");
            SourceError::from(e)
        })
    }

    fn poll_frame(&mut self) -> Option<MagnitudeFrame> {
        // The audio thread may hold the lock; treat that as "no frame yet"
        let fresh = match self.history.try_lock() {
            Ok(mut history) => history.take_snapshot(&mut self.scratch),
            Err(_) => false,
        };
        if !fresh {
            return None;
        }
        Some(self.analyser.analyse(&self.scratch))
    }

    fn resume(&mut self) {
        if let Ok(mut paused) = self.is_paused.lock() {
            *paused = false;
        }
        tracing::debug!("Input resumed");
    }

    fn pause(&mut self) {
        if let Ok(mut paused) = self.is_paused.lock() {
            *paused = true;
        }
        tracing::debug!("Input paused");
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: SampleFormat,
    channels: usize,
    history: Arc<Mutex<SampleHistory>>,
    is_paused: Arc<Mutex<bool>>,
) -> Result<cpal::Stream> {
    let err_fn = |err| tracing::error!("Audio stream error: {}", err);

    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                push_samples(data, channels, &history, &is_paused);
            },
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let converted: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                push_samples(&converted, channels, &history, &is_paused);
            },
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let converted: Vec<f32> = data
                    .iter()
                    .map(|&s| (s as f32 - 32768.0) / 32768.0)
                    .collect();
                push_samples(&converted, channels, &history, &is_paused);
            },
            err_fn,
            None,
        )?,
        other => return Err(anyhow!("Unsupported sample format: {other:?}")),
    };

    Ok(stream)
}

/// Audio-thread side: downmix and append unless paused.
fn push_samples(
    data: &[f32],
    channels: usize,
    history: &Arc<Mutex<SampleHistory>>,
    is_paused: &Arc<Mutex<bool>>,
) {
    if is_paused.lock().map(|p| *p).unwrap_or(true) {
        return;
    }
    if let Ok(mut history) = history.lock() {
        history.extend(downmix(data, channels));
    }
}

/// Finds an audio input device by name or numeric index.
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    if let Ok(index) = device_spec.parse::<usize>() {
        let devices: Vec<_> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
            .collect();
        let count = devices.len();

        return devices.into_iter().nth(index).ok_or_else(|| {
            anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            )
        });
    }

    let devices = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?;

    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_spec {
                return Ok(device);
            }
        }
    }

    Err(anyhow!(
        "Audio input device '{device_spec}' not found. Use 'spectroscroll list-devices' to see available devices."
    ))
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let dev_null_fd = dev_null.as_raw_fd();

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
