//! Configuration file management for spectroscroll.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory. A missing file means
//! defaults; a present but invalid file is an error.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::AnalyserConfig;
use crate::spectrogram::axis::{DEFAULT_LABELS, DEFAULT_MARGIN, DEFAULT_MAX_FREQ};
use crate::spectrogram::sensitivity::DEFAULT_SENSITIVITY;
use crate::spectrogram::{ColorScheme, EngineSettings, FrequencyAxis, Sensitivity, SurfaceSize};

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32_768;

/// Raster and color settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Raster width in pixels (0 = use the terminal's pixel size, falling back to 800)
    pub width: usize,
    /// Raster height in pixels (0 = use the terminal's pixel size, falling back to 400)
    pub height: usize,
    /// Width of the left label strip in pixels
    pub margin: usize,
    /// Initial color scheme: "grayscale" or "heatmap"
    pub color_scheme: ColorScheme,
    /// Initial sensitivity, clamped to 0.5-5.0
    pub sensitivity: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            margin: DEFAULT_MARGIN,
            color_scheme: ColorScheme::default(),
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }
}

/// Frequency axis settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AxisConfig {
    /// Frequency shown at the top edge, in Hz
    pub max_freq: f32,
    /// Frequencies that get a label and gridline, in Hz
    pub labels: Vec<f32>,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            max_freq: DEFAULT_MAX_FREQ,
            labels: DEFAULT_LABELS.to_vec(),
        }
    }
}

/// Audio input and analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `spectroscroll list-devices`
    /// - device name from `spectroscroll list-devices`
    pub device: String,
    /// FFT length (power of two); frames carry fft_size / 2 bins
    pub fft_size: usize,
    /// Temporal smoothing between frames, 0.0 (none) to just below 1.0
    pub smoothing: f32,
    /// Level mapped to zero intensity, in dBFS
    pub min_db: f32,
    /// Level mapped to full intensity, in dBFS
    pub max_db: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let analyser = AnalyserConfig::default();
        Self {
            device: "default".to_string(),
            fft_size: analyser.fft_size,
            smoothing: analyser.smoothing,
            min_db: analyser.min_db,
            max_db: analyser.max_db,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectroConfig {
    pub display: DisplayConfig,
    pub axis: AxisConfig,
    pub audio: AudioConfig,
}

impl SpectroConfig {
    /// Loads configuration from the user's config directory, or defaults if
    /// no file exists yet.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed or fails validation
    pub fn load() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    /// Loads and validates configuration from an explicit path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    fn parse(content: &str) -> anyhow::Result<Self> {
        let config: SpectroConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    /// - If `fft_size` is not a power of two within range
    /// - If the dB range is empty or smoothing is outside `[0, 1)`
    /// - If `max_freq` is not positive
    pub fn validate(&self) -> anyhow::Result<()> {
        let audio = &self.audio;
        if !audio.fft_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&audio.fft_size)
        {
            return Err(anyhow!(
                "audio.fft_size must be a power of two between {MIN_FFT_SIZE} and {MAX_FFT_SIZE}, got {}",
                audio.fft_size
            ));
        }
        if !(audio.min_db < audio.max_db) {
            return Err(anyhow!(
                "audio.min_db ({}) must be below audio.max_db ({})",
                audio.min_db,
                audio.max_db
            ));
        }
        if !(0.0..1.0).contains(&audio.smoothing) {
            return Err(anyhow!(
                "audio.smoothing must be in [0, 1), got {}",
                audio.smoothing
            ));
        }
        if !(self.axis.max_freq > 0.0) {
            return Err(anyhow!(
                "axis.max_freq must be positive, got {}",
                self.axis.max_freq
            ));
        }
        Ok(())
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved to {}", config_path.display());
        Ok(())
    }

    pub fn analyser_config(&self) -> AnalyserConfig {
        AnalyserConfig {
            fft_size: self.audio.fft_size,
            smoothing: self.audio.smoothing,
            min_db: self.audio.min_db,
            max_db: self.audio.max_db,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            scheme: self.display.color_scheme,
            sensitivity: Sensitivity::new(self.display.sensitivity),
            axis: FrequencyAxis::new(0.0, self.axis.max_freq, self.axis.labels.clone()),
        }
    }

    /// Configured raster size; zero dimensions defer to the viewport.
    pub fn raster_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.display.width, self.display.height)
    }
}

/// Retrieves the path to the config file, creating its directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("spectroscroll");

    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow!("Failed to create config directory: {e}"))?;

    Ok(config_dir.join("spectroscroll.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = SpectroConfig::parse("").unwrap();
        assert_eq!(config, SpectroConfig::default());
        assert_eq!(config.display.margin, 50);
        assert_eq!(config.axis.labels, vec![0.0, 2500.0, 5000.0, 7500.0, 10000.0]);
        assert_eq!(config.analyser_config(), AnalyserConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_fields() {
        let config = SpectroConfig::parse(
            r#"
            [display]
            color_scheme = "heatmap"
            sensitivity = 9.0

            [audio]
            fft_size = 2048
            "#,
        )
        .unwrap();
        assert_eq!(config.display.color_scheme, ColorScheme::Heatmap);
        assert_eq!(config.audio.fft_size, 2048);
        assert_eq!(config.audio.device, "default");

        // Out-of-range sensitivity is clamped rather than rejected
        assert_eq!(config.engine_settings().sensitivity.value(), 5.0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(SpectroConfig::parse("[audio]\nfft_size = 1000").is_err());
        assert!(SpectroConfig::parse("[audio]\nfft_size = 16").is_err());
        assert!(SpectroConfig::parse("[audio]\nmin_db = -20.0\nmax_db = -30.0").is_err());
        assert!(SpectroConfig::parse("[audio]\nsmoothing = 1.0").is_err());
        assert!(SpectroConfig::parse("[axis]\nmax_freq = 0.0").is_err());
        assert!(SpectroConfig::parse("[display]\ncolor_scheme = \"rainbow\"").is_err());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = SpectroConfig::default();
        config.display.width = 640;
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(SpectroConfig::parse(&text).unwrap(), config);
        assert_eq!(config.raster_size(), SurfaceSize::new(640, 0));
    }
}
