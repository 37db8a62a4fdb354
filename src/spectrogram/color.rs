//! Intensity-to-color mapping for spectrogram columns.
//!
//! Two schemes are supported: a black-to-white grayscale ramp and a
//! blue→cyan→red heatmap. Both are pure functions of a normalized intensity.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A 24-bit RGB pixel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear blend towards `other`; `t = 0` keeps `self`, `t = 1` yields `other`.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl From<Rgb> for ratatui::style::Color {
    fn from(c: Rgb) -> Self {
        ratatui::style::Color::Rgb(c.r, c.g, c.b)
    }
}

/// Active color scheme for the spectrogram.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    /// Black to white ramp
    #[default]
    Grayscale,
    /// Blue through cyan to red
    Heatmap,
}

impl ColorScheme {
    /// Returns the other scheme.
    pub fn toggled(self) -> Self {
        match self {
            Self::Grayscale => Self::Heatmap,
            Self::Heatmap => Self::Grayscale,
        }
    }
}

impl std::fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grayscale => write!(f, "grayscale"),
            Self::Heatmap => write!(f, "heatmap"),
        }
    }
}

/// Returned when a scheme name is not one of the known variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color scheme '{0}' (expected 'grayscale' or 'heatmap')")]
pub struct UnknownScheme(pub String);

impl FromStr for ColorScheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grayscale" | "greyscale" => Ok(Self::Grayscale),
            "heatmap" => Ok(Self::Heatmap),
            _ => Err(UnknownScheme(s.to_string())),
        }
    }
}

/// Maps a normalized intensity to a color.
///
/// Values outside `[0, 1]` are clamped rather than rejected, and NaN is
/// treated as silence.
pub fn map_intensity(value: f32, scheme: ColorScheme) -> Rgb {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };

    match scheme {
        ColorScheme::Grayscale => {
            let c = to_channel(v);
            Rgb::new(c, c, c)
        }
        ColorScheme::Heatmap => Rgb::new(
            to_channel(v),
            to_channel(1.0 - (v - 0.5).abs() * 2.0),
            to_channel(1.0 - v),
        ),
    }
}

#[inline]
fn to_channel(x: f32) -> u8 {
    (x * 255.0).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> impl Iterator<Item = f32> {
        (0..=200).map(|i| i as f32 / 200.0)
    }

    #[test]
    fn test_grayscale_is_monotonic_and_neutral() {
        let mut prev = map_intensity(0.0, ColorScheme::Grayscale);
        for v in samples() {
            let c = map_intensity(v, ColorScheme::Grayscale);
            assert_eq!(c.r, c.g);
            assert_eq!(c.g, c.b);
            assert!(c.r >= prev.r);
            prev = c;
        }
        assert_eq!(map_intensity(0.0, ColorScheme::Grayscale), Rgb::BLACK);
        assert_eq!(map_intensity(1.0, ColorScheme::Grayscale), Rgb::WHITE);
    }

    #[test]
    fn test_heatmap_green_peaks_at_midpoint() {
        let mid = map_intensity(0.5, ColorScheme::Heatmap);
        assert_eq!(mid.g, 255);
        assert!(map_intensity(0.0, ColorScheme::Heatmap).g < mid.g);
        assert!(map_intensity(1.0, ColorScheme::Heatmap).g < mid.g);
        for v in samples() {
            assert!(map_intensity(v, ColorScheme::Heatmap).g <= mid.g);
        }
    }

    #[test]
    fn test_heatmap_red_rises_blue_falls() {
        let mut prev = map_intensity(0.0, ColorScheme::Heatmap);
        for v in samples().skip(1) {
            let c = map_intensity(v, ColorScheme::Heatmap);
            assert!(c.r >= prev.r);
            assert!(c.b <= prev.b);
            prev = c;
        }
        assert_eq!(map_intensity(0.0, ColorScheme::Heatmap), Rgb::new(0, 0, 255));
        assert_eq!(map_intensity(1.0, ColorScheme::Heatmap), Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        for scheme in [ColorScheme::Grayscale, ColorScheme::Heatmap] {
            assert_eq!(map_intensity(-0.5, scheme), map_intensity(0.0, scheme));
            assert_eq!(map_intensity(1.5, scheme), map_intensity(1.0, scheme));
            assert_eq!(map_intensity(f32::NAN, scheme), map_intensity(0.0, scheme));
            assert_eq!(map_intensity(0.37, scheme), map_intensity(0.37, scheme));
        }
    }

    #[test]
    fn test_scheme_parsing_and_toggle() {
        assert_eq!("heatmap".parse::<ColorScheme>(), Ok(ColorScheme::Heatmap));
        assert_eq!(" Grayscale ".parse::<ColorScheme>(), Ok(ColorScheme::Grayscale));
        assert!("rainbow".parse::<ColorScheme>().is_err());
        assert_eq!(ColorScheme::Grayscale.toggled(), ColorScheme::Heatmap);
        assert_eq!(ColorScheme::Heatmap.toggled().to_string(), "grayscale");
    }
}
