//! Spectrogram session.
//!
//! Builds the analysis source for the chosen mode, then drives the engine
//! controller from a fixed-rate refresh loop: drain key presses, run the
//! scheduled tick, draw the frame.

use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::analysis::clock::PlaybackClock;
use crate::analysis::{LiveInput, SweepSource, WavPlayback};
use crate::config::SpectroConfig;
use crate::spectrogram::{
    AnalysisSource, ColorScheme, EngineController, EngineSettings, EngineState, PixelRaster,
    RasterSurface, Sensitivity, SurfaceSize, TickOutcome, SENSITIVITY_STEP,
};
use crate::ui::terminal::format_elapsed;
use crate::ui::{ErrorScreen, SpectrogramCommand, SpectrogramTui, StatusLine};

/// Display refresh period (about 60 frames per second).
const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Where the spectrum comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Audio input device; `None` uses the configured device
    Live { device: Option<String> },
    /// WAV file played back at real-time pace
    File(PathBuf),
    /// Synthetic sweep
    Demo,
}

/// Command-line overrides for a session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub scheme: Option<ColorScheme>,
    pub sensitivity: Option<f32>,
    /// Begin scrolling immediately instead of waiting for Space
    pub autostart: bool,
}

/// Runs an interactive spectrogram session until the user quits.
///
/// # Errors
/// - If the configuration is invalid (shown on an error screen first)
/// - If the terminal cannot be set up or drawn to
pub async fn handle_run(spec: SourceSpec, options: SessionOptions) -> anyhow::Result<()> {
    tracing::info!("=== spectroscroll session started ({:?}) ===", spec);

    let config = match SpectroConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err:#}");
            let message = format!(
                "{err:#}\n\nPlease check ~/.config/spectroscroll/spectroscroll.toml and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error("Configuration Error", &message)?;
            error_screen.cleanup()?;
            return Err(anyhow::anyhow!("Configuration error: {err:#}"));
        }
    };

    let settings = session_settings(&config, &options);
    let analyser = config.analyser_config();
    tracing::info!(
        "Settings: scheme={}, sensitivity={}, fft_size={}, max_freq={}Hz",
        settings.scheme,
        settings.sensitivity,
        analyser.fft_size,
        settings.axis.max_freq()
    );

    match spec {
        SourceSpec::Live { device } => {
            let device = device.unwrap_or_else(|| config.audio.device.clone());
            let source = LiveInput::new(device.clone(), analyser);
            run_session(source, &config, settings, options.autostart, move |input| {
                match input.sample_rate() {
                    0 => format!("input: {device}"),
                    rate => format!("input: {device} @ {rate}Hz"),
                }
            })
            .await
        }
        SourceSpec::File(path) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let source = WavPlayback::new(path, analyser);
            run_session(source, &config, settings, options.autostart, move |playback| {
                match playback.progress() {
                    Some((played, total)) => format!(
                        "{name} {} / {}",
                        format_elapsed(Duration::from_secs_f32(played)),
                        format_elapsed(Duration::from_secs_f32(total))
                    ),
                    None => name.clone(),
                }
            })
            .await
        }
        SourceSpec::Demo => {
            let source = SweepSource::new(analyser);
            run_session(source, &config, settings, options.autostart, |_| {
                "demo sweep".to_string()
            })
            .await
        }
    }
}

/// Engine settings from the config file with command-line overrides applied.
fn session_settings(config: &SpectroConfig, options: &SessionOptions) -> EngineSettings {
    let mut settings = config.engine_settings();
    if let Some(scheme) = options.scheme {
        settings.scheme = scheme;
    }
    if let Some(sensitivity) = options.sensitivity {
        settings.sensitivity = Sensitivity::new(sensitivity);
    }
    settings
}

async fn run_session<A, F>(
    source: A,
    config: &SpectroConfig,
    settings: EngineSettings,
    autostart: bool,
    describe: F,
) -> anyhow::Result<()>
where
    A: AnalysisSource,
    F: Fn(&A) -> String,
{
    let mut tui = SpectrogramTui::new()?;
    let viewport = tui.viewport(config.raster_size());
    tracing::debug!("Viewport: {}x{} px", viewport.width, viewport.height);

    let raster = PixelRaster::new(config.display.margin);
    let mut controller = EngineController::new(raster, source, settings);
    let mut show_placeholder = controller.initialize(viewport).is_ok();

    if autostart {
        apply_command(&mut controller, SpectrogramCommand::ToggleRunning, viewport);
    }

    let mut running_clock = PlaybackClock::new();
    let mut interval = tokio::time::interval(FRAME_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        loop {
            match tui.handle_input()? {
                SpectrogramCommand::Continue => break,
                SpectrogramCommand::Quit => {
                    controller.stop();
                    tui.cleanup()?;
                    tracing::info!(
                        "=== spectroscroll session ended: {} ticks, {} columns, {} dropped frames ===",
                        controller.tick_count(),
                        controller.columns_appended(),
                        controller.frames_dropped()
                    );
                    return Ok(());
                }
                command => {
                    let was_failed = controller.state() == EngineState::Failed;
                    apply_command(&mut controller, command, viewport);
                    // A successful re-initialize repaints the placeholder frame
                    if was_failed && controller.state() == EngineState::Idle {
                        show_placeholder = true;
                    }
                }
            }
        }

        if controller.on_display_frame() == Some(TickOutcome::Appended) {
            show_placeholder = false;
        }

        if controller.state() == EngineState::Running && controller.source().is_exhausted() {
            tracing::info!("Source exhausted, stopping");
            controller.stop();
        }

        if controller.state() == EngineState::Running {
            running_clock.resume();
        } else {
            running_clock.pause();
        }

        let status = controller.status();
        let source_label = describe(controller.source());
        let placeholder = if show_placeholder && status.state == EngineState::Idle {
            placeholder_lines(controller.engine().axis().max_freq())
        } else {
            Vec::new()
        };
        let line = StatusLine {
            status: &status,
            scheme: controller.engine().scheme(),
            sensitivity: controller.engine().sensitivity(),
            elapsed: running_clock.elapsed(),
            source: &source_label,
        };

        tui.render(
            controller.surface(),
            controller.engine().grid_lines(),
            &placeholder,
            &line,
        )?;
    }
}

/// Applies a key command to the controller. Quit is handled by the caller.
fn apply_command<S, A>(
    controller: &mut EngineController<S, A>,
    command: SpectrogramCommand,
    viewport: SurfaceSize,
) where
    S: RasterSurface,
    A: AnalysisSource,
{
    match command {
        SpectrogramCommand::ToggleRunning => {
            if controller.state() == EngineState::Running {
                controller.stop();
            } else if let Err(err) = controller.start() {
                tracing::debug!("Start rejected: {err}");
            }
        }
        SpectrogramCommand::ToggleScheme => {
            controller.toggle_color_scheme();
        }
        SpectrogramCommand::SensitivityUp => {
            controller.adjust_sensitivity(SENSITIVITY_STEP);
        }
        SpectrogramCommand::SensitivityDown => {
            controller.adjust_sensitivity(-SENSITIVITY_STEP);
        }
        SpectrogramCommand::Reinitialize => {
            if let Err(err) = controller.initialize(viewport) {
                tracing::debug!("Re-initialize failed: {err}");
            }
        }
        SpectrogramCommand::Continue | SpectrogramCommand::Quit => {}
    }
}

/// Message shown over the placeholder frame before the first column.
fn placeholder_lines(max_freq: f32) -> Vec<String> {
    vec![
        "Press Space to Start Live Spectrogram".to_string(),
        String::new(),
        format!("Frequencies will be displayed from 0-{} Hz", max_freq.round() as u32),
    ]
}
