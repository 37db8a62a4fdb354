//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands::{self, SessionOptions, SourceSpec};
use crate::logging;
use crate::spectrogram::ColorScheme;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// A scrolling real-time spectrogram for the terminal
#[derive(Parser)]
#[command(name = "spectroscroll")]
#[command(version)]
#[command(about = "A scrolling real-time spectrogram for the terminal")]
#[command(long_about = "A scrolling real-time spectrogram for the terminal.\n\nEach display frame the newest spectrum is painted as a column at the right edge\nand older columns scroll left. Low frequencies are at the bottom.\n\nDEFAULT COMMAND:\n    If no command is specified, 'run' is used by default.\n\nKEYS:\n    Space      start / stop\n    c          toggle grayscale / heatmap\n    + / Up     raise sensitivity\n    - / Down   lower sensitivity\n    r          re-initialize after an error\n    q / Esc    quit\n\nEXAMPLES:\n    # Live spectrogram from the default input device\n    $ spectroscroll\n\n    # Use input device #2 with the heatmap palette, start immediately\n    $ spectroscroll run -d 2 --scheme heatmap --start\n\n    # Spectrogram of a WAV file\n    $ spectroscroll play birdsong.wav\n\n    # Synthetic sweep, no audio hardware needed\n    $ spectroscroll demo")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/spectroscroll/spectroscroll.toml\n    Logs:               ~/.local/state/spectroscroll/spectroscroll.log.*"
)]
struct Cli {
    /// Color scheme for this session (overrides the config file)
    #[arg(long, value_enum, global = true)]
    scheme: Option<ColorScheme>,

    /// Initial sensitivity, 0.5 to 5.0 (overrides the config file)
    #[arg(long, value_name = "X", global = true)]
    sensitivity: Option<f32>,

    /// Begin scrolling immediately instead of waiting for Space
    #[arg(long, global = true)]
    start: bool,

    /// Audio input device: "default", an index or a name (run default command)
    #[arg(short, long, value_name = "DEVICE")]
    device: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Live spectrogram from an audio input device (default)
    #[command(visible_alias = "r")]
    Run {
        /// Audio input device: "default", an index or a name from list-devices
        #[arg(short, long, value_name = "DEVICE")]
        device: Option<String>,
    },

    /// Spectrogram of a WAV file, paced at real time
    ///
    /// Playback is silent; only the spectrum is shown. The engine stops when
    /// the end of the file is reached.
    #[command(visible_alias = "p")]
    Play {
        /// Path to the WAV file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Spectrogram of a synthetic frequency sweep
    ///
    /// Useful to try the display without any audio hardware.
    Demo,

    /// Open configuration file in your preferred editor
    ///
    /// Writes a default file first if none exists.
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the input device in spectroscroll.toml or with --device.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   spectroscroll completions bash > spectroscroll.bash
    ///   spectroscroll completions zsh > _spectroscroll
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that don't need logging
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "spectroscroll", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return exit_on_error(commands::handle_list_devices());
        }
        Some(Commands::Logs) => {
            return exit_on_error(commands::handle_logs());
        }
        _ => {}
    }

    logging::init_logging()?;

    let options = SessionOptions {
        scheme: cli.scheme,
        sensitivity: cli.sensitivity,
        autostart: cli.start,
    };

    match cli.command {
        None => {
            commands::handle_run(SourceSpec::Live { device: cli.device }, options).await?;
        }
        Some(Commands::Run { device }) => {
            // An explicit subcommand flag wins over the top-level one
            let device = device.or(cli.device);
            commands::handle_run(SourceSpec::Live { device }, options).await?;
        }
        Some(Commands::Play { file }) => {
            commands::handle_run(SourceSpec::File(file), options).await?;
        }
        Some(Commands::Demo) => {
            commands::handle_run(SourceSpec::Demo, options).await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}

fn exit_on_error(result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
    Ok(())
}
