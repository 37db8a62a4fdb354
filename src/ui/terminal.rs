//! Full-screen spectrogram terminal interface.
//!
//! Presents the engine's raster through [`SpectrogramView`], shows a one-line
//! status footer and translates key presses into [`SpectrogramCommand`]s.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, WindowSize},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::io::{stdout, Stdout};
use std::time::Duration;

use super::view::SpectrogramView;
use crate::spectrogram::{
    ColorScheme, EngineState, EngineStatus, GridLine, PixelRaster, Sensitivity, SurfaceSize,
};

const FOOTER_HEIGHT: u16 = 1;
const FOOTER_FG: Color = Color::Rgb(185, 207, 212);
const KEY_HINT: &str = "space start/stop  c scheme  +/- sensitivity  r reset  q quit";

/// User input command while the spectrogram is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrogramCommand {
    /// No key pressed, or an unbound key
    Continue,
    /// Start if idle, stop if running (Space)
    ToggleRunning,
    /// Switch between grayscale and heatmap ('c')
    ToggleScheme,
    /// Raise sensitivity one step ('+' or Up)
    SensitivityUp,
    /// Lower sensitivity one step ('-' or Down)
    SensitivityDown,
    /// Re-initialize after a failure ('r')
    Reinitialize,
    /// Leave the spectrogram (Escape, 'q' or Ctrl+C)
    Quit,
}

/// Everything the footer shows for one frame.
#[derive(Debug, Clone)]
pub struct StatusLine<'a> {
    pub status: &'a EngineStatus,
    pub scheme: ColorScheme,
    pub sensitivity: Sensitivity,
    /// Time spent running, excluding stopped spans
    pub elapsed: Duration,
    /// Short description of the analysis source
    pub source: &'a str,
}

pub struct SpectrogramTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl SpectrogramTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    /// - If the terminal cannot be initialized
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;

        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Pixel size of the spectrogram area, with configured dimensions taking
    /// precedence. Zero dimensions are left for the engine's fallback.
    pub fn viewport(&self, configured: SurfaceSize) -> SurfaceSize {
        let window = crossterm::terminal::window_size()
            .map_err(|e| tracing::debug!("Terminal pixel size unavailable: {e}"))
            .ok();
        merge_viewport(configured, window)
    }

    /// Draws the raster with its overlays and the status footer.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(
        &mut self,
        raster: &PixelRaster,
        grid_lines: &[GridLine],
        placeholder: &[String],
        line: &StatusLine<'_>,
    ) -> anyhow::Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();
            let content_area = Rect {
                height: area.height.saturating_sub(FOOTER_HEIGHT),
                ..area
            };
            let footer_area = Rect {
                y: area.y + content_area.height,
                height: area.height - content_area.height,
                ..area
            };

            frame.render_widget(
                SpectrogramView::new(raster, grid_lines).placeholder(placeholder),
                content_area,
            );

            let [status_area, hint_area] = Layout::horizontal([
                Constraint::Min(0),
                Constraint::Length(KEY_HINT.len() as u16 + 1),
            ])
            .areas(footer_area);

            let base = Style::default().fg(FOOTER_FG).bg(Color::Rgb(0, 0, 0));
            frame.render_widget(Paragraph::new(footer_line(line)).style(base), status_area);
            frame.render_widget(
                Paragraph::new(KEY_HINT)
                    .alignment(Alignment::Right)
                    .style(base.fg(Color::DarkGray)),
                hint_area,
            );
        })?;
        Ok(())
    }

    /// Drains one pending terminal event without blocking.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> anyhow::Result<SpectrogramCommand> {
        if event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                let command = command_for_key(key);
                if command != SpectrogramCommand::Continue {
                    tracing::debug!("Key {:?} -> {:?}", key.code, command);
                }
                return Ok(command);
            }
        }
        Ok(SpectrogramCommand::Continue)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for SpectrogramTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

pub fn command_for_key(key: KeyEvent) -> SpectrogramCommand {
    if key.kind != KeyEventKind::Press {
        return SpectrogramCommand::Continue;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            SpectrogramCommand::Quit
        }
        KeyCode::Char('q') | KeyCode::Esc => SpectrogramCommand::Quit,
        KeyCode::Char(' ') => SpectrogramCommand::ToggleRunning,
        KeyCode::Char('c') => SpectrogramCommand::ToggleScheme,
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => SpectrogramCommand::SensitivityUp,
        KeyCode::Char('-') | KeyCode::Down => SpectrogramCommand::SensitivityDown,
        KeyCode::Char('r') => SpectrogramCommand::Reinitialize,
        _ => SpectrogramCommand::Continue,
    }
}

/// Combines configured raster dimensions with the terminal's pixel size.
///
/// The footer row is subtracted from the pixel height. Terminals that do not
/// report pixels yield zero, which the engine replaces with its fallback.
fn merge_viewport(configured: SurfaceSize, window: Option<WindowSize>) -> SurfaceSize {
    let (width, height) = match window {
        Some(w) if w.rows > FOOTER_HEIGHT => {
            let content_rows = (w.rows - FOOTER_HEIGHT) as usize;
            (
                w.width as usize,
                w.height as usize * content_rows / w.rows as usize,
            )
        }
        _ => (0, 0),
    };
    SurfaceSize::new(
        if configured.width > 0 { configured.width } else { width },
        if configured.height > 0 { configured.height } else { height },
    )
}

/// Badge text and style for the controller state.
pub fn status_badge(status: &EngineStatus) -> (String, Style) {
    let style = Style::default().fg(Color::Rgb(0, 0, 0));
    match (status.state, &status.diagnostic) {
        (EngineState::Failed, Some(diagnostic)) => (
            diagnostic.category.to_string(),
            style.fg(Color::Rgb(255, 255, 255)).bg(Color::Red),
        ),
        (EngineState::Failed, None) => (
            status.state.to_string(),
            style.fg(Color::Rgb(255, 255, 255)).bg(Color::Red),
        ),
        (EngineState::Uninitialized, _) => (status.state.to_string(), style.bg(Color::Gray)),
        (EngineState::Idle, _) => (status.state.to_string(), style.bg(Color::Rgb(120, 160, 220))),
        (EngineState::Running, _) => (status.state.to_string(), style.bg(Color::Rgb(120, 200, 120))),
    }
}

/// Formats a duration as `HH:MM:SS`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn footer_line<'a>(line: &StatusLine<'a>) -> Line<'a> {
    let (badge, badge_style) = status_badge(line.status);
    let mut spans = vec![
        Span::styled(format!(" {badge} "), badge_style),
        Span::raw(format!(" {} ", format_elapsed(line.elapsed))),
        Span::raw(format!("/ {} / {} / ", line.scheme, line.sensitivity)),
        Span::raw(line.source),
    ];
    if let Some(diagnostic) = &line.status.diagnostic {
        spans.push(Span::styled(
            format!("  {}", diagnostic.message),
            Style::default().fg(Color::Red),
        ));
    }
    Line::from(spans)
}
