//! Full-screen error display used before the spectrogram can be shown.
//!
//! Configuration and terminal problems end up here; engine failures during a
//! session are shown in the spectrogram footer instead.

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::time::Duration;

const ERROR_BG: Color = Color::Rgb(120, 0, 0);

pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl ErrorScreen {
    /// Creates a new error screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Shows `title` and `message` in a centered box until a key is pressed.
    ///
    /// # Errors
    /// - If terminal rendering or event polling fails
    pub fn show_error(&mut self, title: &str, message: &str) -> anyhow::Result<()> {
        let text = error_text(message);
        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                frame.render_widget(Block::default().style(Style::default().bg(ERROR_BG)), area);

                let dialog = centered(area, 80, text.lines.len() as u16 + 4);
                let paragraph = Paragraph::new(text.clone())
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .title(format!(" {title} "))
                            .title_alignment(Alignment::Center),
                    )
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true })
                    .style(Style::default().fg(Color::White).bg(ERROR_BG));
                frame.render_widget(paragraph, dialog);
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        break;
                    }
                }
            }
        }

        Ok(())
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

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Message lines followed by a blank line and the dismiss hint.
fn error_text(message: &str) -> Text<'static> {
    let mut lines: Vec<Line> = message
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Press any key to exit",
        Style::default().add_modifier(Modifier::DIM),
    )));
    Text::from(lines)
}

/// Rectangle `percent_x` percent wide and `height` rows tall, centered in `area`.
fn centered(area: Rect, percent_x: u16, height: u16) -> Rect {
    let width = area.width * percent_x / 100;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_text_appends_hint() {
        let text = error_text("line one\nline two");
        assert_eq!(text.lines.len(), 4);
        assert_eq!(text.lines[1].to_string(), "line two");
        assert_eq!(text.lines[3].to_string(), "Press any key to exit");
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(centered(area, 80, 6), Rect::new(10, 17, 80, 6));
        assert_eq!(centered(Rect::new(0, 0, 10, 3), 80, 6), Rect::new(1, 0, 8, 3));
    }
}
