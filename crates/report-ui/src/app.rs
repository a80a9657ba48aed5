//! Interactive preview of a finished attendance report.
//!
//! [`App`] owns the theme and drives a static view that stays on screen
//! until the user presses `q` or `Ctrl+C`.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};

use crate::summary_view::{self, SummaryViewData};
use crate::themes::Theme;

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the report preview.
pub struct App {
    /// Active colour theme.
    pub theme: Theme,
}

impl App {
    /// Construct a preview with the named theme (`dark`, `light`, `classic`
    /// or anything else for auto-detection).
    pub fn new(theme_name: &str) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
        }
    }

    /// Show `data` full-screen, then wait for `q` / `Ctrl+C`.
    pub async fn run_preview(self, data: SummaryViewData) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame, &data)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if is_quit_key(&key) => break Ok(()),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame, data: &SummaryViewData) {
        let area = frame.area();
        if data.is_empty() {
            summary_view::render_no_data(frame, area, &self.theme);
        } else {
            summary_view::render_summary_view(frame, area, data, &self.theme);
        }
    }
}

fn is_quit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        _ => false,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
