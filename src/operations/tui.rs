use crate::error::{AppError, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::{Constraint, Direction, Layout, Rect};
use std::io::{self, Stdout};

pub type Term = ratatui::Terminal<CrosstermBackend<Stdout>>;

pub fn terminal_error(context: &'static str) -> impl Fn(io::Error) -> AppError {
    move |e| AppError::Internal(format!("{}: {}", context, e))
}

/// Runs `body` on the alternate screen and restores the terminal afterwards,
/// even when `body` fails.
pub fn run_in_terminal<F>(body: F) -> Result<()>
where
    F: FnOnce(&mut Term) -> Result<()>,
{
    enable_raw_mode().map_err(terminal_error("Failed to enable raw mode"))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)
        .map_err(terminal_error("Failed to enter alternate screen"))?;

    let backend = CrosstermBackend::new(stdout);
    let result = ratatui::Terminal::new(backend)
        .map_err(terminal_error("Failed to initialize terminal"))
        .and_then(|mut terminal| body(&mut terminal));

    disable_raw_mode().map_err(terminal_error("Failed to disable raw mode"))?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen)
        .map_err(terminal_error("Failed to leave alternate screen"))?;

    result
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
