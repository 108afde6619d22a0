use crate::error::Result;
use crate::models::bucket::Period;
use crate::models::dashboard::{BucketStatus, DashboardBucket};
use crate::operations::dashboard::build_dashboard;
use crate::operations::tui::{run_in_terminal, terminal_error};
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    prelude::{Alignment, Color, Constraint, Direction, Layout, Rect, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};
use rusqlite::Connection;

const ROW_HEIGHT: u16 = 3;

struct ReportState {
    buckets: Vec<DashboardBucket>,
    offset: usize,
    generated_at: String,
}

impl ReportState {
    fn load(conn: &Connection) -> Result<Self> {
        let now = Local::now().naive_local();
        Ok(Self {
            buckets: build_dashboard(conn, now)?,
            offset: 0,
            generated_at: now.format("%Y-%m-%d %H:%M").to_string(),
        })
    }

    fn scroll(&mut self, delta: i32) {
        let max_offset = self.buckets.len().saturating_sub(1) as i32;
        self.offset = (self.offset as i32 + delta).clamp(0, max_offset) as usize;
    }
}

/// Interactive dashboard: one gauge per bucket, coloured by pacing status.
pub fn run_report(conn: &Connection) -> Result<()> {
    let mut state = ReportState::load(conn)?;

    run_in_terminal(|terminal| {
        loop {
            terminal
                .draw(|frame| {
                    let layout = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([
                            Constraint::Length(3),
                            Constraint::Min(3),
                            Constraint::Length(2),
                        ])
                        .split(frame.area());

                    render_header(frame, layout[0], &state);
                    render_buckets(frame, layout[1], &state);
                    frame.render_widget(
                        Paragraph::new("↑/↓ scroll  r refresh  q/Esc exit")
                            .style(Style::default().fg(Color::DarkGray)),
                        layout[2],
                    );
                })
                .map_err(terminal_error("Failed to draw terminal UI"))?;

            if event::poll(std::time::Duration::from_millis(250))
                .map_err(terminal_error("Failed to poll input"))?
            {
                match event::read().map_err(terminal_error("Failed to read input"))? {
                    Event::Key(key) if key.kind == KeyEventKind::Release => {}
                    Event::Key(key) => match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Char('r') => state = ReportState::load(conn)?,
                        KeyCode::Up => state.scroll(-1),
                        KeyCode::Down => state.scroll(1),
                        _ => {}
                    },
                    _ => {}
                }
            }
        }

        Ok(())
    })
}

fn status_color(status: BucketStatus) -> Color {
    match status {
        BucketStatus::Good => Color::Green,
        BucketStatus::Warning => Color::Yellow,
        BucketStatus::Critical => Color::Red,
    }
}

/// Gauge ratio; overspent buckets render as full.
fn fill_ratio(percentage_full: f64) -> f64 {
    if percentage_full.is_finite() {
        (percentage_full / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn gauge_label(bucket: &DashboardBucket) -> String {
    format!(
        "{} / {} ({:.1}% spent, {:.1}% of {} elapsed)",
        bucket.total_spent.round_dp(2),
        bucket.size.round_dp(2),
        bucket.percentage_full,
        bucket.percentage_of_time_elapsed,
        match bucket.period {
            Period::Monthly => "month",
            Period::Yearly => "year",
        }
    )
}

fn render_header(frame: &mut ratatui::Frame, area: Rect, state: &ReportState) {
    let counts = |status: BucketStatus| state.buckets.iter().filter(|b| b.status == status).count();

    let line = Line::from(vec![
        Span::styled("Bucket Dashboard", Style::default().fg(Color::Cyan).bold()),
        Span::raw(format!("  as of {}  |  ", state.generated_at)),
        Span::styled(
            format!("{} good", counts(BucketStatus::Good)),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} warning", counts(BucketStatus::Warning)),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} critical", counts(BucketStatus::Critical)),
            Style::default().fg(Color::Red),
        ),
    ]);

    frame.render_widget(
        Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Left),
        area,
    );
}

fn render_buckets(frame: &mut ratatui::Frame, area: Rect, state: &ReportState) {
    if state.buckets.is_empty() {
        let empty = Paragraph::new("No buckets yet. Add one with `buckets bucket add`.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let visible = (area.height / ROW_HEIGHT).max(1) as usize;
    let shown: Vec<&DashboardBucket> = state.buckets.iter().skip(state.offset).take(visible).collect();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(ROW_HEIGHT); shown.len()])
        .split(area);

    for (bucket, row) in shown.into_iter().zip(rows.iter()) {
        let color = status_color(bucket.status);
        let title = Line::from(vec![
            Span::styled(bucket.name.clone(), Style::default().bold()),
            Span::raw(" "),
            Span::styled(
                format!("[{}]", bucket.status.as_str()),
                Style::default().fg(color),
            ),
            Span::raw(format!(" {} txns", bucket.transaction_count)),
        ]);

        let gauge = Gauge::default()
            .block(Block::default().title(title).borders(Borders::ALL))
            .gauge_style(Style::default().fg(color).bg(Color::Black))
            .ratio(fill_ratio(bucket.percentage_full))
            .label(gauge_label(bucket));
        frame.render_widget(gauge, *row);
    }
}
