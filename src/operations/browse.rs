use crate::db::bucket_repository;
use crate::error::Result;
use crate::models::bucket::Bucket;
use crate::models::transaction::TransactionWithBucket;
use crate::operations::transaction::{assign_bucket, list_transactions};
use crate::operations::tui::{centered_rect, run_in_terminal, terminal_error};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    prelude::{Alignment, Color, Constraint, Direction, Layout, Rect, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use rusqlite::Connection;
use std::cmp::max;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
    DateDesc,
    DateAsc,
    AmountDesc,
}

impl SortOrder {
    fn next(self) -> Self {
        match self {
            SortOrder::DateDesc => SortOrder::DateAsc,
            SortOrder::DateAsc => SortOrder::AmountDesc,
            SortOrder::AmountDesc => SortOrder::DateDesc,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SortOrder::DateDesc => "date ↓",
            SortOrder::DateAsc => "date ↑",
            SortOrder::AmountDesc => "amount ↓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    List,
    Details,
}

struct BrowseState {
    mode: Mode,

    transactions: Vec<TransactionWithBucket>,
    buckets: Vec<Bucket>,
    filtered_indices: Vec<usize>,

    table_state: TableState,

    unassigned_only: bool,
    sort_order: SortOrder,

    // Last assignment result or error, shown in the footer
    message: Option<(String, bool)>,

    last_page_size: usize,
}

impl BrowseState {
    fn load(conn: &Connection) -> Result<Self> {
        let mut state = Self {
            mode: Mode::List,
            transactions: list_transactions(conn)?,
            buckets: bucket_repository::get_all_buckets(conn)?,
            filtered_indices: Vec::new(),
            table_state: TableState::default(),
            unassigned_only: false,
            sort_order: SortOrder::DateDesc,
            message: None,
            last_page_size: 10,
        };
        state.recompute();
        Ok(state)
    }

    fn selected_transaction(&self) -> Option<&TransactionWithBucket> {
        let selected = self.table_state.selected()?;
        let idx = *self.filtered_indices.get(selected)?;
        self.transactions.get(idx)
    }

    fn recompute(&mut self) {
        self.filtered_indices = (0..self.transactions.len())
            .filter(|&i| !self.unassigned_only || self.transactions[i].transaction.bucket_id.is_none())
            .collect();

        let txs = &self.transactions;
        match self.sort_order {
            SortOrder::DateDesc => self.filtered_indices.sort_by(|&a, &b| {
                let (ta, tb) = (&txs[a].transaction, &txs[b].transaction);
                tb.date.cmp(&ta.date).then_with(|| tb.created_at.cmp(&ta.created_at))
            }),
            SortOrder::DateAsc => self.filtered_indices.sort_by(|&a, &b| {
                let (ta, tb) = (&txs[a].transaction, &txs[b].transaction);
                ta.date.cmp(&tb.date).then_with(|| ta.created_at.cmp(&tb.created_at))
            }),
            SortOrder::AmountDesc => self.filtered_indices.sort_by(|&a, &b| {
                txs[b].transaction.amount.cmp(&txs[a].transaction.amount)
            }),
        }

        if self.filtered_indices.is_empty() {
            self.table_state.select(None);
        } else {
            let last = self.filtered_indices.len() - 1;
            let selected = self.table_state.selected().map_or(0, |sel| sel.min(last));
            self.table_state.select(Some(selected));
        }
    }

    fn move_selection(&mut self, delta: i32) {
        if self.filtered_indices.is_empty() {
            self.table_state.select(None);
            return;
        }

        let current = self.table_state.selected().unwrap_or(0) as i32;
        let max_index = self.filtered_indices.len().saturating_sub(1) as i32;
        let next = (current + delta).clamp(0, max_index) as usize;
        self.table_state.select(Some(next));
    }

    fn reload(&mut self, conn: &Connection) -> Result<()> {
        self.transactions = list_transactions(conn)?;
        self.buckets = bucket_repository::get_all_buckets(conn)?;
        self.recompute();
        Ok(())
    }

    /// Assigns the selected transaction to `target` and reloads. Failures
    /// become a footer message rather than ending the session.
    fn assign_selected(&mut self, conn: &Connection, target: Option<String>) -> Result<()> {
        let id = match self.selected_transaction() {
            Some(tx) => tx.transaction.id.clone(),
            None => return Ok(()),
        };

        match assign_bucket(conn, &id, target.as_deref()) {
            Ok(updated) => {
                let name = updated
                    .bucket
                    .map(|b| b.name)
                    .unwrap_or_else(|| "no bucket".to_string());
                self.message = Some((format!("Assigned to {}", name), false));
            }
            Err(e) => self.message = Some((e.to_string(), true)),
        }
        self.reload(conn)
    }

    fn cycle_bucket(&mut self, conn: &Connection) -> Result<()> {
        let current = self
            .selected_transaction()
            .and_then(|tx| tx.transaction.bucket_id.clone());
        let target = next_bucket(current.as_deref(), &self.buckets);
        self.assign_selected(conn, target)
    }
}

/// The bucket after `current` in list order; wraps to unassigned after the last.
fn next_bucket(current: Option<&str>, buckets: &[Bucket]) -> Option<String> {
    let position = current.and_then(|id| buckets.iter().position(|b| b.id == id));
    let next = match position {
        Some(i) => buckets.get(i + 1),
        None => buckets.first(),
    };
    next.map(|b| b.id.clone())
}

/// Transaction list with bucket assignment.
pub fn run_browse(conn: &Connection) -> Result<()> {
    let mut state = BrowseState::load(conn)?;

    run_in_terminal(|terminal| {
        loop {
            terminal
                .draw(|frame| {
                    let size = frame.area();
                    let layout = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([
                            Constraint::Length(3),
                            Constraint::Min(5),
                            Constraint::Length(3),
                        ])
                        .split(size);

                    render_header(frame, layout[0], &state);
                    render_table(frame, layout[1], &mut state);
                    render_footer(frame, layout[2], &state);

                    if state.mode == Mode::Details {
                        render_details_modal(frame, size, &state);
                    }
                })
                .map_err(terminal_error("Failed to draw terminal UI"))?;

            if event::poll(std::time::Duration::from_millis(200))
                .map_err(terminal_error("Failed to poll input"))?
            {
                if let Event::Key(key) = event::read().map_err(terminal_error("Failed to read input"))? {
                    if handle_key(conn, &mut state, key)? {
                        break;
                    }
                }
            }
        }

        Ok(())
    })
}

fn handle_key(conn: &Connection, state: &mut BrowseState, key: KeyEvent) -> Result<bool> {
    // Some terminals report both press and release
    if key.kind == KeyEventKind::Release {
        return Ok(false);
    }

    match state.mode {
        Mode::List => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Up => state.move_selection(-1),
            KeyCode::Down => state.move_selection(1),
            KeyCode::PageUp => state.move_selection(-(max(1, state.last_page_size) as i32)),
            KeyCode::PageDown => state.move_selection(max(1, state.last_page_size) as i32),
            KeyCode::Home => state.move_selection(i32::MIN / 2),
            KeyCode::End => state.move_selection(i32::MAX / 2),
            KeyCode::Enter => state.mode = Mode::Details,
            KeyCode::Char('b') => state.cycle_bucket(conn)?,
            KeyCode::Char('n') => state.assign_selected(conn, None)?,
            KeyCode::Char('u') => {
                state.unassigned_only = !state.unassigned_only;
                state.recompute();
            }
            KeyCode::Char('s') => {
                state.sort_order = state.sort_order.next();
                state.recompute();
            }
            KeyCode::Char('r') => {
                state.reload(conn)?;
                state.message = None;
            }
            _ => {}
        },
        Mode::Details => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter) {
                state.mode = Mode::List;
            }
        }
    }

    Ok(false)
}

fn render_header(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let line = Line::from(vec![
        Span::styled("Transactions", Style::default().fg(Color::Cyan).bold()),
        Span::raw("  "),
        Span::raw(format!("Sort: {}", state.sort_order.label())),
        Span::raw("  |  "),
        Span::raw(if state.unassigned_only {
            "Showing: unassigned"
        } else {
            "Showing: all"
        }),
        Span::raw("  |  "),
        Span::raw(format!("Rows: {}", state.filtered_indices.len())),
        Span::raw("  |  "),
        Span::raw(format!("Buckets: {}", state.buckets.len())),
    ]);

    let paragraph = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let content = match (&state.mode, &state.message) {
        (Mode::List, Some((msg, is_error))) => Line::from(Span::styled(
            msg.clone(),
            Style::default().fg(if *is_error { Color::Red } else { Color::Green }),
        )),
        (Mode::List, None) => Line::from(
            "↑/↓ move  Enter details  b next bucket  n unassign  u unassigned only  s sort  r refresh  q/Esc exit",
        ),
        (Mode::Details, _) => Line::from("Esc/q back"),
    };

    frame.render_widget(
        Paragraph::new(content)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_table(frame: &mut ratatui::Frame, area: Rect, state: &mut BrowseState) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let header = Row::new([
        Cell::from("Date").style(Style::default().bold()),
        Cell::from("Description").style(Style::default().bold()),
        Cell::from("Amount").style(Style::default().bold()),
        Cell::from("Bucket").style(Style::default().bold()),
    ]);

    let rows = state
        .filtered_indices
        .iter()
        .map(|&idx| &state.transactions[idx])
        .map(|tx| {
            let mut desc = tx.transaction.description.clone();
            if desc.chars().count() > 48 {
                desc = desc.chars().take(45).collect::<String>() + "...";
            }
            let bucket = match tx.bucket {
                Some(ref b) => Cell::from(b.name.clone()),
                None => Cell::from("-").style(Style::default().fg(Color::DarkGray)),
            };

            Row::new([
                Cell::from(tx.transaction.date.format("%Y-%m-%d").to_string()),
                Cell::from(desc),
                Cell::from(tx.transaction.amount.round_dp(2).to_string()),
                bucket,
            ])
        });

    // Header row takes one line
    state.last_page_size = max(1, inner.height.saturating_sub(2) as usize);

    let widths = [
        Constraint::Length(10),
        Constraint::Percentage(50),
        Constraint::Length(12),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White).bold())
        .highlight_symbol("➤ ")
        .column_spacing(1);

    frame.render_stateful_widget(table, inner, &mut state.table_state);

    if state.filtered_indices.is_empty() {
        let empty = Paragraph::new("No transactions to show")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
    }
}

fn render_details_modal(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let popup_area = centered_rect(80, 50, area);
    frame.render_widget(Clear, popup_area);
    let block = Block::default().borders(Borders::ALL).title("Details");

    let Some(tx) = state.selected_transaction() else {
        frame.render_widget(
            Paragraph::new("No selection").block(block).alignment(Alignment::Center),
            popup_area,
        );
        return;
    };

    let bucket = tx
        .bucket
        .as_ref()
        .map(|b| format!("{} ({}, {})", b.name, b.size, b.period))
        .unwrap_or_else(|| "unassigned".to_string());

    let lines = vec![
        Line::from(format!("Id: {}", tx.transaction.id)),
        Line::from(format!("Date: {}", tx.transaction.date.format("%Y-%m-%d"))),
        Line::from(format!("Amount: {}", tx.transaction.amount)),
        Line::from(format!("Bucket: {}", bucket)),
        Line::from(""),
        Line::from("Description:"),
        Line::from(tx.transaction.description.clone()),
    ];

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use crate::models::bucket::{NewBucket, Period};
    use crate::models::transaction::NewTransaction;
    use crate::operations::bucket::create_bucket;
    use crate::operations::transaction::create_transaction;
    use chrono::NaiveDate;
    use crossterm::event::KeyModifiers;
    use rust_decimal::Decimal;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn seed(conn: &Connection) -> Vec<String> {
        let ids: Vec<String> = ["Food", "Fun"]
            .iter()
            .map(|name| {
                create_bucket(
                    conn,
                    NewBucket {
                        name: name.to_string(),
                        size: Decimal::new(100, 0),
                        period: Period::Monthly,
                    },
                )
                .unwrap()
                .bucket
                .id
            })
            .collect();

        for (day, amount) in [(1, 5), (2, 50)] {
            create_transaction(
                conn,
                NewTransaction {
                    date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
                    description: format!("Purchase {}", day),
                    amount: Decimal::new(amount, 0),
                    bucket_id: None,
                },
            )
            .unwrap();
        }
        ids
    }

    #[test]
    fn test_next_bucket_cycles_through_then_unassigns() {
        let conn = establish_test_connection().unwrap();
        seed(&conn);
        let buckets = bucket_repository::get_all_buckets(&conn).unwrap();

        let first = next_bucket(None, &buckets);
        assert_eq!(first.as_deref(), Some(buckets[0].id.as_str()));
        let second = next_bucket(first.as_deref(), &buckets);
        assert_eq!(second.as_deref(), Some(buckets[1].id.as_str()));
        assert_eq!(next_bucket(second.as_deref(), &buckets), None);
        assert_eq!(next_bucket(Some("deleted"), &buckets).as_deref(), Some(buckets[0].id.as_str()));
        assert_eq!(next_bucket(None, &[]), None);
    }

    #[test]
    fn test_sort_and_selection() {
        let conn = establish_test_connection().unwrap();
        seed(&conn);
        let mut state = BrowseState::load(&conn).unwrap();

        assert_eq!(state.selected_transaction().unwrap().transaction.description, "Purchase 2");

        handle_key(&conn, &mut state, press(KeyCode::Char('s'))).unwrap();
        assert_eq!(state.sort_order, SortOrder::DateAsc);
        state.table_state.select(Some(0));
        assert_eq!(state.selected_transaction().unwrap().transaction.description, "Purchase 1");

        handle_key(&conn, &mut state, press(KeyCode::Down)).unwrap();
        handle_key(&conn, &mut state, press(KeyCode::Down)).unwrap();
        assert_eq!(state.table_state.selected(), Some(1));
        handle_key(&conn, &mut state, press(KeyCode::Home)).unwrap();
        assert_eq!(state.table_state.selected(), Some(0));
    }

    #[test]
    fn test_assign_keys_update_storage() {
        let conn = establish_test_connection().unwrap();
        seed(&conn);
        let mut state = BrowseState::load(&conn).unwrap();
        let first_bucket = state.buckets[0].id.clone();

        handle_key(&conn, &mut state, press(KeyCode::Char('b'))).unwrap();
        let selected = state.selected_transaction().unwrap();
        assert_eq!(selected.transaction.bucket_id.as_deref(), Some(first_bucket.as_str()));
        assert!(matches!(state.message, Some((_, false))));

        handle_key(&conn, &mut state, press(KeyCode::Char('n'))).unwrap();
        assert!(state.selected_transaction().unwrap().transaction.bucket_id.is_none());
    }

    #[test]
    fn test_unassigned_filter() {
        let conn = establish_test_connection().unwrap();
        seed(&conn);
        let mut state = BrowseState::load(&conn).unwrap();

        handle_key(&conn, &mut state, press(KeyCode::Char('b'))).unwrap();
        handle_key(&conn, &mut state, press(KeyCode::Char('u'))).unwrap();
        assert!(state.unassigned_only);
        assert_eq!(state.filtered_indices.len(), 1);

        handle_key(&conn, &mut state, press(KeyCode::Char('u'))).unwrap();
        assert_eq!(state.filtered_indices.len(), 2);
    }

    #[test]
    fn test_quit_and_details_keys() {
        let conn = establish_test_connection().unwrap();
        let mut state = BrowseState::load(&conn).unwrap();

        assert!(!handle_key(&conn, &mut state, press(KeyCode::Enter)).unwrap());
        assert_eq!(state.mode, Mode::Details);
        assert!(!handle_key(&conn, &mut state, press(KeyCode::Char('q'))).unwrap());
        assert_eq!(state.mode, Mode::List);
        assert!(handle_key(&conn, &mut state, press(KeyCode::Char('q'))).unwrap());
    }
}
