use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState},
};

use gateview::domain::{CMDMode, ViewConfig};
use gateview::record::StatusClass;
use gateview::view::ViewSnapshot;

use crate::model::{Model, Popup, UIData};

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TableUI {
    max_column_width: usize,
    table_state: TableState,
}

impl TableUI {
    pub fn new(cfg: &ViewConfig) -> Self {
        Self {
            max_column_width: cfg.max_column_width,
            table_state: TableState::default(),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1)])
            .split(frame.area());

        frame.render_widget(Paragraph::new(summary_line(uidata)), chunks[0]);
        self.draw_table(uidata, frame, chunks[1]);
        draw_footer(uidata, frame, chunks[2]);

        match &uidata.popup {
            Some(Popup::Help(text)) => draw_help(text, frame),
            Some(Popup::Filter { title, search, options, selected }) => {
                draw_filter_menu(title, search, options, *selected, frame)
            }
            Some(Popup::Columns { items, selected }) => draw_column_manager(items, *selected, frame),
            None => (),
        }
    }

    fn draw_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let snapshot = &uidata.table;
        let labels = snapshot.headers.iter().enumerate().map(|(idx, h)| {
            let mut label = h.label.clone();
            if let Some(direction) = h.sort {
                label.push(' ');
                label.push_str(direction.arrow());
            }
            if h.filtered {
                label.push_str(" *");
            }
            let mut style = Style::default().add_modifier(Modifier::BOLD);
            if idx == uidata.selected_column {
                style = style.bg(Color::Blue);
            }
            Cell::from(label).style(style)
        });
        // Leading blank cell sits above the selection marker column
        let header = Row::new(std::iter::once(Cell::from("")).chain(labels))
            .style(Style::default().bg(Color::DarkGray));

        let rows: Vec<Row> = snapshot
            .rows
            .iter()
            .map(|r| {
                let marker = if r.selected { "✓" } else { " " };
                let cells = std::iter::once(Cell::from(marker))
                    .chain(r.cells.iter().map(|c| Cell::from(c.as_str())));
                Row::new(cells).style(status_style(r.status))
            })
            .collect();

        let widths: Vec<Constraint> = std::iter::once(Constraint::Length(1))
            .chain(
                column_widths(snapshot, self.max_column_width)
                    .into_iter()
                    .map(Constraint::Length),
            )
            .collect();

        let title = format!(" {} ", snapshot.name);
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let selected = (!snapshot.rows.is_empty()).then_some(uidata.selected_row);
        self.table_state.select(selected);
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }
}

/// Width per visible column: the widest of label and cells, capped.
fn column_widths(snapshot: &ViewSnapshot, max_width: usize) -> Vec<u16> {
    snapshot
        .headers
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            // Room for the sort arrow and filter marker
            let label = h.label.chars().count() + 4;
            let cells = snapshot
                .rows
                .iter()
                .filter_map(|r| r.cells.get(idx))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0);
            label.max(cells).min(max_width) as u16
        })
        .collect()
}

fn status_style(status: StatusClass) -> Style {
    match status {
        StatusClass::Normal => Style::default(),
        StatusClass::Warning => Style::default().fg(Color::Yellow),
        StatusClass::Error => Style::default().fg(Color::Red),
        StatusClass::Offline => Style::default().fg(Color::DarkGray),
        StatusClass::Info => Style::default().fg(Color::Cyan),
    }
}

fn summary_line(uidata: &UIData) -> Line<'static> {
    let summary = &uidata.table.summary;
    let mut spans = vec![
        Span::from(format!(
            " {}/{} records ",
            summary.filtered, summary.total
        ))
        .bold(),
    ];
    for (status, count) in uidata.status_counts.iter().filter(|(_, n)| *n > 0) {
        spans.push(Span::styled(format!(" {status}:{count}"), status_style(*status)));
    }
    if uidata.selection_count > 0 {
        spans.push(format!("  selected:{}", uidata.selection_count).magenta());
    }
    if let Some(feed) = uidata.feed {
        let state = if feed.paused { "paused" } else { "live" };
        spans.push(format!("  feed:{state} ({} queued)", feed.remaining).green());
    }
    Line::from(spans)
}

fn draw_footer(uidata: &UIData, frame: &mut Frame, area: Rect) {
    if uidata.active_cmdinput {
        let prompt = match uidata.cmd_mode {
            Some(CMDMode::GoToPage) => "Go to page: ",
            Some(CMDMode::PageSize) => "Rows per page: ",
            Some(CMDMode::Export) => "Export to: ",
            Some(CMDMode::FilterSearch) => "Search values: ",
            Some(CMDMode::Range) => "Range min..max: ",
            None => "> ",
        };
        let line = Line::from(vec![prompt.yellow(), Span::from(uidata.cmdinput.input.clone())]);
        frame.render_widget(Paragraph::new(line), area);
        let x = area.x + (prompt.chars().count() + uidata.cmdinput.cursor_pos) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
        return;
    }

    let s = &uidata.table.summary;
    let mut spans = vec![Span::from(format!(" Page {}/{} ", s.current_page, s.total_pages))];
    for page in &uidata.page_window {
        if *page == s.current_page {
            spans.push(format!("[{page}] ").bold());
        } else {
            spans.push(Span::from(format!("{page} ")).dim());
        }
    }
    spans.push(Span::from(format!(
        "| rows {}-{} of {} | {} per page ",
        s.first_row, s.last_row, s.filtered, s.page_size
    )));
    if uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TIMEOUT
        && !uidata.status_message.is_empty()
    {
        spans.push(Span::from(format!("| {}", uidata.status_message)).italic());
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_help(text: &str, frame: &mut Frame) {
    let area = centered_rect(60, 80, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(Text::from(text.to_string()))
        .block(Block::default().borders(Borders::ALL).title(" Help (Esc to close) "));
    frame.render_widget(help, area);
}

fn draw_filter_menu(
    title: &str,
    search: &str,
    options: &[(String, bool)],
    selected: usize,
    frame: &mut Frame,
) {
    let area = centered_rect(40, 70, frame.area());
    frame.render_widget(Clear, area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(Block::default().borders(Borders::ALL).inner(area));

    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Filter {title} "))
            .title_bottom(" space toggle  a all  x none  / search  Enter apply "),
        area,
    );
    let search_line = if search.is_empty() {
        Line::from("(no search)".dark_gray())
    } else {
        Line::from(vec!["search: ".yellow(), Span::from(search.to_string())])
    };
    frame.render_widget(Paragraph::new(search_line), chunks[0]);

    let items: Vec<ListItem> = options
        .iter()
        .map(|(label, checked)| {
            let mark = if *checked { "[x] " } else { "[ ] " };
            let label = if label.is_empty() { "(blank)" } else { label.as_str() };
            ListItem::new(format!("{mark}{label}"))
        })
        .collect();
    let mut state = ListState::default();
    state.select((!options.is_empty()).then_some(selected));
    let list = List::new(items).highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn draw_column_manager(items: &[(String, bool)], selected: usize, frame: &mut Frame) {
    let area = centered_rect(40, 60, frame.area());
    frame.render_widget(Clear, area);
    let list_items: Vec<ListItem> = items
        .iter()
        .map(|(label, visible)| {
            let mark = if *visible { "[x] " } else { "[ ] " };
            ListItem::new(format!("{mark}{label}"))
        })
        .collect();
    let mut state = ListState::default();
    state.select((!items.is_empty()).then_some(selected));
    let list = List::new(list_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Columns ")
                .title_bottom(" space show/hide  h/l move  A all  r reset "),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
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
