use crate::app::{App, InputMode};
use crate::storage::Storage;
use crate::task::{StatusFilter, TaskStatus};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

const ACCENT: Color = Color::Cyan;

pub fn draw<S: Storage>(f: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_input(f, app, chunks[0]);
    draw_filters(f, app, chunks[1]);
    draw_tasks(f, app, chunks[2]);
    draw_status_line(f, app, chunks[3]);
}

fn draw_input<S: Storage>(f: &mut Frame, app: &App<S>, area: Rect) {
    let (title, text, active) = match &app.mode {
        InputMode::Normal => ("To-Do", "press 'a' to add a task", false),
        InputMode::Adding(buffer) => ("Add task", buffer.as_str(), true),
        InputMode::Editing { buffer, .. } => ("Edit task", buffer.as_str(), true),
    };
    let style = if active {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(Span::styled(text, style)).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(if active {
                Style::default().fg(ACCENT)
            } else {
                Style::default()
            }),
    );
    f.render_widget(input, area);
}

fn draw_filters<S: Storage>(f: &mut Frame, app: &App<S>, area: Rect) {
    let counts = app.store.counts();
    let mut spans = Vec::new();
    for (i, status) in app.selector.choices().iter().enumerate() {
        let style = if app.selector.is_active(*status) {
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::styled(
            format!(" {} {} ({}) ", i + 1, status.label(), counts[i]),
            style,
        ));
        spans.push(Span::raw("  "));
    }
    let title = format!("Showing: {}", app.filter.label());
    let filters = Paragraph::new(Line::from(spans))
        .block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(filters, area);
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Yellow,
        TaskStatus::InProgress => Color::Blue,
        TaskStatus::Completed => Color::Green,
    }
}

fn draw_tasks<S: Storage>(f: &mut Frame, app: &App<S>, area: Rect) {
    let tasks = app.visible();
    let items: Vec<ListItem> = tasks
        .iter()
        .map(|t| {
            let marker = if t.status == TaskStatus::Completed {
                "✓"
            } else {
                "⋮"
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!("[#{}] ", t.id)),
                Span::styled(&t.description, Style::default().fg(Color::White)),
                Span::styled(
                    format!(" ({}) {}", t.status.label(), marker),
                    Style::default().fg(status_color(t.status)),
                ),
            ]))
        })
        .collect();

    let title = match app.filter {
        StatusFilter::All => "Tasks".to_string(),
        StatusFilter::Only(status) => format!("Tasks: {}", status.label()),
    };
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));

    let mut state = ListState::default().with_selected(app.selected_index());
    f.render_stateful_widget(list, area, &mut state);

    if let Some(index) = app.selected_index() {
        let task = tasks[index];
        if app.menu.is_open_for(task.id) {
            let row = area.y + 1 + (index - state.offset()) as u16;
            draw_options(f, app, task.status, area, row);
        }
    }
}

fn draw_options<S: Storage>(
    f: &mut Frame,
    app: &App<S>,
    status: TaskStatus,
    list: Rect,
    row: u16,
) {
    let offered = status.next_statuses();
    let width = 18u16.min(list.width);
    let height = (offered.len() as u16 + 2).min(list.height);
    let x = list.x + list.width.saturating_sub(width + 1);
    let y = (row + 1).min(list.bottom().saturating_sub(height));
    let area = Rect::new(x, y, width, height);

    let items: Vec<ListItem> = offered.iter().map(|s| ListItem::new(s.label())).collect();
    let menu = List::new(items)
        .block(
            Block::default()
                .title("Status")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT)),
        )
        .highlight_style(Style::default().fg(Color::Black).bg(ACCENT));
    let mut state = ListState::default().with_selected(Some(app.menu.cursor()));
    f.render_widget(Clear, area);
    f.render_stateful_widget(menu, area, &mut state);
}

fn draw_status_line<S: Storage>(f: &mut Frame, app: &App<S>, area: Rect) {
    let line = match &app.message {
        Some(message) => Line::from(Span::styled(
            message.as_str(),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(
            match app.mode {
                InputMode::Normal => {
                    "a add  e edit  d delete  o status  1-3/Tab filter  0 all  q quit"
                }
                _ => "Enter save  Esc cancel",
            },
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}
