use crate::api::{ApiError, NotesApi};
use crate::app::{App, DraftField, FieldValue, Mode, Request};
use crate::model::Note;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Completion of an adapter call executed on a worker thread.
enum ApiEvent {
    Loaded {
        gen: u64,
        result: Result<Vec<Note>, ApiError>,
    },
    Created(Result<Note, ApiError>),
    Updated(Result<Note, ApiError>),
    Deleted {
        id: String,
        result: Result<(), ApiError>,
    },
}

enum KeyOutcome {
    Continue,
    Quit,
    Request(Request),
}

pub fn run<S>(api: Arc<S>, base_label: String) -> Result<()>
where
    S: NotesApi + Send + Sync + 'static,
{
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, api, &base_label);
    teardown_terminal(&mut terminal)?;
    result
}

fn event_loop<S>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    api: Arc<S>,
    base_label: &str,
) -> Result<()>
where
    S: NotesApi + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel();
    let mut app = App::new();
    let mut list_offset = 0usize;
    if let Some(request) = app.begin_refresh() {
        dispatch(&api, &tx, request);
    }
    loop {
        while let Ok(api_event) = rx.try_recv() {
            apply(&mut app, api_event);
        }
        app.tick(Instant::now());
        terminal.draw(|f| draw(f, &app, base_label, &mut list_offset))?;
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut app, key) {
                    KeyOutcome::Quit => break,
                    KeyOutcome::Request(request) => dispatch(&api, &tx, request),
                    KeyOutcome::Continue => {}
                }
            }
        }
    }
    Ok(())
}

fn dispatch<S>(api: &Arc<S>, tx: &Sender<ApiEvent>, request: Request)
where
    S: NotesApi + Send + Sync + 'static,
{
    let api = Arc::clone(api);
    let tx = tx.clone();
    thread::spawn(move || {
        let api_event = match request {
            Request::Load { gen } => ApiEvent::Loaded {
                gen,
                result: api.list_notes(),
            },
            Request::Create { title, content } => {
                ApiEvent::Created(api.create_note(&title, &content))
            }
            Request::Update { id, title, content } => {
                ApiEvent::Updated(api.update_note(&id, &title, &content))
            }
            Request::Delete { id } => ApiEvent::Deleted {
                result: api.delete_note(&id),
                id,
            },
        };
        // a closed receiver just means the UI is gone
        let _ = tx.send(api_event);
    });
}

fn apply(app: &mut App, api_event: ApiEvent) {
    match api_event {
        ApiEvent::Loaded { gen, result } => app.finish_load(gen, result),
        ApiEvent::Created(result) => app.finish_create(result),
        ApiEvent::Updated(result) => app.finish_update(result),
        ApiEvent::Deleted { id, result } => app.finish_delete(&id, result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> KeyOutcome {
    if app.pending_delete().is_some() {
        return handle_confirm_key(app, key);
    }
    match app.mode() {
        Mode::View => handle_view_key(app, key),
        Mode::Edit | Mode::Create => handle_form_key(app, key),
    }
}

fn handle_view_key(app: &mut App, key: KeyEvent) -> KeyOutcome {
    match key.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Up | KeyCode::Char('k') => app.select_delta(-1),
        KeyCode::Down | KeyCode::Char('j') => app.select_delta(1),
        KeyCode::Char('n') => app.request_create(),
        KeyCode::Char('e') => app.request_edit(),
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Char('r') => {
            if let Some(request) = app.begin_refresh() {
                return KeyOutcome::Request(request);
            }
        }
        _ => {}
    }
    KeyOutcome::Continue
}

fn handle_form_key(app: &mut App, key: KeyEvent) -> KeyOutcome {
    match key.code {
        KeyCode::Esc => app.cancel(),
        KeyCode::Tab => app.draft_mut().next_field(),
        KeyCode::BackTab => app.draft_mut().prev_field(),
        KeyCode::Left => app.draft_mut().active_field_mut().move_left(),
        KeyCode::Right => app.draft_mut().active_field_mut().move_right(),
        KeyCode::Up => app.draft_mut().active_field_mut().move_up(),
        KeyCode::Down => app.draft_mut().active_field_mut().move_down(),
        KeyCode::Enter => {
            let control = key.modifiers.contains(KeyModifiers::CONTROL);
            if app.draft().field == DraftField::Content && !control {
                app.insert_char('\n');
            } else if let Some(request) = app.begin_save() {
                return KeyOutcome::Request(request);
            }
        }
        KeyCode::Backspace => app.backspace(),
        KeyCode::Char(c) => {
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            {
                app.insert_char(c);
            }
        }
        _ => {}
    }
    KeyOutcome::Continue
}

fn handle_confirm_key(app: &mut App, key: KeyEvent) -> KeyOutcome {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            if let Some(request) = app.resolve_delete(true) {
                return KeyOutcome::Request(request);
            }
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            app.resolve_delete(false);
        }
        _ => {}
    }
    KeyOutcome::Continue
}

fn draw(f: &mut ratatui::Frame<'_>, app: &App, base_label: &str, list_offset: &mut usize) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(f.size());

    draw_header(f, layout[0], app, base_label);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(layout[1]);
    draw_list(f, panes[0], app, list_offset);
    match app.mode() {
        Mode::View => draw_detail(f, panes[1], app),
        Mode::Edit => draw_form(f, panes[1], "Edit Note", app),
        Mode::Create => draw_form(f, panes[1], "New Note", app),
    }

    draw_footer(f, layout[2], app);

    if app.pending_delete().is_some() {
        draw_confirm(f, app);
    }
}

fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, app: &App, base_label: &str) {
    let mut spans = vec![
        Span::styled(
            "noted ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(base_label.to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw("  •  "),
        Span::styled(
            format!("{} note(s)", app.notes().len()),
            Style::default().fg(Color::Gray),
        ),
    ];
    if app.is_loading() {
        spans.push(Span::raw("  •  "));
        spans.push(Span::styled(
            "loading…",
            Style::default().fg(Color::Yellow),
        ));
    } else if app.is_busy() {
        spans.push(Span::raw("  •  "));
        spans.push(Span::styled("working…", Style::default().fg(Color::Yellow)));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    let paragraph = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(paragraph, area);
}

fn draw_list(f: &mut ratatui::Frame<'_>, area: Rect, app: &App, list_offset: &mut usize) {
    let items = if app.notes().is_empty() {
        let placeholder = if app.is_loading() {
            "Loading…"
        } else {
            "No notes yet (press n to create one)"
        };
        vec![ListItem::new(placeholder)]
    } else {
        app.notes().iter().map(note_item).collect()
    };

    let mut state = ListState::default();
    let viewport = area.height.saturating_sub(2) as usize;
    if let Some(selected) = app.selected_index() {
        *list_offset = adjust_offset(selected, *list_offset, viewport, 1, app.notes().len());
        state.select(Some(selected));
    }
    *state.offset_mut() = *list_offset;

    let block = Block::default()
        .title(Span::styled(
            "Notes",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(Color::LightCyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    );
    f.render_stateful_widget(list, area, &mut state);
}

fn note_item(note: &Note) -> ListItem<'static> {
    let mut spans = vec![Span::styled(
        truncate_text(&note.title, 40),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(stamp) = note.activity_key() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            stamp.format("%Y-%m-%d %H:%M").to_string(),
            Style::default().fg(Color::DarkGray),
        ));
    }
    ListItem::new(Line::from(spans)).style(Style::default().fg(Color::Gray))
}

fn draw_detail(f: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .title(Span::styled(
            "Note",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let lines = match app.selected_note() {
        Some(note) => {
            let mut lines = vec![Line::from(Span::styled(
                note.title.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))];
            let mut stamps = Vec::new();
            if let Some(updated) = &note.updated_at {
                stamps.push(format!("updated {}", updated));
            }
            if let Some(created) = &note.created_at {
                stamps.push(format!("created {}", created));
            }
            if !stamps.is_empty() {
                lines.push(Line::from(Span::styled(
                    stamps.join("  •  "),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines.push(Line::from(""));
            for text_line in note.content.split('\n') {
                lines.push(Line::from(text_line.to_string()));
            }
            lines
        }
        None => vec![Line::from("No note selected")],
    };

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(block);
    f.render_widget(paragraph, area);
}

fn draw_form(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, app: &App) {
    let draft = app.draft();
    let mut lines = Vec::new();
    lines.extend(field_lines(
        "Title",
        &draft.title,
        draft.field == DraftField::Title,
    ));
    if let Some(err) = app.title_error() {
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::LightRed),
        )));
    }
    lines.push(Line::from(""));
    lines.extend(field_lines(
        "Content",
        &draft.content,
        draft.field == DraftField::Content,
    ));
    lines.push(Line::from(""));
    let hint = if app.can_save() {
        "Enter on Title (or Ctrl+Enter) saves • Esc cancels • Tab switches field"
    } else {
        "Esc cancels • Tab switches field"
    };
    lines.push(Line::from(Span::styled(
        hint,
        Style::default().fg(Color::Gray),
    )));

    let block = Block::default()
        .title(Span::styled(
            title.to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(block);
    f.render_widget(paragraph, area);
}

fn draw_footer(f: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(2)])
        .split(area);

    let help = Paragraph::new(footer_help_line(app))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(help, rows[0]);

    let message = if let Some(error) = app.error() {
        Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::LightRed),
        ))
    } else if let Some(status) = app.status() {
        Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(Color::LightGreen),
        ))
    } else {
        Line::from("")
    };
    let status = Paragraph::new(message).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(status, rows[1]);
}

fn footer_help_line(app: &App) -> Line<'static> {
    let mut spans = Vec::new();
    match app.mode() {
        Mode::View => spans.extend([
            Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
            Span::raw(" select  "),
            Span::styled("n", Style::default().fg(Color::LightMagenta)),
            Span::raw(" new  "),
            Span::styled("e", Style::default().fg(Color::LightYellow)),
            Span::raw(" edit  "),
            Span::styled("d", Style::default().fg(Color::LightRed)),
            Span::raw(" delete  "),
            Span::styled("r", Style::default().fg(Color::LightCyan)),
            Span::raw(" refresh  "),
            Span::styled("q", Style::default().fg(Color::LightRed)),
            Span::raw(" quit"),
        ]),
        Mode::Edit | Mode::Create => spans.extend([
            Span::styled("Tab", Style::default().fg(Color::LightCyan)),
            Span::raw(" field  "),
            Span::styled("Enter", Style::default().fg(Color::LightGreen)),
            Span::raw(" save / newline in content  "),
            Span::styled("Esc", Style::default().fg(Color::LightRed)),
            Span::raw(" cancel"),
        ]),
    }
    Line::from(spans)
}

fn draw_confirm(f: &mut ratatui::Frame<'_>, app: &App) {
    let area = centered_rect(50, 30, f.size());
    let title = app
        .pending_delete()
        .and_then(|id| app.notes().iter().find(|n| n.id == id))
        .map(|n| n.title.clone())
        .or_else(|| app.pending_delete().map(str::to_string))
        .unwrap_or_default();
    let body = vec![
        Line::from(Span::styled(
            format!("Delete \"{}\"?", title),
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press y to confirm, n or Esc to cancel"),
    ];
    let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
        Block::default()
            .title(Span::styled(
                "Confirm Delete",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightRed)),
    );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    for ch in text.chars() {
        if out.chars().count() >= max.saturating_sub(3) {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    if out.chars().count() > max {
        out.truncate(max);
    }
    out
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    let segments: Vec<&str> = if text.is_empty() {
        vec![""]
    } else {
        text.split('\n').collect()
    };
    segments
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let mut spans = Vec::new();
            spans.push(Span::styled(
                if idx == 0 {
                    prefix.clone()
                } else {
                    spacer.clone()
                },
                label_style,
            ));
            spans.push(Span::styled((*line).to_string(), value_style));
            Line::from(spans)
        })
        .collect()
}
