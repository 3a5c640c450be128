use crate::{
    app::{
        App, DialogChoice, EntryEdit, Focus, HitMap, InputMode, InputPurpose, ListHit, LogLevel,
        ToastLevel,
    },
    controller::ListKind,
    game::GAME_NAME,
    listview::RowStatus,
    registry::ControlKind,
    tooltip::Annotation,
};
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, Table, TableState},
};
use std::{
    io,
    time::{Duration, Instant},
};

const CONTROLS_WIDTH: u16 = 40;
const LOG_HEIGHT: u16 = 8;
const PLAY_LABEL: &str = "[ Play ]";
const IDLE_POLL: Duration = Duration::from_millis(200);
const SWATCHES_PER_ROW: usize = 8;
const PREVIEW_WIDTH: u16 = SWATCHES_PER_ROW as u16 * 2 + 2;

#[derive(Clone)]
struct Theme {
    accent: Color,
    accent_soft: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    header_bg: Color,
}

impl Theme {
    fn new() -> Self {
        Self {
            accent: Color::Rgb(230, 170, 90),
            accent_soft: Color::Rgb(150, 110, 60),
            border: Color::Rgb(75, 70, 65),
            text: Color::Rgb(235, 228, 215),
            muted: Color::Rgb(150, 140, 130),
            success: Color::Rgb(130, 210, 120),
            warning: Color::Rgb(235, 200, 100),
            error: Color::Rgb(230, 95, 85),
            header_bg: Color::Rgb(30, 26, 22),
        }
    }

    fn block(&self, title: &'static str, focused: bool) -> Block<'static> {
        let border = if focused { self.accent_soft } else { self.border };
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: &'static str, focused: bool) -> Block<'static> {
        self.block(title, focused).padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
    }
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    loop {
        app.tick(Instant::now());
        let mut hits = HitMap::default();
        terminal.draw(|frame| hits = draw(frame, app))?;
        app.set_hit_map(hits);

        if app.should_quit {
            break;
        }

        // Wake up for a pending tooltip instead of waiting out the idle poll.
        let timeout = app
            .hover
            .timers()
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .map_or(IDLE_POLL, |until| until.min(IDLE_POLL));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    handle_key(app, key)?;
                }
                Event::Mouse(mouse) => {
                    if let Err(err) = handle_mouse(app, mouse) {
                        app.status = format!("Action failed: {err}");
                        app.log_error(format!("Action failed: {err:#}"));
                    }
                }
                Event::FocusLost => app.pointer_left(),
                _ => {}
            }
        }
    }

    Ok(())
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) -> Result<()> {
    match mouse.kind {
        MouseEventKind::Moved => app.pointer_moved(mouse.column, mouse.row, Instant::now()),
        MouseEventKind::Down(MouseButton::Left) => {
            if app.dialog.is_none() {
                app.click(mouse.column, mouse.row)?;
            }
        }
        MouseEventKind::Down(MouseButton::Right) => {
            if app.dialog.is_none() {
                app.right_click(mouse.column, mouse.row)?;
            }
        }
        MouseEventKind::ScrollUp => app.move_selection(-1),
        MouseEventKind::ScrollDown => app.move_selection(1),
        _ => {}
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    if app.dialog.is_some() {
        return handle_dialog_mode(app, key);
    }

    let mode = std::mem::replace(&mut app.input_mode, InputMode::Normal);
    match mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing {
            prompt,
            mut buffer,
            purpose,
        } => handle_input_mode(app, key, &mut buffer, purpose, prompt),
    }
}

fn handle_dialog_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('H') => {
            app.dialog_choice_left();
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('L') | KeyCode::Tab => {
            app.dialog_choice_right();
        }
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.dialog_set_choice(DialogChoice::Yes);
        }
        KeyCode::Char('n') | KeyCode::Char('N') => {
            app.dialog_set_choice(DialogChoice::No);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            app.dialog_confirm();
        }
        KeyCode::Esc => {
            app.dialog_set_choice(DialogChoice::No);
            app.dialog_confirm();
        }
        _ => {}
    }
    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    if handle_entry_key(app, key) {
        return Ok(());
    }

    let result = match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('Q'), _) => {
            app.should_quit = true;
            Ok(())
        }
        (KeyCode::Char('r'), KeyModifiers::CONTROL) | (KeyCode::Char('p'), _) => app.play(),
        (KeyCode::Char('l'), KeyModifiers::CONTROL) => app.reload_params(),
        (KeyCode::Char('s'), KeyModifiers::CONTROL) => app.save_params(),
        (KeyCode::Char('I'), _) => app.toggle_patch_inits(),
        (KeyCode::Char('R'), _) => {
            app.request_restore_defaults();
            Ok(())
        }
        (KeyCode::Char(c @ '1'..='5'), _) => {
            app.select_tab_index(c as usize - '1' as usize);
            Ok(())
        }
        (KeyCode::Char(']'), _) => {
            select_adjacent_tab(app, 1);
            Ok(())
        }
        (KeyCode::Char('['), _) => {
            select_adjacent_tab(app, -1);
            Ok(())
        }
        (KeyCode::PageUp, _) => {
            app.scroll_log_up(3);
            Ok(())
        }
        (KeyCode::PageDown, _) => {
            app.scroll_log_down(3);
            Ok(())
        }
        (KeyCode::Tab, _) => {
            app.cycle_focus();
            Ok(())
        }
        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => {
            app.move_selection(-1);
            Ok(())
        }
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => {
            app.move_selection(1);
            Ok(())
        }
        (KeyCode::Enter, _) | (KeyCode::Char(' '), _) => app.activate_selected(),
        _ => match app.focus {
            Focus::List(kind) => handle_list_key(app, kind, key),
            Focus::Controls => Ok(()),
        },
    };

    if let Err(err) = result {
        app.status = format!("Action failed: {err}");
        app.log_error(format!("Action failed: {err:#}"));
    }
    Ok(())
}

/// Routes editing keys to the entry being edited. Returns true when the key
/// was consumed.
fn handle_entry_key(app: &mut App, key: KeyEvent) -> bool {
    let Some(setting) = app.editing_entry else {
        return false;
    };
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return false;
    }
    let edit = match key.code {
        KeyCode::Enter | KeyCode::Esc => {
            app.finish_entry_edit();
            return true;
        }
        KeyCode::Char(c) if c.is_ascii_digit() || c == '-' || c == '.' => EntryEdit::Insert(c),
        KeyCode::Backspace => EntryEdit::Backspace,
        KeyCode::Left => EntryEdit::Left,
        KeyCode::Right => EntryEdit::Right,
        _ => return false,
    };
    app.edit_entry(setting, edit);
    true
}

fn handle_list_key(app: &mut App, kind: ListKind, key: KeyEvent) -> Result<()> {
    match (kind, key.code) {
        (_, KeyCode::Char('r')) => {
            app.read_list(kind);
            app.status = format!("Refreshed {}", kind.label());
        }
        (ListKind::Keybinds | ListKind::Colors, KeyCode::Char('s')) => app.request_save(kind),
        (ListKind::Keybinds | ListKind::Colors, KeyCode::Char('d') | KeyCode::Delete) => {
            app.request_delete(kind)?;
        }
        (ListKind::Utilities, KeyCode::Char('a')) => app.toggle_autorun()?,
        (ListKind::Utilities, KeyCode::Char('h')) => app.toggle_utility_paths()?,
        _ => {}
    }
    Ok(())
}

fn select_adjacent_tab(app: &mut App, delta: isize) {
    let tabs = app.tabs();
    let current = tabs.iter().position(|tab| *tab == app.tab).unwrap_or(0) as isize;
    let next = (current + delta).rem_euclid(tabs.len() as isize) as usize;
    app.select_tab_index(next);
}

fn handle_input_mode(
    app: &mut App,
    key: KeyEvent,
    buffer: &mut String,
    purpose: InputPurpose,
    prompt: String,
) -> Result<()> {
    let mut keep_editing = true;
    match key.code {
        KeyCode::Esc => {
            keep_editing = false;
            app.set_toast("Cancelled", ToastLevel::Warn, Duration::from_secs(2));
        }
        KeyCode::Enter => {
            let value = buffer.trim().to_string();
            keep_editing = false;
            if !value.is_empty() {
                if let Err(err) = app.handle_submit(purpose.clone(), value) {
                    app.status = format!("Action failed: {err}");
                    app.log_error(format!("Action failed: {err:#}"));
                }
            }
        }
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                || key.modifiers.contains(KeyModifiers::ALT)
            {
                return Ok(());
            }
            buffer.push(c);
        }
        KeyCode::Backspace => {
            buffer.pop();
        }
        _ => {}
    }

    // A submit may have opened the next prompt or a dialog.
    if keep_editing && app.input_mode == InputMode::Normal {
        app.input_mode = InputMode::Editing {
            prompt,
            buffer: buffer.clone(),
            purpose,
        };
    }

    Ok(())
}

fn draw(frame: &mut Frame<'_>, app: &App) -> HitMap {
    let area = frame.size();
    let theme = Theme::new();
    let mut hits = HitMap::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(LOG_HEIGHT),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(frame, app, &theme, chunks[0], &mut hits);

    let controls = app.tab.controls();
    let lists = app.tab.lists();
    let list_area = if controls.is_empty() {
        chunks[1]
    } else if lists.is_empty() {
        draw_controls(frame, app, &theme, chunks[1], &mut hits);
        Rect::default()
    } else {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(CONTROLS_WIDTH), Constraint::Min(20)])
            .split(chunks[1]);
        draw_controls(frame, app, &theme, body[0], &mut hits);
        body[1]
    };

    if !lists.is_empty() {
        let constraints: Vec<Constraint> = lists
            .iter()
            .map(|_| Constraint::Ratio(1, lists.len() as u32))
            .collect();
        let panes = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(list_area);
        for (kind, pane) in lists.iter().zip(panes.iter()) {
            let pane = if *kind == ListKind::Colors {
                draw_color_preview(frame, app, &theme, *pane)
            } else {
                *pane
            };
            if let Some(hit) = draw_list(frame, app, &theme, *kind, pane) {
                hits.lists.push(hit);
            }
        }
    }

    let log_block = theme.block("Log", false);
    let log_inner = log_block.inner(chunks[2]);
    let log_lines = build_log_lines(app, &theme, log_inner.height as usize);
    frame.render_widget(Paragraph::new(log_lines).block(log_block), chunks[2]);

    let status = Paragraph::new(status_bar_line(app, chunks[3].width))
        .style(Style::default().fg(theme.text).bg(theme.header_bg));
    frame.render_widget(status, chunks[3]);

    if let Some(annotation) = app.hover.annotation() {
        draw_tooltip(frame, &theme, &annotation);
    }
    draw_toast(frame, app, &theme, chunks[1]);
    draw_dialog(frame, app, &theme);

    hits
}

fn draw_header(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect, hits: &mut HitMap) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.header_bg));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut spans = vec![
        Span::styled(
            " dflaunch ",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(GAME_NAME, Style::default().fg(theme.muted)),
        Span::raw("   "),
    ];
    let mut x = inner.x + spans.iter().map(|span| span.width() as u16).sum::<u16>();
    for (index, tab) in app.tabs().into_iter().enumerate() {
        let label = format!(" {} {} ", index + 1, tab.label());
        let width = label.len() as u16;
        let style = if tab == app.tab {
            Style::default()
                .fg(Color::Black)
                .bg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text)
        };
        hits.tabs.push((tab, Rect::new(x, inner.y, width, 1)));
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
        x = x.saturating_add(width + 1);
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), inner);

    let play_width = PLAY_LABEL.len() as u16;
    if inner.width > play_width + 1 && x + play_width < inner.right() {
        let play_area = Rect::new(inner.right() - play_width - 1, inner.y, play_width, 1);
        let play = Paragraph::new(Span::styled(
            PLAY_LABEL,
            Style::default()
                .fg(theme.success)
                .add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(play, play_area);
        hits.play = Some(play_area);
    }
}

fn draw_controls(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect, hits: &mut HitMap) {
    let focused = app.focus == Focus::Controls;
    let block = theme.panel(app.tab.label(), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    for (index, setting) in app.tab.controls().iter().enumerate() {
        if index as u16 >= inner.height {
            break;
        }
        let Some(control) = app.registry.control_for(*setting) else {
            continue;
        };
        let row = Rect::new(inner.x, inner.y + index as u16, inner.width, 1);
        let selected = focused && index == app.control_selected;

        let value_style = if control.is_unknown() {
            Style::default().fg(theme.warning).add_modifier(Modifier::BOLD)
        } else {
            match control.value() {
                "YES" => Style::default().fg(theme.success),
                "NO" => Style::default().fg(theme.muted),
                _ => Style::default().fg(theme.text),
            }
        };
        let caption = format!("{}: ", control.caption);
        let value = match control.kind {
            ControlKind::Entry => format!("[{}]", control.value()),
            ControlKind::Button | ControlKind::Label => control.value().to_string(),
        };
        let mut line = Line::from(vec![
            Span::styled(caption.clone(), Style::default().fg(theme.muted)),
            Span::styled(value, value_style),
        ]);
        if selected {
            line = line.style(Style::default().bg(theme.accent_soft));
        }
        frame.render_widget(Paragraph::new(line), row);

        if selected && app.editing_entry == Some(*setting) {
            let cursor_x = row.x + caption.len() as u16 + 1 + control.cursor() as u16;
            if cursor_x < row.right() {
                frame.set_cursor(cursor_x, row.y);
            }
        }
        hits.controls.push((*setting, row));
    }
}

fn list_title(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Keybinds => "Key Bindings",
        ListKind::Graphics => "Graphics Packs",
        ListKind::Utilities => "Utilities",
        ListKind::Colors => "Color Schemes",
        ListKind::Embarks => "Embark Profiles",
        ListKind::Hacks => "DFHack",
    }
}

fn status_heading(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Keybinds | ListKind::Colors | ListKind::Graphics => "Active",
        ListKind::Embarks => "Added",
        ListKind::Utilities => "Auto",
        ListKind::Hacks => "On",
    }
}

fn draw_list(
    frame: &mut Frame<'_>,
    app: &App,
    theme: &Theme,
    kind: ListKind,
    area: Rect,
) -> Option<ListHit> {
    let focused = app.focus == Focus::List(kind);
    let view = app.lists.get(kind);
    let block = theme.block(list_title(kind), focused);
    let inner = block.inner(area);

    let rows: Vec<Row> = view
        .rows()
        .iter()
        .map(|row| {
            let status_style = match row.status {
                RowStatus::Unknown => Style::default().fg(theme.warning),
                status if status.is_yes() => Style::default().fg(theme.success),
                _ => Style::default().fg(theme.muted),
            };
            Row::new(vec![
                Cell::from(row.label.clone()).style(Style::default().fg(theme.text)),
                Cell::from(row.status.label()).style(status_style),
            ])
        })
        .collect();
    let header = Row::new(vec!["Name", status_heading(kind)])
        .style(Style::default().fg(theme.muted).add_modifier(Modifier::BOLD));
    let highlight = if focused {
        Style::default()
            .bg(theme.accent_soft)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let table = Table::new(rows, [Constraint::Min(10), Constraint::Length(6)])
        .header(header)
        .block(block)
        .highlight_style(highlight);

    let mut state = TableState::default();
    state.select(view.selected());
    frame.render_stateful_widget(table, area, &mut state);

    if view.is_empty() {
        draw_empty_hint(frame, theme, inner);
    }
    if inner.height < 2 {
        return None;
    }
    Some(ListHit {
        kind,
        rows: Rect::new(inner.x, inner.y + 1, inner.width, inner.height - 1),
        offset: state.offset(),
    })
}

/// Draws the swatches to the right of `area` and returns what is left for
/// the scheme table.
fn draw_color_preview(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) -> Rect {
    if area.width < PREVIEW_WIDTH + 20 {
        return area;
    }
    let split = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(PREVIEW_WIDTH)])
        .split(area);
    let scheme = app
        .color_preview
        .as_ref()
        .and_then(|preview| preview.scheme.as_ref());
    let lines: Vec<Line> = match scheme {
        Some(scheme) => scheme
            .colors
            .chunks(SWATCHES_PER_ROW)
            .map(|row| {
                Line::from(
                    row.iter()
                        .map(|rgb| {
                            Span::styled("  ", Style::default().bg(Color::Rgb(rgb.r, rgb.g, rgb.b)))
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .collect(),
        None => vec![Line::from(Span::styled("n/a", Style::default().fg(theme.muted)))],
    };
    frame.render_widget(Paragraph::new(lines).block(theme.block("Preview", false)), split[1]);
    split[0]
}

fn draw_empty_hint(frame: &mut Frame<'_>, theme: &Theme, inner: Rect) {
    if inner.height < 2 {
        return;
    }
    let area = Rect::new(inner.x, inner.y + 1, inner.width, 1);
    let hint = Paragraph::new(Span::styled("Nothing found.", Style::default().fg(theme.muted)));
    frame.render_widget(hint, area);
}

/// Places a popup of `width` x `height` at `anchor`, flipping above the
/// anchor or shifting left when it would leave the screen.
fn tooltip_area(screen: Rect, anchor_x: u16, anchor_y: u16, width: u16, height: u16) -> Rect {
    let width = width.min(screen.width);
    let height = height.min(screen.height);
    let x = anchor_x.min(screen.right().saturating_sub(width)).max(screen.x);
    let y = if anchor_y.saturating_add(height) <= screen.bottom() {
        anchor_y
    } else {
        anchor_y.saturating_sub(height + 2).max(screen.y)
    };
    Rect::new(x, y, width, height)
}

fn draw_tooltip(frame: &mut Frame<'_>, theme: &Theme, annotation: &Annotation<'_>) {
    let screen = frame.size();
    let width = annotation.text.chars().count() as u16 + 4;
    let popup = tooltip_area(screen, annotation.anchor.x, annotation.anchor.y, width, 3);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent_soft))
        .style(Style::default().bg(theme.header_bg));
    let text = Paragraph::new(annotation.text.to_string())
        .block(block)
        .style(Style::default().fg(theme.text));
    frame.render_widget(text, popup);
}

fn status_bar_line(app: &App, width: u16) -> String {
    let width = width as usize;
    let (left, right) = match &app.input_mode {
        InputMode::Normal => (format!("Status: {}", app.status), app.hint().to_string()),
        InputMode::Editing { prompt, buffer, .. } => (
            format!("{prompt}: {buffer}"),
            "Enter confirm | Esc cancel".to_string(),
        ),
    };

    if width == 0 {
        return String::new();
    }

    if left.len() + right.len() + 1 > width {
        let available = width.saturating_sub(left.len() + 1);
        let mut trimmed_right = right;
        if trimmed_right.len() > available {
            trimmed_right.truncate(available);
        }
        return format!("{left} {}", trimmed_right);
    }

    let spaces = width - left.len() - right.len();
    format!("{left}{}{}", " ".repeat(spaces), right)
}

fn build_log_lines(app: &App, theme: &Theme, height: usize) -> Vec<Line<'static>> {
    if height == 0 {
        return Vec::new();
    }

    if app.logs.is_empty() {
        return vec![Line::from(Span::styled(
            "No recent events.",
            Style::default().fg(theme.muted),
        ))];
    }

    let total = app.logs.len();
    let max_scroll = total.saturating_sub(height);
    let scroll = app.log_scroll.min(max_scroll);
    let start = total.saturating_sub(height + scroll);
    let end = (start + height).min(total);

    app.logs[start..end]
        .iter()
        .map(|entry| {
            let (label, color) = match entry.level {
                LogLevel::Info => ("[i]", theme.accent),
                LogLevel::Warn => ("[!]", theme.warning),
                LogLevel::Error => ("[x]", theme.error),
            };
            Line::from(vec![
                Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(entry.message.clone(), Style::default().fg(theme.text)),
            ])
        })
        .collect()
}

fn draw_dialog(frame: &mut Frame<'_>, app: &App, theme: &Theme) {
    let Some(dialog) = &app.dialog else {
        return;
    };

    let area = frame.size();
    let message_lines: Vec<Line> = dialog
        .message
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();
    let content_height = message_lines.len().max(1) as u16;
    let height = (content_height + 6)
        .max(7)
        .min(area.height.saturating_sub(2));
    let width = area.width.saturating_mul(2) / 3;
    let width = width.clamp(34, area.width.saturating_sub(2).max(34));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let dialog_area = Rect::new(x, y, width, height).intersection(area);

    let yes_selected = matches!(dialog.choice, DialogChoice::Yes);
    let yes_style = if yes_selected {
        Style::default()
            .fg(Color::Black)
            .bg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };
    let no_style = if !yes_selected {
        Style::default()
            .fg(Color::Black)
            .bg(theme.warning)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };

    let buttons = Line::from(vec![
        Span::raw(" "),
        Span::styled(format!(" {} ", dialog.yes_label), yes_style),
        Span::raw("   "),
        Span::styled(format!(" {} ", dialog.no_label), no_style),
    ]);

    let mut lines = Vec::new();
    lines.push(Line::from(Span::styled(
        dialog.title.clone(),
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    lines.extend(message_lines);
    lines.push(Line::from(""));
    lines.push(buttons);

    frame.render_widget(Clear, dialog_area);
    let dialog_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent_soft))
        .style(Style::default().bg(theme.header_bg));
    let dialog_widget = Paragraph::new(lines)
        .block(dialog_block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(dialog_widget, dialog_area);
}

fn draw_toast(frame: &mut Frame<'_>, app: &App, theme: &Theme, body_area: Rect) {
    let Some(toast) = app.toast.as_ref() else {
        return;
    };
    if toast.expires_at <= Instant::now() {
        return;
    }

    let mut message = toast.message.clone();
    let max_width = body_area.width.saturating_sub(4).max(24);
    let max_text = max_width.saturating_sub(4) as usize;
    if message.len() > max_text {
        message.truncate(max_text.saturating_sub(3));
        message.push_str("...");
    }
    let width = (message.len() as u16 + 4).clamp(24, max_width);
    let x = body_area.x + (body_area.width.saturating_sub(width)) / 2;
    let toast_area = Rect::new(x, body_area.y + 1, width, 3).intersection(frame.size());

    let border = match toast.level {
        ToastLevel::Info => theme.accent,
        ToastLevel::Warn => theme.warning,
        ToastLevel::Error => theme.error,
    };

    frame.render_widget(Clear, toast_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.header_bg));
    let content = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(content, toast_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::{tests::app_in_temp_dir, Tab},
        controller::Controller,
        settings::{SettingKey, SettingValue},
    };

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
    }

    #[test]
    fn digits_edit_an_entry_only_after_it_is_activated() {
        let (_temp, mut app) = app_in_temp_dir();
        app.select_tab(Tab::Advanced);
        app.move_selection(1);
        assert_eq!(app.selected_control(), Some(SettingKey::Volume));
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.tab, Tab::Options);

        app.select_tab(Tab::Advanced);
        app.move_selection(1);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.tab, Tab::Advanced);
        assert_eq!(
            app.registry.control_for(SettingKey::Volume).unwrap().value(),
            "251"
        );
        assert_eq!(
            app.controller.value(SettingKey::Volume),
            Ok(SettingValue::Int(251))
        );

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.editing_entry, None);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.tab, Tab::Graphics);
    }

    #[test]
    fn tooltip_stays_on_screen() {
        let screen = Rect::new(0, 0, 80, 24);
        assert_eq!(tooltip_area(screen, 10, 5, 20, 3), Rect::new(10, 5, 20, 3));
        assert_eq!(tooltip_area(screen, 70, 5, 20, 3), Rect::new(60, 5, 20, 3));
        assert_eq!(tooltip_area(screen, 10, 23, 20, 3), Rect::new(10, 18, 20, 3));
        assert_eq!(tooltip_area(screen, 0, 0, 200, 3).width, 80);
    }
}
