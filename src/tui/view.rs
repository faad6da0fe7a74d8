use crate::board::{BoardState, CardAction, CardView, ColorTag, ColumnView, OVERDUE_NOTICE};
use crate::calendar::EVENT_ACCENT;
use crate::chat::{SUGGESTIONS, Sender};
use crate::markup::{COPIED_LABEL, COPY_LABEL, LineKind, RichLine, SpanStyle};
use crate::prefs::Theme;
use crate::tui::state::{AppState, HitTarget, Hitbox, Modal, Page, TaskForm};
use chrono::Datelike;
use unicode_width::UnicodeWidthChar;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

const CARD_HEIGHT: u16 = 6;

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    fg: Color,
    dim: Color,
    accent: Color,
    danger: Color,
    code: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                bg: Color::Rgb(0xF5, 0xF5, 0xF5),
                fg: Color::Black,
                dim: Color::DarkGray,
                accent: Color::Rgb(0x4A, 0x6C, 0xF7),
                danger: Color::Red,
                code: Color::Rgb(0xB3, 0x5C, 0x00),
            },
            Theme::Dark => Self {
                bg: Color::Rgb(0x18, 0x18, 0x1B),
                fg: Color::Rgb(0xE6, 0xE6, 0xE6),
                dim: Color::Gray,
                accent: Color::Cyan,
                danger: Color::LightRed,
                code: Color::Yellow,
            },
        }
    }

    fn base(&self) -> Style {
        Style::default().bg(self.bg).fg(self.fg)
    }
}

fn rgb(tag: ColorTag) -> Color {
    Color::Rgb(tag.0, tag.1, tag.2)
}

pub fn draw(f: &mut Frame, state: &mut AppState) {
    let palette = Palette::for_theme(state.session.theme());
    let mut hits = Vec::new();

    f.render_widget(Block::default().style(palette.base()), f.area());

    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_tabs(f, v_chunks[0], state, palette, &mut hits);
    match state.page {
        Page::Board => draw_board(f, v_chunks[1], state, palette, &mut hits),
        Page::Calendar => draw_calendar(f, v_chunks[1], state, palette),
        Page::AskAi => draw_ai(f, v_chunks[1], state, palette, &mut hits),
    }
    draw_footer(f, v_chunks[2], state, palette);
    draw_modal(f, state, palette);

    state.hitboxes = hits;
}

fn draw_tabs(f: &mut Frame, area: Rect, state: &AppState, pal: Palette, hits: &mut Vec<Hitbox>) {
    let mut x = area.x;
    for (n, page) in Page::ALL.iter().enumerate() {
        let label = format!(" {} {} ", n + 1, page.title());
        let width = label.chars().count() as u16;
        if x + width > area.x + area.width {
            break;
        }
        let style = if *page == state.page {
            Style::default()
                .fg(pal.bg)
                .bg(pal.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(pal.dim)
        };
        let rect = Rect::new(x, area.y, width, 1);
        f.render_widget(Paragraph::new(Span::styled(label, style)), rect);
        hits.push(Hitbox {
            area: rect,
            inner: rect,
            target: HitTarget::Tab(*page),
        });
        x += width + 1;
    }

    let live = if state.push_connected {
        Span::styled("● live ", Style::default().fg(Color::Green))
    } else {
        Span::styled("○ offline ", Style::default().fg(pal.dim))
    };
    let right = Line::from(vec![
        live,
        Span::styled(
            format!("theme: {} ", state.session.theme()),
            Style::default().fg(pal.dim),
        ),
    ]);
    f.render_widget(Paragraph::new(right).alignment(Alignment::Right), area);
}

// --- BOARD ---

fn draw_board(f: &mut Frame, area: Rect, state: &AppState, pal: Palette, hits: &mut Vec<Hitbox>) {
    let view = match state.session.board() {
        BoardState::Ready(view) => view,
        BoardState::Loading => {
            let p = Paragraph::new("Loading...")
                .style(Style::default().fg(pal.dim))
                .alignment(Alignment::Center);
            f.render_widget(p, area);
            return;
        }
        BoardState::Failed(msg) => {
            let p = Paragraph::new(msg.as_str())
                .style(Style::default().fg(pal.danger))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title(" Board "));
            f.render_widget(p, area);
            return;
        }
    };

    let h_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    for (column, chunk) in view.columns.iter().zip(h_chunks.iter()) {
        draw_column(f, *chunk, state, column, pal, hits);
    }
}

fn draw_column(
    f: &mut Frame,
    area: Rect,
    state: &AppState,
    column: &ColumnView,
    pal: Palette,
    hits: &mut Vec<Hitbox>,
) {
    let focused = state.focus_bucket == column.bucket;
    let border = if focused {
        Style::default().fg(pal.accent)
    } else {
        Style::default().fg(pal.dim)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(format!(" {} ({}) ", column.title, column.count));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut cards_area = inner;
    if column.has_add_button && inner.height > 0 {
        let button = Rect {
            y: inner.y + inner.height - 1,
            height: 1,
            ..inner
        };
        cards_area.height -= 1;
        let p = Paragraph::new("[+ Add Task]")
            .style(Style::default().fg(pal.accent).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);
        f.render_widget(p, button);
        hits.push(Hitbox {
            area: button,
            inner: button,
            target: HitTarget::AddButton,
        });
    }

    if column.cards.is_empty() {
        let p = Paragraph::new("No tasks.")
            .style(Style::default().fg(pal.dim))
            .alignment(Alignment::Center);
        f.render_widget(p, cards_area);
        return;
    }

    let visible = (cards_area.height / CARD_HEIGHT).max(1) as usize;
    let selected = state.selected_index(column.bucket);
    let offset = if selected >= visible {
        selected + 1 - visible
    } else {
        0
    };

    let bottom = cards_area.y + cards_area.height;
    for (slot, (index, card)) in column
        .cards
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .enumerate()
    {
        let y = cards_area.y + slot as u16 * CARD_HEIGHT;
        let height = CARD_HEIGHT.min(bottom.saturating_sub(y));
        if height < 3 {
            break;
        }
        let rect = Rect::new(cards_area.x, y, cards_area.width, height);
        let card_inner = draw_card(f, rect, card, focused && index == selected, pal);
        hits.push(Hitbox {
            area: rect,
            inner: card_inner,
            target: HitTarget::Card {
                bucket: column.bucket,
                index,
            },
        });
    }
}

/// Draws one card and returns its inner area (what hit-testing uses).
fn draw_card(f: &mut Frame, rect: Rect, card: &CardView, selected: bool, pal: Palette) -> Rect {
    let mut border = Style::default().fg(rgb(card.color));
    if selected {
        border = border.add_modifier(Modifier::BOLD);
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if selected {
            BorderType::Thick
        } else {
            BorderType::Rounded
        })
        .border_style(border);
    let inner = block.inner(rect);
    f.render_widget(block, rect);
    if inner.width == 0 || inner.height == 0 {
        return inner;
    }

    let mut text = Style::default().fg(pal.fg);
    if card.completed {
        text = text.add_modifier(Modifier::CROSSED_OUT | Modifier::DIM);
    }

    let actions = card.action_spans(inner.width);
    let title_width = actions
        .first()
        .map(|(_, start, _)| start.saturating_sub(1))
        .unwrap_or(inner.width);
    let title = Span::styled(card.title.clone(), text.add_modifier(Modifier::BOLD));
    f.render_widget(
        Paragraph::new(title),
        Rect {
            width: title_width,
            height: 1,
            ..inner
        },
    );
    for (action, start, end) in actions {
        let style = match action {
            CardAction::Complete => Style::default().fg(Color::Green),
            CardAction::Delete => Style::default().fg(pal.danger),
        };
        f.render_widget(
            Paragraph::new(Span::styled(action.label(), style)),
            Rect::new(inner.x + start, inner.y, end - start, 1),
        );
    }

    let mut lines = vec![
        Line::styled(card.description.clone(), text.fg(pal.dim)),
        Line::styled(format!("Deadline: {}", card.deadline), text),
    ];
    if card.overdue {
        lines.push(Line::styled(
            OVERDUE_NOTICE,
            Style::default().fg(pal.danger).add_modifier(Modifier::BOLD),
        ));
    }
    let body = Rect {
        y: inner.y + 1,
        height: inner.height.saturating_sub(1),
        ..inner
    };
    f.render_widget(Paragraph::new(lines), body);
    inner
}

// --- CALENDAR ---

fn draw_calendar(f: &mut Frame, area: Rect, state: &AppState, pal: Palette) {
    let Some(cal) = state.session.calendar().instance() else {
        let p = Paragraph::new("Loading...")
            .style(Style::default().fg(pal.dim))
            .alignment(Alignment::Center);
        f.render_widget(p, area);
        return;
    };

    let h_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(38), Constraint::Min(0)])
        .split(area);

    let header = Style::default().fg(pal.dim).add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::styled(
        " Mo   Tu   We   Th   Fr   Sa   Su",
        header,
    )];
    for week in cal.weeks() {
        let mut spans = Vec::with_capacity(21);
        for day in week {
            let mut style = Style::default().fg(if day.in_month { pal.fg } else { pal.dim });
            if day.is_today {
                style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
            }
            spans.push(Span::styled(format!("{:>3}", day.date.day()), style));
            if day.event_count > 0 {
                spans.push(Span::styled("•", Style::default().fg(rgb(EVENT_ACCENT))));
            } else {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }

    let grid = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(pal.accent))
            .title(format!(" ◀ {} ▶ ", cal.title())),
    );
    f.render_widget(grid, h_chunks[0]);

    let month = cal.month();
    let mut events: Vec<_> = cal
        .events()
        .iter()
        .filter(|e| e.date.year() == month.year() && e.date.month() == month.month())
        .collect();
    events.sort_by_key(|e| e.date);
    let items: Vec<ListItem> = events
        .iter()
        .map(|e| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    e.date.format("%a %d ").to_string(),
                    Style::default().fg(pal.dim),
                ),
                Span::styled("● ", Style::default().fg(rgb(e.color))),
                Span::raw(e.title.clone()),
            ]))
        })
        .collect();
    let title = if items.is_empty() {
        " No deadlines this month "
    } else {
        " Deadlines "
    };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(list, h_chunks[1]);
}

// --- ASK AI ---

fn span_style(base: Style, s: SpanStyle, pal: Palette) -> Style {
    let mut style = base;
    if s.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if s.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if s.strike {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if s.code {
        style = style.fg(pal.code);
    }
    if s.link {
        style = style.fg(pal.accent).add_modifier(Modifier::UNDERLINED);
    }
    if s.math {
        style = style.fg(Color::Magenta);
    }
    style
}

fn rich_line_spans(line: &RichLine, pal: Palette) -> Vec<Span<'static>> {
    let (prefix, base) = match line.kind {
        LineKind::Heading(_) => (None, Style::default().fg(pal.accent).add_modifier(Modifier::BOLD)),
        LineKind::Code => (Some("│ "), Style::default().fg(pal.code)),
        LineKind::Quote => (
            Some("▌ "),
            Style::default().fg(pal.dim).add_modifier(Modifier::ITALIC),
        ),
        _ => (None, Style::default().fg(pal.fg)),
    };
    let mut spans = Vec::with_capacity(line.spans.len() + 1);
    if let Some(prefix) = prefix {
        spans.push(Span::styled(prefix, Style::default().fg(pal.dim)));
    }
    for s in &line.spans {
        spans.push(Span::styled(s.text.clone(), span_style(base, s.style, pal)));
    }
    spans
}

/// Hard-wraps styled spans at `width` terminal cells. Wide glyphs never
/// straddle the edge.
fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![Line::from(spans)];
    }
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0;
    for span in spans {
        let style = span.style;
        let mut buf = String::new();
        for ch in span.content.chars() {
            let cells = ch.width().unwrap_or(0);
            if used > 0 && used + cells > width {
                if !buf.is_empty() {
                    current.push(Span::styled(std::mem::take(&mut buf), style));
                }
                lines.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }
            buf.push(ch);
            used += cells;
        }
        if !buf.is_empty() {
            current.push(Span::styled(buf, style));
        }
    }
    lines.push(Line::from(current));
    lines
}

fn draw_ai(f: &mut Frame, area: Rect, state: &AppState, pal: Palette, hits: &mut Vec<Hitbox>) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);

    // Sidebar: selected task and suggestion chips.
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(SUGGESTIONS.len() as u16 + 2),
        ])
        .split(cols[0]);

    let selection = state.session.ai_selection();
    let context_lines = match selection {
        Some(task) => vec![
            Line::styled(task.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Line::styled(
                format!("Deadline: {}", task.deadline_display),
                Style::default().fg(pal.dim),
            ),
            Line::default(),
            Line::raw(task.description.clone()),
            Line::default(),
            Line::styled("Ctrl+X: clear", Style::default().fg(pal.dim)),
        ],
        None => vec![
            Line::raw("No task selected."),
            Line::default(),
            Line::styled("Ctrl+T: pick a task", Style::default().fg(pal.dim)),
        ],
    };
    let context = Paragraph::new(context_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Context "));
    f.render_widget(context, side[0]);

    let chips_block = Block::default()
        .borders(Borders::ALL)
        .title(" Suggestions (Alt+1-4) ");
    let chips_inner = chips_block.inner(side[1]);
    f.render_widget(chips_block, side[1]);
    for (i, (label, _)) in SUGGESTIONS.iter().enumerate() {
        if i as u16 >= chips_inner.height {
            break;
        }
        let rect = Rect::new(chips_inner.x, chips_inner.y + i as u16, chips_inner.width, 1);
        let style = if selection.is_some() {
            Style::default().fg(pal.accent)
        } else {
            Style::default().fg(pal.dim).add_modifier(Modifier::DIM)
        };
        f.render_widget(
            Paragraph::new(Span::styled(format!("[{}] {}", i + 1, label), style)),
            rect,
        );
        if selection.is_some() {
            hits.push(Hitbox {
                area: rect,
                inner: rect,
                target: HitTarget::Suggestion(i),
            });
        }
    }

    // Chat log and input.
    let chat_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(cols[1]);

    let block = Block::default().borders(Borders::ALL).title(" Chat ");
    let inner = block.inner(chat_chunks[0]);
    f.render_widget(block, chat_chunks[0]);

    let width = inner.width as usize;
    let chat = state.session.chat();
    let mut rows: Vec<(Line<'static>, Option<HitTarget>)> = Vec::new();
    for (mi, message) in chat.messages().iter().enumerate() {
        let header = match message.sender {
            Sender::User => Line::styled(
                "You",
                Style::default().fg(pal.accent).add_modifier(Modifier::BOLD),
            ),
            Sender::Ai => Line::styled(
                "AI",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        };
        rows.push((header, None));

        let rich = message.content.rich();
        for line in &rich.lines {
            match line.kind {
                LineKind::CopyButton(n) => {
                    let label = if state.is_copied(mi, n) {
                        COPIED_LABEL
                    } else {
                        COPY_LABEL
                    };
                    rows.push((
                        Line::styled(format!("[{}]", label), Style::default().fg(pal.accent)),
                        Some(HitTarget::CopyButton {
                            message: mi,
                            block: n,
                        }),
                    ));
                }
                LineKind::Rule => {
                    rows.push((Line::styled("─".repeat(width), Style::default().fg(pal.dim)), None));
                }
                _ => {
                    for wrapped in wrap_spans(rich_line_spans(line, pal), width) {
                        rows.push((wrapped, None));
                    }
                }
            }
        }
        rows.push((Line::default(), None));
    }

    // Scrolled up from the bottom by `scroll_back` rows.
    let height = inner.height as usize;
    let max_start = rows.len().saturating_sub(height);
    let back = (chat.scroll_back() as usize).min(max_start);
    let start = max_start - back;
    for (row, (line, target)) in rows.into_iter().skip(start).take(height).enumerate() {
        let rect = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        if let Some(target) = target {
            let label = Rect {
                width: (line.width() as u16).min(inner.width),
                ..rect
            };
            hits.push(Hitbox {
                area: label,
                inner: label,
                target,
            });
        }
        f.render_widget(Paragraph::new(line), rect);
    }

    let input = Paragraph::new(state.ai_input.buffer.clone()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(pal.accent))
            .title(" Ask (Enter to send) "),
    );
    f.render_widget(input, chat_chunks[1]);
    if state.modal.is_none() {
        f.set_cursor_position((
            chat_chunks[1].x + 1 + state.ai_input.cursor_position as u16,
            chat_chunks[1].y + 1,
        ));
    }
}

// --- FOOTER ---

fn draw_footer(f: &mut Frame, area: Rect, state: &AppState, pal: Palette) {
    let f_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let mut message = state.message.clone();
    if state.loading {
        message.push_str(" ⟳");
    }
    let status = Paragraph::new(message)
        .style(Style::default().fg(pal.accent))
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::TOP | Borders::BOTTOM)
                .title(" Status "),
        );

    let help_str = match state.page {
        Page::Board => "a:Add | Enter:Open | c:Done | d:Del | e:Edit | s:Sync | r:Reload | t:Theme | ,:Settings | q:Quit",
        Page::Calendar => "←/→:Month | g:Today | s:Sync | t:Theme | ,:Settings | q:Quit",
        Page::AskAi => "Enter:Send | Ctrl+T:Task | Ctrl+X:Clear | Ctrl+Y:Copy code | PgUp/PgDn | Esc:Board",
    };
    let help = Paragraph::new(help_str)
        .style(Style::default().fg(pal.dim))
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::TOP | Borders::BOTTOM)
                .title(" Actions "),
        );
    f.render_widget(status, f_chunks[0]);
    f.render_widget(help, f_chunks[1]);
}

// --- MODALS ---

fn draw_modal(f: &mut Frame, state: &AppState, pal: Palette) {
    let Some(modal) = &state.modal else {
        return;
    };
    match modal {
        Modal::Alert(text) => {
            let area = centered_rect(50, 30, f.area());
            let p = Paragraph::new(vec![
                Line::raw(text.clone()),
                Line::default(),
                Line::styled("(Enter to dismiss)", Style::default().fg(pal.dim)),
            ])
            .wrap(Wrap { trim: true })
            .style(pal.base())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow))
                    .title(" Notice "),
            );
            f.render_widget(Clear, area);
            f.render_widget(p, area);
        }
        Modal::ConfirmDelete(id) => {
            let area = centered_rect(40, 20, f.area());
            let title = state
                .session
                .task(id)
                .map(|t| t.title.clone())
                .unwrap_or_else(|| "this task".to_string());
            let p = Paragraph::new(vec![
                Line::raw(format!("Are you sure you want to delete \"{}\"?", title)),
                Line::default(),
                Line::styled("y: Delete   n: Cancel", Style::default().fg(pal.dim)),
            ])
            .wrap(Wrap { trim: true })
            .style(pal.base())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(pal.danger))
                    .title(" Delete "),
            );
            f.render_widget(Clear, area);
            f.render_widget(p, area);
        }
        Modal::ViewTask(id) => {
            let area = centered_rect(60, 50, f.area());
            let lines = match state.session.task(id) {
                Some(task) => {
                    let mut lines = vec![
                        Line::styled(task.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                        Line::styled(
                            format!("Deadline: {}", task.deadline_display),
                            Style::default().fg(pal.dim),
                        ),
                    ];
                    if task.is_overdue_at(chrono::Utc::now()) {
                        lines.push(Line::styled(
                            OVERDUE_NOTICE,
                            Style::default().fg(pal.danger).add_modifier(Modifier::BOLD),
                        ));
                    }
                    lines.push(Line::default());
                    lines.extend(task.description.lines().map(|l| Line::raw(l.to_string())));
                    lines.push(Line::default());
                    lines.push(Line::styled(
                        "e: Edit | c: Complete | d: Delete | Esc: Close",
                        Style::default().fg(pal.dim),
                    ));
                    lines
                }
                None => vec![Line::raw("This task no longer exists.")],
            };
            let p = Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .style(pal.base())
                .block(Block::default().borders(Borders::ALL).title(" Task "));
            f.render_widget(Clear, area);
            f.render_widget(p, area);
        }
        Modal::AddTask(form) => draw_task_form(f, " Add Task ", form, pal),
        Modal::EditTask(_, form) => draw_task_form(f, " Edit Task ", form, pal),
        Modal::Settings(form) => {
            let area = centered_rect(60, 50, f.area());
            f.render_widget(Clear, area);
            let block = Block::default()
                .borders(Borders::ALL)
                .style(pal.base())
                .title(" Settings ");
            let inner = block.inner(area);
            f.render_widget(block, area);

            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Length(1),
                    Constraint::Min(0),
                ])
                .split(inner);
            for (i, label) in crate::tui::state::SettingsForm::LABELS.iter().enumerate() {
                let focused = form.focus == i;
                let value = if form.loading {
                    "Loading...".to_string()
                } else {
                    form.fields[i].buffer.clone()
                };
                draw_input(f, rows[i], label, &value, focused, pal);
                if focused && !form.loading {
                    f.set_cursor_position((
                        rows[i].x + 1 + form.fields[i].cursor_position as u16,
                        rows[i].y + 1,
                    ));
                }
            }
            f.render_widget(
                Paragraph::new(format!("Theme: {} (Ctrl+T to switch)", state.session.theme())),
                rows[2],
            );
            f.render_widget(
                Paragraph::new("Tab: Next field | Enter: Save | Esc: Close")
                    .style(Style::default().fg(pal.dim)),
                rows[3],
            );
        }
        Modal::SelectTask(list_state) => {
            let area = centered_rect(60, 50, f.area());
            let items: Vec<ListItem> = crate::chat::selectable_tasks(state.session.tasks())
                .iter()
                .map(|t| ListItem::new(crate::chat::selector_label(t)))
                .collect();
            let title = if items.is_empty() {
                " No upcoming tasks "
            } else {
                " Ask about... "
            };
            let popup = List::new(items)
                .style(pal.base())
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Yellow)),
                )
                .highlight_style(
                    Style::default()
                        .add_modifier(Modifier::BOLD)
                        .bg(pal.accent)
                        .fg(pal.bg),
                );
            let mut list_state = list_state.clone();
            f.render_widget(Clear, area);
            f.render_stateful_widget(popup, area, &mut list_state);
        }
    }
}

fn draw_input(f: &mut Frame, area: Rect, label: &str, value: &str, focused: bool, pal: Palette) {
    let border = if focused {
        Style::default().fg(pal.accent)
    } else {
        Style::default().fg(pal.dim)
    };
    let p = Paragraph::new(value.to_string()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(format!(" {} ", label)),
    );
    f.render_widget(p, area);
}

fn draw_task_form(f: &mut Frame, title: &str, form: &TaskForm, pal: Palette) {
    let area = centered_rect(60, 60, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .style(pal.base())
        .title(title.to_string());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    for (i, label) in TaskForm::LABELS.iter().enumerate() {
        let focused = form.focus == i;
        draw_input(f, rows[i], label, &form.fields[i].buffer, focused, pal);
        if focused {
            f.set_cursor_position((
                rows[i].x + 1 + form.fields[i].cursor_position as u16,
                rows[i].y + 1,
            ));
        }
    }
    if let Some(error) = &form.error {
        f.render_widget(
            Paragraph::new(error.as_str()).style(Style::default().fg(pal.danger)),
            rows[3],
        );
    }
    f.render_widget(
        Paragraph::new("Deadline is free text, e.g. 'tomorrow 17:00'.\nTab: Next field | Enter: Next/Save | Esc: Cancel")
            .style(Style::default().fg(pal.dim)),
        rows[4],
    );
}

/// Helper function to create a centered rect using up certain percentages of the available rect.
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
