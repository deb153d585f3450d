use calyx_core::typewriter::CURSOR_GLYPH;
use calyx_core::yaml_block::raw_view;
use calyx_core::{
    parse_yaml_block, ChatMessage, ChatRole, ConsoleBlock, Locale, MessageBody, ModelState,
    StartupPhase, Typewriter,
};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode, Screen};
use crate::markdown::render_markdown;
use crate::theme::Palette;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::Settings => render_settings_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    // Popups, highest priority last
    if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
    if let Some(error) = app.backend_error.clone() {
        render_error_popup(app, frame, area, &error);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let palette = &app.palette;
    let model = app
        .current_model
        .as_ref()
        .map(|current| app.model_label(&current.key))
        .or_else(|| app.status.model_name.clone())
        .unwrap_or_else(|| "-".to_string());

    let status_color = match app.status.state {
        ModelState::Ready => palette.success,
        ModelState::Error => palette.error,
        ModelState::Loading | ModelState::NotDownloaded => palette.warning,
        ModelState::Checking | ModelState::Unknown => palette.muted,
    };

    let mut spans = vec![
        Span::styled(" Calyx AI ", palette.bold(palette.accent)),
        Span::raw(" "),
        Span::styled(model, Style::default().fg(palette.text)),
        Span::raw("  "),
        Span::styled("● ", Style::default().fg(status_color)),
        Span::styled(
            app.locale.model_state(app.status.state),
            Style::default().fg(status_color),
        ),
    ];
    if app.is_switching_model() {
        spans.push(Span::styled(
            format!("  {}", app.locale.placeholder_switching()),
            Style::default().fg(palette.warning).add_modifier(Modifier::ITALIC),
        ));
    }
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(palette.muted),
    ));
    if let Some(version) = &app.backend_version {
        spans.push(Span::styled(
            format!(" / backend {}", version),
            Style::default().fg(palette.muted),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.header_bg));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let palette = &app.palette;
    let key_style = palette.key_style();
    let label_style = palette.label_style();

    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(palette.accent).fg(palette.label_bg),
        InputMode::Editing => Style::default().bg(palette.warning).fg(palette.label_bg),
    };
    let mode_text = match (app.screen, app.input_mode) {
        (Screen::Settings, _) => " SETTINGS ",
        (Screen::Chat, InputMode::Normal) => " CHAT ",
        (Screen::Chat, InputMode::Editing) => " INPUT ",
    };

    let hints = if app.backend_error.is_some() {
        vec![
            Span::styled(" Esc ", key_style),
            Span::styled(" dismiss ", label_style),
        ]
    } else if app.show_model_picker {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" switch ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]
    } else {
        match (app.screen, app.input_mode) {
            (Screen::Settings, _) => vec![
                Span::styled(" T ", key_style),
                Span::styled(" theme ", label_style),
                Span::styled(" r ", key_style),
                Span::styled(" refresh ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" back ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ],
            (Screen::Chat, InputMode::Editing) => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" normal ", label_style),
            ],
            (Screen::Chat, InputMode::Normal) => {
                let mut hints = vec![
                    Span::styled(" i ", key_style),
                    Span::styled(" edit ", label_style),
                    Span::styled(" j/k ", key_style),
                    Span::styled(" select ", label_style),
                ];
                if let Some(message) = app.selected_message.and_then(|i| app.messages().get(i)) {
                    hints.extend(vec![
                        Span::styled(" t ", key_style),
                        Span::styled(" thinking ", label_style),
                        Span::styled(" c ", key_style),
                        Span::styled(" copy ", label_style),
                    ]);
                    if matches!(message.body, MessageBody::Yaml(_)) {
                        hints.extend(vec![
                            Span::styled(" v ", key_style),
                            Span::styled(" raw ", label_style),
                        ]);
                    }
                }
                hints.extend(vec![
                    Span::styled(" n ", key_style),
                    Span::styled(" new ", label_style),
                    Span::styled(" m ", key_style),
                    Span::styled(" model ", label_style),
                    Span::styled(" s ", key_style),
                    Span::styled(" settings ", label_style),
                    Span::styled(" q ", key_style),
                    Span::styled(" quit ", label_style),
                ]);
                hints
            }
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style.bold()), Span::raw(" ")];
    spans.extend(hints);
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    if app.messages().is_empty() && !app.session.is_processing() {
        render_welcome(app, frame, chat_area);
    } else {
        render_transcript(app, frame, chat_area);
    }
    render_input(app, frame, input_area);
}

fn render_welcome(app: &App, frame: &mut Frame, area: Rect) {
    let palette = &app.palette;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [_, title_area, gauge_area, step_area, _] = Layout::vertical([
        Constraint::Percentage(30),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Min(0),
    ])
    .areas(inner);

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            app.locale.welcome_title(),
            palette.bold(palette.accent),
        )),
        Line::default(),
        Line::from(Span::styled(
            app.locale.welcome_subtitle(),
            Style::default().fg(palette.muted),
        )),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(title, title_area);

    // Startup progress only while the backend is still coming up
    let Some(progress) = app.startup.as_ref() else {
        return;
    };
    if progress.status == StartupPhase::Ready {
        return;
    }

    let [_, gauge_area, _] = Layout::horizontal([
        Constraint::Percentage(20),
        Constraint::Percentage(60),
        Constraint::Percentage(20),
    ])
    .areas(gauge_area);

    let (color, step) = if progress.status == StartupPhase::Error {
        let detail = progress.error_message.clone().unwrap_or_default();
        (palette.error, format!("{}\n{}", progress.current_step, detail))
    } else {
        (palette.accent, progress.current_step.clone())
    };

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(color))
        .ratio((progress.progress_percentage / 100.0).clamp(0.0, 1.0))
        .label(format!("{:.0}%", progress.progress_percentage));
    frame.render_widget(gauge, gauge_area);

    let step = Paragraph::new(step)
        .style(Style::default().fg(palette.muted))
        .alignment(Alignment::Center);
    frame.render_widget(step, step_area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let palette = app.palette;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted));

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    app.chat_height = inner_height;

    let (lines, starts) = transcript_lines(app, &palette);
    let selected_offset = app
        .selected_message
        .and_then(|i| starts.get(i).copied())
        .map(|start| wrapped_rows(&lines[..start], inner_width));

    // Measure with the same wrapping the widget renders with
    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let total = u16::try_from(chat.line_count(inner_width)).unwrap_or(u16::MAX);
    let max_scroll = total.saturating_sub(inner_height);

    if app.follow_bottom {
        app.chat_scroll = max_scroll;
    } else if let Some(offset) = selected_offset {
        // Keep the selected message label on screen
        if offset < app.chat_scroll {
            app.chat_scroll = offset;
        } else if offset >= app.chat_scroll.saturating_add(inner_height) {
            app.chat_scroll = offset.saturating_sub(inner_height / 2);
        }
    }
    app.chat_scroll = app.chat_scroll.min(max_scroll);
    if app.chat_scroll == max_scroll && app.selected_message.is_none() {
        app.follow_bottom = true;
    }

    let chat = chat.block(block).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

/// Rows `lines` take once word-wrapped to `width`.
fn wrapped_rows(lines: &[Line<'static>], width: u16) -> u16 {
    let rows = Paragraph::new(lines.to_vec())
        .wrap(Wrap { trim: false })
        .line_count(width);
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// Lines for the whole conversation plus, per message, the index of its label line.
pub fn transcript_lines(app: &App, palette: &Palette) -> (Vec<Line<'static>>, Vec<usize>) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut starts = Vec::with_capacity(app.messages().len());

    for (index, message) in app.messages().iter().enumerate() {
        starts.push(lines.len());
        let selected = app.selected_message == Some(index);
        lines.push(role_line(message.role, selected, app.locale, palette));

        if let Some(thinking) = &message.thinking {
            let expanded = app.expanded_thinking.contains(&index);
            let marker = if expanded { "▾" } else { "▸" };
            lines.push(Line::from(Span::styled(
                format!("{} {}", marker, app.locale.thinking_label()),
                Style::default().fg(palette.muted),
            )));
            if expanded {
                let style = Style::default()
                    .fg(palette.muted)
                    .add_modifier(Modifier::ITALIC);
                for line in thinking.lines() {
                    lines.push(Line::from(Span::styled(format!("  {}", line), style)));
                }
            }
        }

        lines.extend(body_lines(app, index, message, palette));
        lines.push(Line::default());
    }

    if app.session.is_processing() {
        lines.push(role_line(ChatRole::Assistant, false, app.locale, palette));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}{}", app.locale.placeholder_processing().trim_end_matches('.'), dots),
            Style::default()
                .fg(palette.muted)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    (lines, starts)
}

fn role_line(role: ChatRole, selected: bool, locale: Locale, palette: &Palette) -> Line<'static> {
    let label = locale.role_label(role);
    let color = match role {
        ChatRole::User => palette.user,
        ChatRole::Assistant => palette.assistant,
    };
    let marker = if selected { "> " } else { "" };
    let mut style = palette.bold(color);
    if selected {
        style = style.bg(palette.selection_bg);
    }
    Line::from(Span::styled(format!("{}{}", marker, label), style))
}

fn body_lines(
    app: &App,
    index: usize,
    message: &ChatMessage,
    palette: &Palette,
) -> Vec<Line<'static>> {
    match &message.body {
        MessageBody::Plain(text) => text
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(palette.text))))
            .collect(),
        MessageBody::Markdown(text) => render_markdown(text, palette),
        MessageBody::Yaml(text) if app.raw_yaml.contains(&index) => raw_yaml_lines(text, palette),
        MessageBody::Yaml(text) => yaml_lines(app, text, palette),
        MessageBody::Console(block) => console_lines(block, app.typewriters.get(&index), palette),
    }
}

/// Key/value table for a YAML block, or the raw text with a notice when it doesn't parse.
fn yaml_lines(app: &App, text: &str, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match parse_yaml_block(text) {
        Ok(block) => {
            if let Some(header) = block.header.as_ref() {
                lines.push(Line::from(Span::styled(
                    header.clone(),
                    palette.bold(palette.accent),
                )));
            }
            let rows = block.table_rows();
            let key_width = rows
                .iter()
                .map(|(key, _)| key.chars().count())
                .max()
                .unwrap_or(0);
            for (key, value) in rows {
                let padding = " ".repeat(key_width.saturating_sub(key.chars().count()));
                lines.push(Line::from(vec![
                    Span::styled(format!("{}{}", key, padding), palette.bold(palette.text)),
                    Span::styled(" │ ", Style::default().fg(palette.muted)),
                    Span::styled(value, Style::default().fg(palette.text)),
                ]));
            }
        }
        Err(err) => {
            tracing::debug!("yaml block not tabular: {}", err);
            for line in raw_view(text).lines() {
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(palette.muted),
                )));
            }
            lines.push(Line::from(Span::styled(
                app.locale.parse_error(),
                Style::default().fg(palette.error),
            )));
        }
    }
    lines
}

/// The block as written, minus its `id` lines.
fn raw_yaml_lines(text: &str, palette: &Palette) -> Vec<Line<'static>> {
    raw_view(text)
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(palette.code))))
        .collect()
}

/// Console block: a title bar and the typed-out transcript with its cursor.
fn console_lines(
    block: &ConsoleBlock,
    typewriter: Option<&Typewriter>,
    palette: &Palette,
) -> Vec<Line<'static>> {
    let frame_style = Style::default().bg(palette.console_bg);
    let text_style = frame_style.fg(palette.console_fg);

    let mut lines = vec![Line::from(Span::styled(
        format!(" {} {} ", block.icon(), block.label()),
        frame_style.fg(palette.text).add_modifier(Modifier::BOLD),
    ))];

    let content = block.content();
    let (visible, cursor) = match typewriter {
        Some(typewriter) => (typewriter.visible_text().to_string(), typewriter.cursor_visible()),
        None => (content, true),
    };

    let mut body: Vec<String> = visible.split('\n').map(|line| format!(" {}", line)).collect();
    if cursor {
        if let Some(last) = body.last_mut() {
            last.push_str(CURSOR_GLYPH);
        }
    }
    lines.extend(
        body.into_iter()
            .map(|line| Line::from(Span::styled(line, text_style))),
    );
    lines
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let palette = &app.palette;
    let enabled = app.input_enabled();
    let border_color = if !enabled {
        palette.muted
    } else if app.input_mode == InputMode::Editing {
        palette.warning
    } else {
        palette.accent
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() {
        Paragraph::new(app.placeholder())
            .style(Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC))
    } else {
        let visible_text: String = app
            .input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(palette.user))
    };
    frame.render_widget(input.block(input_block), area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing && enabled {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_settings_screen(app: &App, frame: &mut Frame, area: Rect) {
    let palette = &app.palette;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .title(" Settings ");

    let label = |text: &str| Span::styled(format!("{:<14}", text), palette.bold(palette.muted));
    let value = |text: String| Span::styled(text, Style::default().fg(palette.text));
    let status = &app.status;

    let mut lines = vec![
        Line::from(vec![
            label("Theme"),
            value(format!("{:?}", app.config.theme).to_lowercase()),
        ]),
        Line::from(vec![label("Backend"), value(app.client.base_url().to_string())]),
        Line::from(vec![
            label("Version"),
            value(app.backend_version.clone().unwrap_or_else(|| "-".to_string())),
        ]),
        Line::default(),
        Line::from(Span::styled("Model", palette.bold(palette.accent))),
        Line::from(vec![
            label("Status"),
            value(app.locale.model_state(status.state).to_string()),
        ]),
    ];
    if !status.message.is_empty() {
        lines.push(Line::from(vec![label("Message"), value(status.message.clone())]));
    }
    if let Some(name) = &status.model_name {
        lines.push(Line::from(vec![label("Name"), value(name.clone())]));
    }
    if let Some(device) = &status.device {
        lines.push(Line::from(vec![label("Device"), value(device.clone())]));
    }
    if let Some(downloaded) = status.is_downloaded {
        lines.push(Line::from(vec![
            label("Downloaded"),
            value(if downloaded { "yes" } else { "no" }.to_string()),
        ]));
    }
    if let Some(size) = status.cache_size_mb {
        lines.push(Line::from(vec![label("Cache size"), value(format!("{:.1} MB", size))]));
    }
    if let Some(path) = &status.cache_path {
        lines.push(Line::from(vec![label("Cache path"), value(path.clone())]));
    }
    if let Some(progress) = status.progress_percentage {
        lines.push(Line::from(vec![label("Progress"), value(format!("{:.0}%", progress))]));
    }
    if let Some(supervisor) = &app.supervisor {
        lines.push(Line::default());
        lines.push(Line::from(vec![
            label("Backend pid"),
            value(supervisor.pid().to_string()),
        ]));
    }

    let settings = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(settings, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let palette = app.palette;
    let keys = app.model_keys();
    let current = app.current_model.as_ref().map(|c| c.key.clone());

    let popup_area = centered(area, 48, keys.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .title(" Modelo (Enter cambiar, Esc cancelar) ");

    let items: Vec<ListItem> = keys
        .iter()
        .map(|key| {
            let style = if Some(key) == current.as_ref() {
                palette.bold(palette.success)
            } else {
                Style::default().fg(palette.text)
            };
            ListItem::new(format!(" {} ", app.model_label(key))).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(palette.selection_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

fn render_error_popup(app: &App, frame: &mut Frame, area: Rect, error: &str) {
    let palette = &app.palette;
    let popup_area = centered(area, 64, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.error))
        .title(" Backend ");

    let text = Paragraph::new(error.to_string())
        .style(Style::default().fg(palette.text))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(text, popup_area);
}
