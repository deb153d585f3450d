//! Markdown to styled lines, driven by `pulldown_cmark`: headings, lists, tables, code blocks
//! and inline bold, italic and code spans.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::theme::Palette;

/// Render a whole markdown text. Top-level blocks are separated by one blank line.
pub fn render_markdown(text: &str, palette: &Palette) -> Vec<Line<'static>> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);

    let mut renderer = Renderer::new(palette);
    for event in Parser::new_ext(text, opts) {
        renderer.event(event);
    }
    renderer.finish()
}

struct Renderer<'p> {
    palette: &'p Palette,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    bold: usize,
    italic: usize,
    strike: usize,
    heading: bool,
    code_block: bool,
    /// Next number for ordered lists, `None` for bullets
    lists: Vec<Option<u64>>,
    /// Set between an item's marker and its first text
    item_start: bool,
    in_table: bool,
    table_head: bool,
    cell_index: usize,
}

impl<'p> Renderer<'p> {
    fn new(palette: &'p Palette) -> Self {
        Self {
            palette,
            lines: Vec::new(),
            current: Vec::new(),
            bold: 0,
            italic: 0,
            strike: 0,
            heading: false,
            code_block: false,
            lists: Vec::new(),
            item_start: false,
            in_table: false,
            table_head: false,
            cell_index: 0,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.code_block {
                    let style = Style::default().fg(self.palette.code);
                    for line in text.lines() {
                        self.lines
                            .push(Line::from(Span::styled(format!("  {}", line), style)));
                    }
                } else {
                    let style = self.inline_style();
                    self.push(text.into_string(), style);
                }
            }
            Event::Code(code) => {
                let style = Style::default().fg(self.palette.code);
                self.push(code.into_string(), style);
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push(html.trim_end().to_string(), Style::default());
            }
            Event::SoftBreak | Event::HardBreak => {
                self.flush();
                if !self.lists.is_empty() {
                    self.push("  ".repeat(self.lists.len()), Style::default());
                }
            }
            Event::Rule => {
                self.start_block();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(24),
                    Style::default().fg(self.palette.muted),
                )));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if !self.item_start {
                    self.start_block();
                }
            }
            Tag::Heading { .. } => {
                self.start_block();
                self.heading = true;
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.start_block();
                } else {
                    self.flush();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{}. ", next);
                        *next += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.push(format!("{}{}", "  ".repeat(depth), marker), Style::default());
                self.item_start = true;
            }
            Tag::CodeBlock(_) => {
                self.start_block();
                self.code_block = true;
            }
            Tag::Table(_) => {
                self.start_block();
                self.in_table = true;
            }
            Tag::TableHead => {
                self.table_head = true;
                self.cell_index = 0;
            }
            Tag::TableRow => self.cell_index = 0,
            Tag::TableCell => {
                if self.cell_index > 0 {
                    self.push(" │ ".to_string(), Style::default().fg(self.palette.muted));
                }
                self.cell_index += 1;
            }
            Tag::Emphasis => self.italic += 1,
            Tag::Strong => self.bold += 1,
            Tag::Strikethrough => self.strike += 1,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Item | TagEnd::TableRow => self.flush(),
            TagEnd::Heading(_) => {
                self.flush();
                self.heading = false;
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::CodeBlock => {
                self.flush();
                self.code_block = false;
            }
            TagEnd::TableHead => {
                self.flush();
                self.table_head = false;
            }
            TagEnd::Table => {
                self.flush();
                self.in_table = false;
            }
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            _ => {}
        }
    }

    fn inline_style(&self) -> Style {
        if self.heading {
            return self.palette.bold(self.palette.accent);
        }
        let mut style = Style::default();
        if self.bold > 0 || self.table_head {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strike > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        style
    }

    /// Append to the current line, merging with the previous span when the style matches.
    fn push(&mut self, text: String, style: Style) {
        if text.is_empty() {
            return;
        }
        self.item_start = false;
        match self.current.last_mut() {
            Some(last) if last.style == style => last.content.to_mut().push_str(&text),
            _ => self.current.push(Span::styled(text, style)),
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
        self.item_start = false;
    }

    /// Close the current line and leave a gap before a new top-level block.
    fn start_block(&mut self) {
        self.flush();
        let top_level = self.lists.is_empty() && !self.in_table;
        if top_level && self.lines.last().is_some_and(|line| line.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        self.lines
    }
}
