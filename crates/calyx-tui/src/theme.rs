use calyx_core::Theme;
use ratatui::style::{Color, Modifier, Style};

/// Colors for the current theme. Built once from the config and rebuilt on toggle.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub accent: Color,
    pub user: Color,
    pub assistant: Color,
    pub text: Color,
    pub muted: Color,
    pub header_bg: Color,
    pub selection_bg: Color,
    pub error: Color,
    pub success: Color,
    pub warning: Color,
    pub console_fg: Color,
    pub console_bg: Color,
    pub code: Color,
    pub key_bg: Color,
    pub key_fg: Color,
    pub label_bg: Color,
    pub label_fg: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                accent: Color::Cyan,
                user: Color::Cyan,
                assistant: Color::Yellow,
                text: Color::White,
                muted: Color::DarkGray,
                header_bg: Color::DarkGray,
                selection_bg: Color::Rgb(40, 44, 52),
                error: Color::Red,
                success: Color::Green,
                warning: Color::Yellow,
                console_fg: Color::LightGreen,
                console_bg: Color::Black,
                code: Color::LightMagenta,
                key_bg: Color::DarkGray,
                key_fg: Color::White,
                label_bg: Color::Black,
                label_fg: Color::White,
            },
            Theme::Light => Self {
                accent: Color::Blue,
                user: Color::Blue,
                assistant: Color::Magenta,
                text: Color::Black,
                muted: Color::Gray,
                header_bg: Color::Gray,
                selection_bg: Color::Rgb(225, 230, 240),
                error: Color::Red,
                success: Color::Green,
                warning: Color::Rgb(180, 110, 0),
                console_fg: Color::Green,
                console_bg: Color::Rgb(30, 30, 30),
                code: Color::Magenta,
                key_bg: Color::Gray,
                key_fg: Color::Black,
                label_bg: Color::White,
                label_fg: Color::Black,
            },
        }
    }

    pub fn key_style(&self) -> Style {
        Style::default().bg(self.key_bg).fg(self.key_fg)
    }

    pub fn label_style(&self) -> Style {
        Style::default().bg(self.label_bg).fg(self.label_fg)
    }

    pub fn bold(&self, color: Color) -> Style {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}
