//! Color scheme and styles (atop-style).

use ratatui::style::{Color, Modifier, Style};

use crate::view::RowStyleClass;

/// Atop-style color palette.
pub struct Theme;

impl Theme {
    pub const BG: Color = Color::Reset;
    pub const HEADER_BG: Color = Color::Blue;

    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;
    pub const HEADER_FG: Color = Color::White;

    pub const HIGHLIGHT_LIVE: Color = Color::Green;
    pub const HIGHLIGHT_PAUSED: Color = Color::Yellow;
    pub const HIGHLIGHT_CRITICAL: Color = Color::Red;

    pub const TITLE: Color = Color::Cyan;
}

/// Pre-defined styles.
pub struct Styles;

impl Styles {
    /// Default text style.
    pub fn default() -> Style {
        Style::default().fg(Theme::FG).bg(Theme::BG)
    }

    /// Header bar style.
    pub fn header() -> Style {
        Style::default()
            .fg(Theme::HEADER_FG)
            .bg(Theme::HEADER_BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Table header style.
    pub fn table_header() -> Style {
        Style::default()
            .fg(Theme::HEADER_FG)
            .bg(Theme::HEADER_BG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Theme::TITLE)
            .add_modifier(Modifier::BOLD)
    }

    pub fn dim() -> Style {
        Style::default().fg(Theme::FG_DIM)
    }

    pub fn live() -> Style {
        Style::default()
            .fg(Theme::HIGHLIGHT_LIVE)
            .bg(Theme::HEADER_BG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn paused() -> Style {
        Style::default()
            .fg(Theme::HIGHLIGHT_PAUSED)
            .bg(Theme::HEADER_BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Critical item style (red).
    pub fn critical() -> Style {
        Style::default()
            .fg(Theme::HIGHLIGHT_CRITICAL)
            .bg(Theme::HEADER_BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Maps a view-model row class to a ratatui style.
    pub fn row(class: RowStyleClass) -> Style {
        match class {
            RowStyleClass::Normal => Self::default(),
            RowStyleClass::Subtotal => Self::default().add_modifier(Modifier::BOLD),
            RowStyleClass::Total => Style::default()
                .fg(Theme::TITLE)
                .add_modifier(Modifier::BOLD),
            RowStyleClass::Dimmed => Self::dim(),
        }
    }
}
