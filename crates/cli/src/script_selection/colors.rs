use crossterm::style::Color;
use nrs_core::config::Theme;

/// Colors used to draw the picker.
///
/// `None` leaves the terminal's own color in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub header_background: Option<Color>,
    pub header_foreground: Option<Color>,
    pub selected_background: Option<Color>,
    pub selected_foreground: Option<Color>,
    pub lifecycle_foreground: Option<Color>,
    pub marked_foreground: Option<Color>,
    pub error_foreground: Option<Color>,
    pub bold_selection: bool,
    /// Draw a `>` before the selected cell, for themes without colors.
    pub selection_marker: bool,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Default => Palette {
                header_background: Some(Color::DarkGreen),
                header_foreground: Some(Color::White),
                selected_background: Some(Color::DarkBlue),
                selected_foreground: Some(Color::Yellow),
                lifecycle_foreground: Some(Color::DarkGrey),
                marked_foreground: Some(Color::Green),
                error_foreground: Some(Color::Red),
                bold_selection: true,
                selection_marker: false,
            },
            Theme::Minimal => Palette {
                header_background: None,
                header_foreground: Some(Color::Green),
                selected_background: None,
                selected_foreground: Some(Color::Yellow),
                lifecycle_foreground: Some(Color::DarkGrey),
                marked_foreground: Some(Color::Green),
                error_foreground: Some(Color::Red),
                bold_selection: true,
                selection_marker: true,
            },
            Theme::Plain => Palette {
                header_background: None,
                header_foreground: None,
                selected_background: None,
                selected_foreground: None,
                lifecycle_foreground: None,
                marked_foreground: None,
                error_foreground: None,
                bold_selection: false,
                selection_marker: true,
            },
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::for_theme(Theme::Default)
    }
}
