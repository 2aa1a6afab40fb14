//! Color theme for the terminal UI

use ratatui::style::Color;

pub struct Theme {
    pub background: Color,
    pub border: Color,
    pub title: Color,
    pub text: Color,
    pub dimmed: Color,
    pub hint: Color,
    pub accent: Color,
    pub running: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            border: Color::Rgb(88, 91, 112),
            title: Color::Rgb(137, 180, 250),
            text: Color::Rgb(205, 214, 244),
            dimmed: Color::Rgb(127, 132, 156),
            hint: Color::Rgb(249, 226, 175),
            accent: Color::Rgb(137, 220, 235),
            running: Color::Rgb(166, 227, 161),
            success: Color::Rgb(166, 227, 161),
            warning: Color::Rgb(250, 179, 135),
            error: Color::Rgb(243, 139, 168),
        }
    }
}
