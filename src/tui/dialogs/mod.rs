//! TUI dialog components

mod confirm;
mod file_picker;
mod password;

use ratatui::layout::Rect;

pub use confirm::ConfirmDialog;
pub use file_picker::FilePicker;
pub use password::PasswordDialog;

pub enum DialogResult<T> {
    Continue,
    Cancel,
    Submit(T),
}

/// A `width` x `height` rectangle centered in `area`, clipped to fit.
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
