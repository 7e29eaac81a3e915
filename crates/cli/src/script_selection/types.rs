//! Type definitions for the terminal front end.

use nrs_core::app_state::Key;

/// Rows taken by the header bar.
pub const HEADER_ROWS: u16 = 1;
/// Rows taken below the grid: the command/description panel and the footer.
pub const FOOTER_ROWS: u16 = 3;

/// A decoded terminal event the state machine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(Key),
    Resize(u16, u16),
}

/// State for the UI viewport.
///
/// Tracks which grid rows are on screen when there are more rows than fit.
#[derive(Clone, PartialEq, Debug)]
pub struct ViewportState {
    /// First grid row shown.
    pub offset: usize,
    pub height: u16,
    pub width: u16,
}

impl ViewportState {
    pub fn new(width: u16, height: u16) -> Self {
        ViewportState {
            offset: 0,
            height,
            width,
        }
    }

    /// Grid rows available between the header and the footer.
    pub fn body_rows(&self) -> usize {
        usize::from(self.height.saturating_sub(HEADER_ROWS + FOOTER_ROWS)).max(1)
    }

    /// Adjusts `offset` so `selected_row` is on screen.
    pub fn scroll_into_view(&mut self, selected_row: usize, total_rows: usize) {
        let rows = self.body_rows();
        if selected_row < self.offset {
            self.offset = selected_row;
        } else if selected_row >= self.offset + rows {
            self.offset = selected_row + 1 - rows;
        }
        self.offset = self.offset.min(total_rows.saturating_sub(rows));
    }
}

/// Number of grid rows needed for `len` entries in `columns` columns.
pub fn grid_rows(len: usize, columns: usize) -> usize {
    len.div_ceil(columns.max(1))
}
