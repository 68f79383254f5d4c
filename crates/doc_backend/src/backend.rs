//! The backend facade contract

use crate::Result;
use serde::{Deserialize, Serialize};

/// Relative cursor movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Granularity of a cursor movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveUnit {
    /// One table cell (only meaningful inside a table)
    Cell,
    /// One character (grapheme cluster)
    Char,
    /// One line; moving down from the last table row leaves the table
    Line,
}

/// Character style applied to the current selection or to subsequent input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontStyle {
    /// Font face name (None keeps the current face)
    pub name: Option<String>,
    /// Font size in points (None keeps the current size)
    pub size: Option<u32>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Restyle the run typed so far on the current line, not just future input
    pub select_previous_run: bool,
}

impl FontStyle {
    /// Style with only a size set
    pub fn sized(size: u32) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    /// Set the bold flag
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Set the italic flag
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    /// Set the underline flag
    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    /// Set the font face
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }
}

/// Geometry of a table to create at the cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    pub rows: usize,
    pub cols: usize,
    /// Width of each column in backend units
    pub column_widths: Vec<u32>,
    /// Fixed row height in backend units
    pub row_height: u32,
}

impl TableLayout {
    /// Layout with every column the same width: `total_width / cols`, remainder dropped
    pub fn with_equal_columns(rows: usize, cols: usize, total_width: u32, row_height: u32) -> Self {
        let col_width = u32::try_from(cols)
            .ok()
            .filter(|c| *c > 0)
            .map_or(0, |c| total_width / c);
        Self {
            rows,
            cols,
            column_widths: vec![col_width; cols],
            row_height,
        }
    }
}

/// Primitive operations exposed by a stateful, cursor-based editing application.
///
/// `Ok(false)` means the application declined the call; `Err` means the call
/// could not be delivered. None of the primitives are idempotent: each one
/// depends on, and usually moves, the implicit cursor left by the previous call.
pub trait Backend {
    /// Establish the session
    fn connect(&mut self) -> Result<bool>;

    /// Tear down the session
    fn disconnect(&mut self) -> Result<bool>;

    /// Whether a session is currently established
    fn is_connected(&self) -> bool;

    /// Start a new, empty document
    fn create_document(&mut self) -> Result<bool>;

    /// Open a document from a filesystem path
    fn open(&mut self, path: &str) -> Result<bool>;

    /// Save to `path`, or to the current document path when None
    fn save(&mut self, path: Option<&str>) -> Result<bool>;

    /// Insert a run of text at the cursor
    fn insert_text(&mut self, text: &str) -> Result<bool>;

    /// Break the current paragraph at the cursor
    fn insert_paragraph_break(&mut self) -> Result<bool>;

    /// Apply a character style
    fn set_font_style(&mut self, style: &FontStyle) -> Result<bool>;

    /// Create a table at the cursor; the cursor lands in its first cell
    fn create_table(&mut self, layout: &TableLayout) -> Result<bool>;

    /// Move the cursor one unit. With a cell selection active, cell moves extend it
    fn move_cursor(&mut self, direction: Direction, unit: MoveUnit) -> Result<bool>;

    /// Select the cell under the cursor
    fn select_current_cell(&mut self) -> Result<bool>;

    /// Select the whole table under the cursor
    fn select_whole_table(&mut self) -> Result<bool>;

    /// Drop the selection. Cancelling a whole-table selection leaves the cursor in the first cell
    fn cancel_selection(&mut self) -> Result<bool>;

    /// Delete the selected content, or the character after the cursor
    fn delete_selection(&mut self) -> Result<bool>;

    /// Merge the selected rectangular block of cells
    fn merge_selected_cells(&mut self) -> Result<bool>;

    /// Text covered by the selection (empty when nothing is selected)
    fn selected_text(&mut self) -> Result<String>;

    /// Plain text of the whole document
    fn full_text(&mut self) -> Result<String>;
}
