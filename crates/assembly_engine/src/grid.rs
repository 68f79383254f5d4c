//! Grid cursor engine
//!
//! The backend offers no seek-to-cell primitive. Every table operation starts
//! from a deterministic anchor (the first cell, reached by toggling cell and
//! table selections) and reaches its target with one-cell relative moves.
//! Traversal is row-major; a fill always ends with the cursor moved out of the
//! table into the paragraph below it.

use crate::error::accepted;
use crate::settings::TableSettings;
use crate::{AssemblyError, Result, TableData};
use doc_backend::{Backend, Direction, FontStyle, MoveUnit, TableLayout};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based table cell address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: usize,
    pub col: usize,
}

impl GridPosition {
    pub const ORIGIN: GridPosition = GridPosition { row: 1, col: 1 };

    /// Validated position; both coordinates must be at least 1
    pub fn new(row: usize, col: usize) -> Result<Self> {
        if row == 0 || col == 0 {
            return Err(AssemblyError::validation("Valid row and col are required"));
        }
        Ok(Self { row, col })
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Row and column count of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableShape {
    pub rows: usize,
    pub cols: usize,
}

impl TableShape {
    pub fn contains(&self, pos: GridPosition) -> bool {
        pos.row <= self.rows && pos.col <= self.cols
    }
}

/// Where the engine last left the cursor relative to the current table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorPlacement {
    /// Somewhere the engine did not put it
    #[default]
    Unknown,
    InTable,
    /// In the paragraph directly below the table, right after an exit
    BelowTable,
}

/// What the engine knows about the table it is working on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableState {
    pub shape: Option<TableShape>,
    pub placement: CursorPlacement,
}

impl TableState {
    /// The cursor moved by means outside the engine
    pub fn cursor_moved(&mut self) {
        if self.placement == CursorPlacement::BelowTable {
            self.placement = CursorPlacement::Unknown;
        }
    }

    pub fn forget(&mut self) {
        *self = TableState::default();
    }
}

/// Outcome of a bulk fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FillReport {
    pub rows_written: usize,
    pub cells_written: usize,
    /// Data rows dropped because they fell below the table
    pub truncated_rows: usize,
    /// Data rows that lost cells past the table's right edge
    pub truncated_cols: usize,
}

impl FillReport {
    pub fn is_truncated(&self) -> bool {
        self.truncated_rows > 0 || self.truncated_cols > 0
    }
}

impl fmt::Display for FillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Table filled: {} cells in {} rows",
            self.cells_written, self.rows_written
        )?;
        if self.truncated_rows > 0 {
            write!(f, ", {} rows dropped", self.truncated_rows)?;
        }
        if self.truncated_cols > 0 {
            write!(f, ", {} rows clipped", self.truncated_cols)?;
        }
        Ok(())
    }
}

/// Relative-move driver for one table
pub struct GridCursor<'a, B: Backend> {
    backend: &'a mut B,
    state: &'a mut TableState,
    /// 0-based cell the cursor is believed to be in, for error reporting
    at: (usize, usize),
}

impl<'a, B: Backend> GridCursor<'a, B> {
    pub fn new(backend: &'a mut B, state: &'a mut TableState) -> Self {
        Self {
            backend,
            state,
            at: (0, 0),
        }
    }

    /// Create a `rows` x `cols` table at the cursor with evenly split columns
    pub fn create_table(&mut self, rows: usize, cols: usize, settings: &TableSettings) -> Result<TableShape> {
        if rows == 0 || cols == 0 {
            return Err(AssemblyError::validation("Valid rows and cols are required"));
        }
        if rows > settings.max_rows || cols > settings.max_cols || u32::try_from(cols).is_err() {
            return Err(AssemblyError::validation(format!(
                "Table size {}x{} exceeds the {}x{} limit",
                rows, cols, settings.max_rows, settings.max_cols
            )));
        }
        let layout = TableLayout::with_equal_columns(rows, cols, settings.total_width, settings.row_height);
        accepted(self.backend.create_table(&layout)?, "Failed to create table")?;

        let shape = TableShape { rows, cols };
        self.state.shape = Some(shape);
        self.state.placement = CursorPlacement::InTable;
        self.at = (0, 0);
        tracing::info!("Created {}x{} table", rows, cols);
        Ok(shape)
    }

    /// Whether the cursor currently sits in a table cell. Leaves no selection behind.
    ///
    /// A table the engine did not create has no known shape.
    pub fn cursor_in_table(&mut self) -> Result<bool> {
        let in_table = self.backend.select_current_cell()?;
        self.backend.cancel_selection()?;
        if in_table {
            if self.state.placement != CursorPlacement::InTable {
                self.state.shape = None;
            }
            self.state.placement = CursorPlacement::InTable;
        }
        Ok(in_table)
    }

    // -------------------------------------------------------------------------
    // Bulk fills
    // -------------------------------------------------------------------------

    /// Write `data` row-major starting at `start`, then leave the table.
    ///
    /// Data outside the known table shape is dropped before anything is
    /// written. A failure part way through leaves the cells written so far.
    pub fn fill(&mut self, data: &TableData, start: GridPosition, header_row: bool) -> Result<FillReport> {
        let mut data = data.clone();
        let mut report = FillReport::default();
        if let Some(shape) = self.state.shape {
            if !shape.contains(start) {
                return Err(AssemblyError::validation(format!(
                    "Start cell {} is outside the {}x{} table",
                    start, shape.rows, shape.cols
                )));
            }
            let (rows, cols) = data.clamp(shape.rows - (start.row - 1), shape.cols - (start.col - 1));
            if rows > 0 || cols > 0 {
                tracing::warn!(
                    "Data exceeds the {}x{} table: {} rows dropped, {} rows clipped",
                    shape.rows,
                    shape.cols,
                    rows,
                    cols
                );
            }
            report.truncated_rows = rows;
            report.truncated_cols = cols;
        }

        tracing::debug!(
            "Filling {} rows ({} cells) from {}",
            data.row_count(),
            data.cell_count(),
            start
        );
        self.enter()?;
        self.anchor()?;
        self.advance_to(start)?;

        let rows = data.rows();
        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, text) in row.iter().enumerate() {
                self.write_here(text, header_row && row_idx == 0)?;
                report.cells_written += 1;
                if col_idx + 1 < row.len() {
                    self.step(Direction::Right, MoveUnit::Cell)?;
                }
            }
            report.rows_written += 1;

            if row_idx + 1 < rows.len() {
                for _ in 1..row.len() {
                    self.step(Direction::Left, MoveUnit::Cell)?;
                }
                self.step(Direction::Down, MoveUnit::Cell)?;
            }
        }

        self.exit()?;
        tracing::info!("{}", report);
        Ok(report)
    }

    /// Write `start..=end` down one column, one number per row, then leave the table
    pub fn fill_column_with_range(
        &mut self,
        start: i64,
        end: i64,
        column: usize,
        from_first_cell: bool,
    ) -> Result<FillReport> {
        if start > end {
            return Err(AssemblyError::validation("Range start must not exceed its end"));
        }
        let first_row = if from_first_cell { 1 } else { 2 };
        let origin = GridPosition::new(first_row, column)?;

        let mut count = usize::try_from(end.saturating_sub(start)).unwrap_or(usize::MAX).saturating_add(1);
        let mut report = FillReport::default();
        if let Some(shape) = self.state.shape {
            if !shape.contains(origin) {
                return Err(AssemblyError::validation(format!(
                    "Start cell {} is outside the {}x{} table",
                    origin, shape.rows, shape.cols
                )));
            }
            let available = shape.rows - (first_row - 1);
            if count > available {
                tracing::warn!("Range {}..={} exceeds the table, dropping {} numbers", start, end, count - available);
                report.truncated_rows = count - available;
                count = available;
            }
        }

        self.enter()?;
        self.anchor()?;
        self.advance_to(origin)?;
        for (i, n) in (start..=end).take(count).enumerate() {
            self.write_here(&n.to_string(), false)?;
            report.cells_written += 1;
            report.rows_written += 1;
            if i + 1 < count {
                self.step(Direction::Down, MoveUnit::Cell)?;
            }
        }

        self.exit()?;
        tracing::info!("Filled column {} with {}..={}", column, start, end);
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Sparse edits (the cursor stays in the table)
    // -------------------------------------------------------------------------

    /// Replace the text of one cell
    pub fn write_cell(&mut self, pos: GridPosition, text: &str) -> Result<()> {
        self.check_inside(pos)?;
        self.enter()?;
        self.anchor()?;
        self.advance_to(pos)?;
        self.write_here(text, false)?;
        tracing::debug!("Wrote cell {}", pos);
        Ok(())
    }

    /// Read the text of one cell
    pub fn read_cell(&mut self, pos: GridPosition) -> Result<String> {
        self.check_inside(pos)?;
        self.enter()?;
        self.anchor()?;
        self.advance_to(pos)?;
        accepted(self.backend.select_current_cell()?, "Failed to select cell")?;
        let text = self.backend.selected_text()?;
        self.backend.cancel_selection()?;
        Ok(text)
    }

    /// Merge the rectangular block spanning `start` to `end` (inclusive)
    pub fn merge(&mut self, start: GridPosition, end: GridPosition) -> Result<()> {
        if end.row < start.row || end.col < start.col {
            return Err(AssemblyError::validation(format!(
                "Invalid merge region {} - {}",
                start, end
            )));
        }
        self.check_inside(end)?;
        self.enter()?;
        self.anchor()?;
        self.advance_to(start)?;

        accepted(self.backend.select_current_cell()?, "Failed to select cell")?;
        for _ in start.row..end.row {
            self.step(Direction::Down, MoveUnit::Cell)?;
        }
        for _ in start.col..end.col {
            self.step(Direction::Right, MoveUnit::Cell)?;
        }
        let merged = self.backend.merge_selected_cells()?;
        self.backend.cancel_selection()?;
        accepted(merged, &format!("Failed to merge cells {} - {}", start, end))?;
        self.at = (start.row - 1, start.col - 1);
        tracing::info!("Merged cells {} - {}", start, end);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Traversal primitives
    // -------------------------------------------------------------------------

    fn check_inside(&self, pos: GridPosition) -> Result<()> {
        match self.state.shape {
            Some(shape) if !shape.contains(pos) => Err(AssemblyError::validation(format!(
                "Cell {} is outside the {}x{} table",
                pos, shape.rows, shape.cols
            ))),
            _ => Ok(()),
        }
    }

    /// Step back up into the table when the last exit left the cursor just below it
    fn enter(&mut self) -> Result<()> {
        if self.state.placement == CursorPlacement::BelowTable {
            tracing::debug!("Re-entering table from below");
            accepted(
                self.backend.move_cursor(Direction::Up, MoveUnit::Line)?,
                "Failed to re-enter the table",
            )?;
            self.state.placement = CursorPlacement::InTable;
        }
        Ok(())
    }

    /// Put the cursor in the first cell
    fn anchor(&mut self) -> Result<()> {
        accepted(self.backend.select_current_cell()?, "Cursor is not inside a table")?;
        accepted(self.backend.select_whole_table()?, "Cursor is not inside a table")?;
        self.backend.cancel_selection()?;
        accepted(self.backend.select_current_cell()?, "Cursor is not inside a table")?;
        self.backend.cancel_selection()?;
        self.state.placement = CursorPlacement::InTable;
        self.at = (0, 0);
        Ok(())
    }

    /// From the anchor, move to `pos`
    fn advance_to(&mut self, pos: GridPosition) -> Result<()> {
        for _ in 1..pos.row {
            self.step(Direction::Down, MoveUnit::Cell)?;
        }
        for _ in 1..pos.col {
            self.step(Direction::Right, MoveUnit::Cell)?;
        }
        Ok(())
    }

    /// Select the current cell, clear it and type `text`
    fn write_here(&mut self, text: &str, bold: bool) -> Result<()> {
        self.guarded(|backend| {
            if !backend.select_current_cell()? || !backend.delete_selection()? {
                return Ok(false);
            }
            if bold {
                backend.set_font_style(&FontStyle::default().with_bold(true))?;
            }
            let inserted = backend.insert_text(text)?;
            if bold {
                backend.set_font_style(&FontStyle::default().with_bold(false))?;
            }
            Ok(inserted)
        }, "cell write was rejected")
    }

    fn step(&mut self, direction: Direction, unit: MoveUnit) -> Result<()> {
        self.guarded(|backend| backend.move_cursor(direction, unit), "cursor move was rejected")?;
        let (row, col) = self.at;
        self.at = match (direction, unit) {
            (Direction::Right, MoveUnit::Cell) => (row, col + 1),
            (Direction::Left, MoveUnit::Cell) => (row, col.saturating_sub(1)),
            (Direction::Down, _) => (row + 1, col),
            (Direction::Up, _) => (row.saturating_sub(1), col),
            _ => (row, col),
        };
        Ok(())
    }

    /// Run a backend sequence, mapping failures to a fill error at the current cell
    fn guarded(
        &mut self,
        op: impl FnOnce(&mut B) -> doc_backend::Result<bool>,
        rejected: &str,
    ) -> Result<()> {
        let (row, col) = (self.at.0 + 1, self.at.1 + 1);
        match op(self.backend) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AssemblyError::Fill {
                row,
                col,
                reason: rejected.to_string(),
            }),
            Err(e) => {
                tracing::error!("Backend failure at cell ({}, {}): {}", row, col, e);
                Err(AssemblyError::Fill {
                    row,
                    col,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Leave the table downwards from the current row
    fn exit(&mut self) -> Result<()> {
        self.guarded(|backend| {
            let selected = backend.select_current_cell()?;
            backend.cancel_selection()?;
            Ok(selected)
        }, "cell selection was rejected")?;

        let below = match self.state.shape {
            Some(shape) => shape.rows.saturating_sub(self.at.0 + 1),
            None => 0,
        };
        for _ in 0..=below {
            self.step(Direction::Down, MoveUnit::Line)?;
        }
        self.state.placement = CursorPlacement::BelowTable;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_backend::{BackendCall, MemoryBackend};
    use serde_json::json;

    fn table(rows: usize, cols: usize) -> (MemoryBackend, TableState) {
        let mut backend = MemoryBackend::with_document();
        let mut state = TableState::default();
        GridCursor::new(&mut backend, &mut state)
            .create_table(rows, cols, &TableSettings::default())
            .unwrap();
        backend.clear_calls();
        (backend, state)
    }

    fn texts(backend: &MemoryBackend) -> Vec<Vec<String>> {
        backend.document().unwrap().tables().next().unwrap().texts()
    }

    #[test]
    fn test_create_table_validates_size() {
        let mut backend = MemoryBackend::with_document();
        let mut state = TableState::default();
        let mut grid = GridCursor::new(&mut backend, &mut state);
        assert!(matches!(
            grid.create_table(0, 3, &TableSettings::default()),
            Err(AssemblyError::Validation(_))
        ));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_create_table_rejects_oversized() {
        let mut backend = MemoryBackend::with_document();
        let mut state = TableState::default();
        let mut grid = GridCursor::new(&mut backend, &mut state);
        let settings = TableSettings::default();
        for (rows, cols) in [(1, 1usize << 32), (1, settings.max_cols + 1), (settings.max_rows + 1, 1)] {
            assert!(matches!(
                grid.create_table(rows, cols, &settings),
                Err(AssemblyError::Validation(_))
            ));
        }
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_fill_starts_with_anchor_sequence() {
        let (mut backend, mut state) = table(2, 2);
        let data = TableData::parse(&json!([["a"]])).unwrap();
        GridCursor::new(&mut backend, &mut state)
            .fill(&data, GridPosition::ORIGIN, false)
            .unwrap();

        assert_eq!(
            &backend.calls()[..5],
            &[
                BackendCall::SelectCell,
                BackendCall::SelectTable,
                BackendCall::CancelSelection,
                BackendCall::SelectCell,
                BackendCall::CancelSelection,
            ]
        );
    }

    #[test]
    fn test_fill_with_offset() {
        let (mut backend, mut state) = table(3, 3);
        let data = TableData::parse(&json!([["a", "b"], ["c", "d"]])).unwrap();
        let report = GridCursor::new(&mut backend, &mut state)
            .fill(&data, GridPosition::new(2, 2).unwrap(), false)
            .unwrap();

        assert_eq!(report.cells_written, 4);
        assert_eq!(
            texts(&backend),
            vec![vec!["", "", ""], vec!["", "a", "b"], vec!["", "c", "d"]]
        );
        assert!(!backend.cursor().in_table());
        assert_eq!(state.placement, CursorPlacement::BelowTable);
    }

    #[test]
    fn test_ragged_rows_keep_column_alignment() {
        let (mut backend, mut state) = table(3, 3);
        let data = TableData::parse(&json!([["a", "b", "c"], ["d"], ["e", "f"]])).unwrap();
        GridCursor::new(&mut backend, &mut state)
            .fill(&data, GridPosition::ORIGIN, false)
            .unwrap();

        assert_eq!(
            texts(&backend),
            vec![vec!["a", "b", "c"], vec!["d", "", ""], vec!["e", "f", ""]]
        );
    }

    #[test]
    fn test_oversized_data_is_clamped() {
        let (mut backend, mut state) = table(2, 2);
        let data = TableData::parse(&json!([["a", "b", "x"], ["c", "d"], ["y"]])).unwrap();
        let report = GridCursor::new(&mut backend, &mut state)
            .fill(&data, GridPosition::ORIGIN, false)
            .unwrap();

        assert_eq!(report.truncated_rows, 1);
        assert_eq!(report.truncated_cols, 1);
        assert_eq!(texts(&backend), vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_start_outside_table_is_rejected_without_calls() {
        let (mut backend, mut state) = table(2, 2);
        let data = TableData::parse(&json!([["a"]])).unwrap();
        let result = GridCursor::new(&mut backend, &mut state).fill(&data, GridPosition::new(3, 1).unwrap(), false);

        assert!(matches!(result, Err(AssemblyError::Validation(_))));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_header_row_is_bold() {
        let (mut backend, mut state) = table(2, 1);
        let data = TableData::parse(&json!([["H"], ["v"]])).unwrap();
        GridCursor::new(&mut backend, &mut state)
            .fill(&data, GridPosition::ORIGIN, true)
            .unwrap();

        let table = backend.document().unwrap().tables().next().unwrap();
        assert!(table.cell(0, 0).unwrap().content.runs[0].style.bold);
        assert!(!table.cell(1, 0).unwrap().content.runs[0].style.bold);
    }

    #[test]
    fn test_fault_surfaces_as_fill_error() {
        let (mut backend, mut state) = table(2, 2);
        // anchor (5) + first cell write (3) + move right (1), then fail
        backend.inject_fault_after(9);
        let data = TableData::parse(&json!([["a", "b"], ["c", "d"]])).unwrap();
        let result = GridCursor::new(&mut backend, &mut state).fill(&data, GridPosition::ORIGIN, false);

        match result {
            Err(AssemblyError::Fill { row, col, .. }) => assert_eq!((row, col), (1, 2)),
            other => panic!("expected fill error, got {:?}", other),
        }
        assert_eq!(texts(&backend)[0][0], "a");
    }

    #[test]
    fn test_column_range() {
        let (mut backend, mut state) = table(4, 2);
        let report = GridCursor::new(&mut backend, &mut state)
            .fill_column_with_range(1, 3, 2, false)
            .unwrap();

        assert_eq!(report.cells_written, 3);
        let cells = texts(&backend);
        let column: Vec<&str> = cells.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(column, vec!["", "1", "2", "3"]);
    }

    #[test]
    fn test_column_range_is_clamped() {
        let (mut backend, mut state) = table(2, 1);
        let report = GridCursor::new(&mut backend, &mut state)
            .fill_column_with_range(1, 10, 1, true)
            .unwrap();
        assert_eq!(report.cells_written, 2);
        assert_eq!(report.truncated_rows, 8);
    }

    #[test]
    fn test_write_and_read_cell() {
        let (mut backend, mut state) = table(3, 3);
        let pos = GridPosition::new(2, 3).unwrap();
        let mut grid = GridCursor::new(&mut backend, &mut state);
        grid.write_cell(pos, "x").unwrap();
        assert_eq!(grid.read_cell(pos).unwrap(), "x");
        assert_eq!(grid.read_cell(GridPosition::ORIGIN).unwrap(), "");
    }

    #[test]
    fn test_sparse_edit_after_fill_reenters_table() {
        let (mut backend, mut state) = table(2, 2);
        let data = TableData::parse(&json!([["a", "b"], ["c", "d"]])).unwrap();
        let mut grid = GridCursor::new(&mut backend, &mut state);
        grid.fill(&data, GridPosition::ORIGIN, false).unwrap();
        grid.write_cell(GridPosition::new(1, 2).unwrap(), "B").unwrap();

        assert_eq!(texts(&backend), vec![vec!["a", "B"], vec!["c", "d"]]);
    }

    #[test]
    fn test_merge_region() {
        let (mut backend, mut state) = table(3, 3);
        GridCursor::new(&mut backend, &mut state)
            .merge(GridPosition::new(1, 1).unwrap(), GridPosition::new(2, 2).unwrap())
            .unwrap();

        let table = backend.document().unwrap().tables().next().unwrap();
        assert_eq!(table.merges.len(), 1);
        assert_eq!(table.cell(1, 1).unwrap().covered_by, Some((0, 0)));
    }

    #[test]
    fn test_merge_rejects_inverted_region() {
        let (mut backend, mut state) = table(3, 3);
        let result = GridCursor::new(&mut backend, &mut state)
            .merge(GridPosition::new(2, 2).unwrap(), GridPosition::new(1, 1).unwrap());
        assert!(matches!(result, Err(AssemblyError::Validation(_))));
    }

    #[test]
    fn test_fill_outside_any_table_is_rejected() {
        let mut backend = MemoryBackend::with_document();
        let mut state = TableState::default();
        let data = TableData::parse(&json!([["a"]])).unwrap();
        let result = GridCursor::new(&mut backend, &mut state).fill(&data, GridPosition::ORIGIN, false);
        assert!(matches!(result, Err(AssemblyError::Rejected(_))));
    }
}
