//! In-memory simulator of the editing application
//!
//! Mirrors the cursor semantics the assembly engine relies on: cell moves wrap
//! at row ends, cancelling a whole-table selection parks the cursor in the
//! first cell, and moving a line down from the last table row exits the table.

use std::path::{Path, PathBuf};

use crate::model::{Block, CharStyle, Document, MergedRegion, Paragraph, Table};
use crate::{Backend, BackendCall, BackendError, Direction, FontStyle, MoveUnit, Result, TableLayout};

/// Where the cursor currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPosition {
    /// In a body paragraph
    Body { block: usize, offset: usize },
    /// In a table cell (0-based row and column)
    Cell {
        block: usize,
        row: usize,
        col: usize,
        offset: usize,
    },
}

impl CursorPosition {
    pub fn in_table(&self) -> bool {
        matches!(self, CursorPosition::Cell { .. })
    }

    /// 0-based (row, col) when inside a table
    pub fn cell(&self) -> Option<(usize, usize)> {
        match *self {
            CursorPosition::Cell { row, col, .. } => Some((row, col)),
            CursorPosition::Body { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Cells {
        anchor: (usize, usize),
        focus: (usize, usize),
    },
    Table,
}

impl Selection {
    /// Inclusive (top, left, bottom, right) of a cell block
    fn rect(anchor: (usize, usize), focus: (usize, usize)) -> (usize, usize, usize, usize) {
        (
            anchor.0.min(focus.0),
            anchor.1.min(focus.1),
            anchor.0.max(focus.0),
            anchor.1.max(focus.1),
        )
    }
}

/// Simulated single-document editing session
#[derive(Debug)]
pub struct MemoryBackend {
    connected: bool,
    refuse_connection: bool,
    document: Option<Document>,
    path: Option<PathBuf>,
    cursor: CursorPosition,
    selection: Option<Selection>,
    pending_style: CharStyle,
    calls: Vec<BackendCall>,
    fault_after: Option<usize>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// A disconnected backend with no open document
    pub fn new() -> Self {
        Self {
            connected: false,
            refuse_connection: false,
            document: None,
            path: None,
            cursor: CursorPosition::Body { block: 0, offset: 0 },
            selection: None,
            pending_style: CharStyle::default(),
            calls: Vec::new(),
            fault_after: None,
        }
    }

    /// A connected backend with a fresh empty document
    pub fn with_document() -> Self {
        let mut backend = Self::new();
        backend.connected = true;
        backend.document = Some(Document::new());
        backend
    }

    /// A backend whose `connect` always reports failure
    pub fn refusing_connection() -> Self {
        Self {
            refuse_connection: true,
            ..Self::new()
        }
    }

    /// Fail every call after the first `calls` recorded ones with a transport error
    pub fn with_fault_after(mut self, calls: usize) -> Self {
        self.fault_after = Some(self.calls.len() + calls);
        self
    }

    /// Arm a transport fault `calls` calls from now
    pub fn inject_fault_after(&mut self, calls: usize) {
        self.fault_after = Some(self.calls.len() + calls);
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
        self.fault_after = None;
    }

    /// Style that the next inserted text will carry
    pub fn pending_style(&self) -> &CharStyle {
        &self.pending_style
    }

    /// Whether a selection is active
    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Log a call and enforce session and fault rules
    fn record(&mut self, call: BackendCall) -> Result<()> {
        self.calls.push(call);
        if let Some(limit) = self.fault_after {
            if self.calls.len() > limit {
                return Err(BackendError::Transport(format!(
                    "simulated fault on call #{}",
                    self.calls.len()
                )));
            }
        }
        if !self.connected {
            return Err(BackendError::NotConnected);
        }
        Ok(())
    }

    fn table_at(&self, block: usize) -> Option<&Table> {
        self.document.as_ref()?.blocks.get(block)?.as_table()
    }

    fn table_mut(&mut self, block: usize) -> Option<&mut Table> {
        match self.document.as_mut()?.blocks.get_mut(block)? {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        }
    }

    fn paragraph_mut(&mut self, block: usize) -> Option<&mut Paragraph> {
        match self.document.as_mut()?.blocks.get_mut(block)? {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        }
    }

    /// Paragraph under the cursor, whether in the body or in a cell
    fn cursor_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self.cursor {
            CursorPosition::Body { block, .. } => self.paragraph_mut(block),
            CursorPosition::Cell { block, row, col, .. } => {
                self.table_mut(block)?.cell_mut(row, col).map(|c| &mut c.content)
            }
        }
    }

    fn cursor_offset(&self) -> usize {
        match self.cursor {
            CursorPosition::Body { offset, .. } | CursorPosition::Cell { offset, .. } => offset,
        }
    }

    fn set_cursor_offset(&mut self, new_offset: usize) {
        match &mut self.cursor {
            CursorPosition::Body { offset, .. } | CursorPosition::Cell { offset, .. } => *offset = new_offset,
        }
    }

    fn move_cell(&mut self, direction: Direction) -> bool {
        let CursorPosition::Cell { block, row, col, .. } = self.cursor else {
            return false;
        };
        let Some((rows, cols)) = self.table_at(block).map(|t| (t.rows, t.cols)) else {
            return false;
        };

        // Extending a cell block never wraps
        if let Some(Selection::Cells { anchor, focus }) = self.selection {
            let (r, c) = focus;
            let next = match direction {
                Direction::Right if c + 1 < cols => (r, c + 1),
                Direction::Left if c > 0 => (r, c - 1),
                Direction::Down if r + 1 < rows => (r + 1, c),
                Direction::Up if r > 0 => (r - 1, c),
                _ => return false,
            };
            self.selection = Some(Selection::Cells { anchor, focus: next });
            self.cursor = CursorPosition::Cell {
                block,
                row: next.0,
                col: next.1,
                offset: 0,
            };
            return true;
        }

        let next = match direction {
            Direction::Right if col + 1 < cols => (row, col + 1),
            Direction::Right if row + 1 < rows => (row + 1, 0),
            Direction::Left if col > 0 => (row, col - 1),
            Direction::Left if row > 0 => (row - 1, cols - 1),
            Direction::Down if row + 1 < rows => (row + 1, col),
            Direction::Up if row > 0 => (row - 1, col),
            _ => return false,
        };
        self.selection = None;
        self.cursor = CursorPosition::Cell {
            block,
            row: next.0,
            col: next.1,
            offset: 0,
        };
        true
    }

    fn move_char(&mut self, direction: Direction) -> bool {
        if matches!(direction, Direction::Up | Direction::Down) {
            return self.move_line(direction);
        }
        self.selection = None;
        let offset = self.cursor_offset();
        let Some(para) = self.cursor_paragraph_mut() else {
            return false;
        };
        let target = if direction == Direction::Right {
            para.next_boundary(offset)
        } else {
            para.prev_boundary(offset)
        };
        if let Some(target) = target {
            self.set_cursor_offset(target);
            return true;
        }

        // Crossing into a neighbouring body paragraph
        let CursorPosition::Body { block, .. } = self.cursor else {
            return false;
        };
        let Some(doc) = self.document.as_ref() else {
            return false;
        };
        match direction {
            Direction::Right => match doc.blocks.get(block + 1) {
                Some(Block::Paragraph(_)) => {
                    self.cursor = CursorPosition::Body { block: block + 1, offset: 0 };
                    true
                }
                _ => false,
            },
            _ => match block.checked_sub(1).and_then(|b| doc.blocks.get(b)) {
                Some(Block::Paragraph(p)) => {
                    self.cursor = CursorPosition::Body {
                        block: block - 1,
                        offset: p.char_len(),
                    };
                    true
                }
                _ => false,
            },
        }
    }

    fn move_line(&mut self, direction: Direction) -> bool {
        self.selection = None;
        let Some(doc) = self.document.as_ref() else {
            return false;
        };
        match (self.cursor, direction) {
            (CursorPosition::Cell { block, row, col, .. }, Direction::Down) => {
                let rows = doc.blocks.get(block).and_then(Block::as_table).map(|t| t.rows).unwrap_or(0);
                if row + 1 < rows {
                    self.cursor = CursorPosition::Cell { block, row: row + 1, col, offset: 0 };
                    true
                } else if matches!(doc.blocks.get(block + 1), Some(Block::Paragraph(_))) {
                    self.cursor = CursorPosition::Body { block: block + 1, offset: 0 };
                    true
                } else {
                    false
                }
            }
            (CursorPosition::Cell { block, row, col, .. }, Direction::Up) => {
                if row > 0 {
                    self.cursor = CursorPosition::Cell { block, row: row - 1, col, offset: 0 };
                    true
                } else {
                    match block.checked_sub(1).and_then(|b| doc.blocks.get(b)) {
                        Some(Block::Paragraph(p)) => {
                            self.cursor = CursorPosition::Body {
                                block: block - 1,
                                offset: p.char_len(),
                            };
                            true
                        }
                        _ => false,
                    }
                }
            }
            (CursorPosition::Body { block, offset }, Direction::Down) => match doc.blocks.get(block + 1) {
                Some(Block::Paragraph(p)) => {
                    self.cursor = CursorPosition::Body {
                        block: block + 1,
                        offset: offset.min(p.char_len()),
                    };
                    true
                }
                Some(Block::Table(_)) => {
                    self.cursor = CursorPosition::Cell { block: block + 1, row: 0, col: 0, offset: 0 };
                    true
                }
                None => false,
            },
            (CursorPosition::Body { block, offset }, Direction::Up) => {
                match block.checked_sub(1).and_then(|b| doc.blocks.get(b)) {
                    Some(Block::Paragraph(p)) => {
                        self.cursor = CursorPosition::Body {
                            block: block - 1,
                            offset: offset.min(p.char_len()),
                        };
                        true
                    }
                    Some(Block::Table(t)) => {
                        self.cursor = CursorPosition::Cell {
                            block: block - 1,
                            row: t.rows.saturating_sub(1),
                            col: 0,
                            offset: 0,
                        };
                        true
                    }
                    None => false,
                }
            }
            (_, Direction::Left | Direction::Right) => self.move_char(direction),
        }
    }

    fn selected_rect(&self) -> Option<(usize, usize, usize, usize)> {
        let CursorPosition::Cell { block, .. } = self.cursor else {
            return None;
        };
        let table = self.table_at(block)?;
        match self.selection? {
            Selection::Cells { anchor, focus } => Some(Selection::rect(anchor, focus)),
            Selection::Table => Some((0, 0, table.rows.saturating_sub(1), table.cols.saturating_sub(1))),
        }
    }
}

impl Backend for MemoryBackend {
    fn connect(&mut self) -> Result<bool> {
        self.calls.push(BackendCall::Connect);
        if self.refuse_connection {
            return Ok(false);
        }
        self.connected = true;
        Ok(true)
    }

    fn disconnect(&mut self) -> Result<bool> {
        self.calls.push(BackendCall::Disconnect);
        self.connected = false;
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn create_document(&mut self) -> Result<bool> {
        self.record(BackendCall::CreateDocument)?;
        self.document = Some(Document::new());
        self.path = None;
        self.cursor = CursorPosition::Body { block: 0, offset: 0 };
        self.selection = None;
        self.pending_style = CharStyle::default();
        Ok(true)
    }

    fn open(&mut self, path: &str) -> Result<bool> {
        self.record(BackendCall::Open { path: path.to_string() })?;
        let path = PathBuf::from(path);
        if !path.exists() {
            tracing::warn!("Cannot open missing document: {}", path.display());
            return Ok(false);
        }
        let content = std::fs::read_to_string(&path)?;
        let document: Document = serde_json::from_str(&content)?;
        self.document = Some(document);
        self.path = Some(path);
        self.cursor = CursorPosition::Body { block: 0, offset: 0 };
        self.selection = None;
        Ok(true)
    }

    fn save(&mut self, path: Option<&str>) -> Result<bool> {
        self.record(BackendCall::Save { path: path.map(str::to_string) })?;
        let Some(document) = self.document.as_ref() else {
            return Ok(false);
        };
        let target = match path {
            Some(p) => PathBuf::from(p),
            None => match &self.path {
                Some(p) => p.clone(),
                None => return Ok(false),
            },
        };
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(document)?;
        std::fs::write(&target, content)?;
        self.path = Some(target);
        Ok(true)
    }

    fn insert_text(&mut self, text: &str) -> Result<bool> {
        self.record(BackendCall::InsertText { text: text.to_string() })?;
        self.selection = None;
        let offset = self.cursor_offset();
        let style = self.pending_style.clone();
        let Some(para) = self.cursor_paragraph_mut() else {
            return Ok(false);
        };
        para.insert(offset, text, &style);
        self.set_cursor_offset(offset + text.chars().count());
        Ok(true)
    }

    fn insert_paragraph_break(&mut self) -> Result<bool> {
        self.record(BackendCall::ParagraphBreak)?;
        self.selection = None;
        match self.cursor {
            CursorPosition::Body { block, offset } => {
                let Some(para) = self.paragraph_mut(block) else {
                    return Ok(false);
                };
                let tail = para.split_off(offset);
                if let Some(doc) = self.document.as_mut() {
                    doc.blocks.insert(block + 1, Block::Paragraph(tail));
                }
                self.cursor = CursorPosition::Body { block: block + 1, offset: 0 };
                Ok(true)
            }
            CursorPosition::Cell { offset, .. } => {
                // Cells hold a single paragraph; a break becomes a line feed
                let style = self.pending_style.clone();
                let Some(para) = self.cursor_paragraph_mut() else {
                    return Ok(false);
                };
                para.insert(offset, "\n", &style);
                self.set_cursor_offset(offset + 1);
                Ok(true)
            }
        }
    }

    fn set_font_style(&mut self, style: &FontStyle) -> Result<bool> {
        self.record(BackendCall::SetFontStyle { style: style.clone() })?;
        if self.document.is_none() {
            return Ok(false);
        }
        if style.name.is_some() {
            self.pending_style.font_name = style.name.clone();
        }
        if style.size.is_some() {
            self.pending_style.size = style.size;
        }
        self.pending_style.bold = style.bold;
        self.pending_style.italic = style.italic;
        self.pending_style.underline = style.underline;

        if style.select_previous_run {
            let offset = self.cursor_offset();
            let applied = style.clone();
            if let Some(para) = self.cursor_paragraph_mut() {
                para.restyle(0, offset, |s| {
                    if applied.name.is_some() {
                        s.font_name = applied.name.clone();
                    }
                    if applied.size.is_some() {
                        s.size = applied.size;
                    }
                    s.bold = applied.bold;
                    s.italic = applied.italic;
                    s.underline = applied.underline;
                });
            }
        }
        Ok(true)
    }

    fn create_table(&mut self, layout: &TableLayout) -> Result<bool> {
        self.record(BackendCall::CreateTable { layout: layout.clone() })?;
        if layout.rows == 0 || layout.cols == 0 {
            return Ok(false);
        }
        let CursorPosition::Body { block, offset } = self.cursor else {
            // No nested tables
            return Ok(false);
        };
        let Some(para) = self.paragraph_mut(block) else {
            return Ok(false);
        };
        let tail = para.split_off(offset);
        let table = Table::new(layout.rows, layout.cols, layout.column_widths.clone(), layout.row_height);
        if let Some(doc) = self.document.as_mut() {
            doc.blocks.insert(block + 1, Block::Table(table));
            doc.blocks.insert(block + 2, Block::Paragraph(tail));
        }
        self.selection = None;
        self.cursor = CursorPosition::Cell { block: block + 1, row: 0, col: 0, offset: 0 };
        Ok(true)
    }

    fn move_cursor(&mut self, direction: Direction, unit: MoveUnit) -> Result<bool> {
        self.record(BackendCall::Move { direction, unit })?;
        if self.document.is_none() {
            return Ok(false);
        }
        Ok(match unit {
            MoveUnit::Cell => self.move_cell(direction),
            MoveUnit::Char => self.move_char(direction),
            MoveUnit::Line => self.move_line(direction),
        })
    }

    fn select_current_cell(&mut self) -> Result<bool> {
        self.record(BackendCall::SelectCell)?;
        match self.cursor.cell() {
            Some(cell) => {
                self.selection = Some(Selection::Cells { anchor: cell, focus: cell });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn select_whole_table(&mut self) -> Result<bool> {
        self.record(BackendCall::SelectTable)?;
        if self.cursor.in_table() {
            self.selection = Some(Selection::Table);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn cancel_selection(&mut self) -> Result<bool> {
        self.record(BackendCall::CancelSelection)?;
        if let (Some(Selection::Table), CursorPosition::Cell { block, .. }) = (self.selection, self.cursor) {
            self.cursor = CursorPosition::Cell { block, row: 0, col: 0, offset: 0 };
        }
        self.selection = None;
        Ok(true)
    }

    fn delete_selection(&mut self) -> Result<bool> {
        self.record(BackendCall::DeleteSelection)?;
        if let Some((top, left, bottom, right)) = self.selected_rect() {
            let CursorPosition::Cell { block, .. } = self.cursor else {
                return Ok(false);
            };
            if let Some(table) = self.table_mut(block) {
                for row in top..=bottom {
                    for col in left..=right {
                        if let Some(cell) = table.cell_mut(row, col) {
                            cell.content.clear();
                        }
                    }
                }
            }
            self.selection = None;
            self.set_cursor_offset(0);
            return Ok(true);
        }

        let offset = self.cursor_offset();
        let Some(para) = self.cursor_paragraph_mut() else {
            return Ok(false);
        };
        match para.next_boundary(offset) {
            Some(end) => {
                para.delete_range(offset, end);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn merge_selected_cells(&mut self) -> Result<bool> {
        self.record(BackendCall::MergeCells)?;
        let Some((top, left, bottom, right)) = self.selected_rect() else {
            return Ok(false);
        };
        if top == bottom && left == right {
            return Ok(false);
        }
        let CursorPosition::Cell { block, .. } = self.cursor else {
            return Ok(false);
        };
        let Some(table) = self.table_mut(block) else {
            return Ok(false);
        };
        let overlaps = table.merges.iter().any(|m| {
            m.start_row <= bottom && top <= m.end_row && m.start_col <= right && left <= m.end_col
        });
        if overlaps {
            return Ok(false);
        }

        let mut merged = Paragraph::new();
        for row in top..=bottom {
            for col in left..=right {
                let Some(cell) = table.cell_mut(row, col) else {
                    continue;
                };
                let content = std::mem::take(&mut cell.content);
                if !content.is_empty() {
                    if !merged.is_empty() {
                        merged.insert(merged.char_len(), "\n", &CharStyle::default());
                    }
                    merged.append(content);
                }
                if (row, col) != (top, left) {
                    cell.covered_by = Some((top, left));
                }
            }
        }
        if let Some(cell) = table.cell_mut(top, left) {
            cell.content = merged;
        }
        table.merges.push(MergedRegion {
            start_row: top,
            start_col: left,
            end_row: bottom,
            end_col: right,
        });
        self.selection = None;
        self.cursor = CursorPosition::Cell { block, row: top, col: left, offset: 0 };
        Ok(true)
    }

    fn selected_text(&mut self) -> Result<String> {
        self.record(BackendCall::SelectedText)?;
        let Some((top, left, bottom, right)) = self.selected_rect() else {
            return Ok(String::new());
        };
        let CursorPosition::Cell { block, .. } = self.cursor else {
            return Ok(String::new());
        };
        let Some(table) = self.table_at(block) else {
            return Ok(String::new());
        };
        let texts: Vec<String> = (top..=bottom)
            .flat_map(|row| (left..=right).map(move |col| (row, col)))
            .map(|(row, col)| table.cell_text(row, col))
            .collect();
        Ok(texts.join("\n"))
    }

    fn full_text(&mut self) -> Result<String> {
        self.record(BackendCall::FullText)?;
        Ok(self.document.as_ref().map(Document::plain_text).unwrap_or_default())
    }
}
