//! Document model held by the in-memory backend
//!
//! Blocks are either paragraphs (a sequence of styled runs) or tables. Table
//! cells hold a single paragraph; merged cells keep their grid slot but are
//! marked as covered by the region's top-left cell.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

// =============================================================================
// Runs and paragraphs
// =============================================================================

/// Character formatting of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharStyle {
    pub font_name: Option<String>,
    pub size: Option<u32>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// A contiguous piece of text sharing one style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub style: CharStyle,
}

impl Run {
    pub fn new(text: impl Into<String>, style: CharStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A paragraph made of styled runs. Offsets are counted in chars.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph holding a single run
    pub fn with_text(text: impl Into<String>, style: CharStyle) -> Self {
        let mut para = Self::new();
        para.runs.push(Run::new(text, style));
        para.normalize();
        para
    }

    /// Concatenated text of all runs
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.runs.iter().map(Run::char_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    /// Insert text at a char offset (clamped to the end)
    pub fn insert(&mut self, offset: usize, text: &str, style: &CharStyle) {
        if text.is_empty() {
            return;
        }
        let index = self.split_at(offset.min(self.char_len()));
        self.runs.insert(index, Run::new(text, style.clone()));
        self.normalize();
    }

    /// Split into two paragraphs at a char offset, returning the tail
    pub fn split_off(&mut self, offset: usize) -> Paragraph {
        let index = self.split_at(offset.min(self.char_len()));
        let tail = self.runs.split_off(index);
        self.normalize();
        let mut tail = Paragraph { runs: tail };
        tail.normalize();
        tail
    }

    /// Append all runs of another paragraph
    pub fn append(&mut self, other: Paragraph) {
        self.runs.extend(other.runs);
        self.normalize();
    }

    /// Remove chars in `start..end`
    pub fn delete_range(&mut self, start: usize, end: usize) {
        let len = self.char_len();
        let (start, end) = (start.min(len), end.min(len));
        if start >= end {
            return;
        }
        let first = self.split_at(start);
        let last = self.split_at(end);
        self.runs.drain(first..last);
        self.normalize();
    }

    /// Apply a style change to the chars in `start..end`
    pub fn restyle(&mut self, start: usize, end: usize, apply: impl Fn(&mut CharStyle)) {
        let len = self.char_len();
        let (start, end) = (start.min(len), end.min(len));
        if start >= end {
            return;
        }
        let first = self.split_at(start);
        let last = self.split_at(end);
        for run in &mut self.runs[first..last] {
            apply(&mut run.style);
        }
        self.normalize();
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// Char offset of the grapheme boundary after `offset`
    pub fn next_boundary(&self, offset: usize) -> Option<usize> {
        grapheme_offsets(&self.text()).into_iter().find(|&b| b > offset)
    }

    /// Char offset of the grapheme boundary before `offset`
    pub fn prev_boundary(&self, offset: usize) -> Option<usize> {
        let mut bounds = grapheme_offsets(&self.text());
        bounds.insert(0, 0);
        bounds.into_iter().rev().find(|&b| b < offset)
    }

    /// Ensure a run boundary at `offset` and return the index of the run starting there
    fn split_at(&mut self, offset: usize) -> usize {
        let mut acc = 0;
        for i in 0..self.runs.len() {
            let len = self.runs[i].char_len();
            if offset == acc {
                return i;
            }
            if offset < acc + len {
                let at = byte_index(&self.runs[i].text, offset - acc);
                let tail = self.runs[i].text.split_off(at);
                let style = self.runs[i].style.clone();
                self.runs.insert(i + 1, Run::new(tail, style));
                return i + 1;
            }
            acc += len;
        }
        self.runs.len()
    }

    /// Drop empty runs and merge neighbours that share a style
    fn normalize(&mut self) {
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.text.is_empty() {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.style == run.style => last.text.push_str(&run.text),
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }
}

fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// Char offsets of the end of each grapheme cluster
fn grapheme_offsets(text: &str) -> Vec<usize> {
    let mut acc = 0;
    text.graphemes(true)
        .map(|g| {
            acc += g.chars().count();
            acc
        })
        .collect()
}

// =============================================================================
// Tables
// =============================================================================

/// A rectangular region of merged cells (0-based, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRegion {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl MergedRegion {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.start_row..=self.end_row).contains(&row) && (self.start_col..=self.end_col).contains(&col)
    }
}

/// A single table cell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub content: Paragraph,
    /// Top-left cell of the merged region hiding this cell
    pub covered_by: Option<(usize, usize)>,
}

impl Cell {
    pub fn text(&self) -> String {
        self.content.text()
    }
}

/// A table block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: usize,
    pub cols: usize,
    pub column_widths: Vec<u32>,
    pub row_height: u32,
    pub cells: Vec<Vec<Cell>>,
    #[serde(default)]
    pub merges: Vec<MergedRegion>,
}

impl Table {
    /// Empty table of the given size
    pub fn new(rows: usize, cols: usize, column_widths: Vec<u32>, row_height: u32) -> Self {
        Self {
            rows,
            cols,
            column_widths,
            row_height,
            cells: vec![vec![Cell::default(); cols]; rows],
            merges: Vec::new(),
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(row).and_then(|r| r.get_mut(col))
    }

    /// Text of a cell, empty when out of range
    pub fn cell_text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).map(Cell::text).unwrap_or_default()
    }

    /// Cell texts as a row-major grid
    pub fn texts(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(Cell::text).collect())
            .collect()
    }

    /// Rows rendered with tab-separated cells
    pub fn plain_text(&self) -> String {
        self.texts()
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Document
// =============================================================================

/// A top-level block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

impl Block {
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        }
    }
}

/// The whole document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document with one empty paragraph
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::Paragraph(Paragraph::new())],
        }
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(Block::as_paragraph)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(Block::as_table)
    }

    /// Plain text with one line per paragraph and per table row
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| match block {
                Block::Paragraph(p) => p.text(),
                Block::Table(t) => t.plain_text(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
