//! Record of primitive calls received by a backend

use crate::{Direction, FontStyle, MoveUnit, TableLayout};
use serde::{Deserialize, Serialize};

/// One primitive call, in the order it was received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum BackendCall {
    Connect,
    Disconnect,
    CreateDocument,
    Open { path: String },
    Save { path: Option<String> },
    InsertText { text: String },
    ParagraphBreak,
    SetFontStyle { style: FontStyle },
    CreateTable { layout: TableLayout },
    Move { direction: Direction, unit: MoveUnit },
    SelectCell,
    SelectTable,
    CancelSelection,
    DeleteSelection,
    MergeCells,
    SelectedText,
    FullText,
}

impl BackendCall {
    /// Whether this call inserted text
    pub fn is_insert_text(&self) -> bool {
        matches!(self, BackendCall::InsertText { .. })
    }
}

/// Summary counters over a call sequence
pub fn count_calls<'a>(calls: impl IntoIterator<Item = &'a BackendCall>, pred: impl Fn(&BackendCall) -> bool) -> usize {
    calls.into_iter().filter(|c| pred(c)).count()
}
