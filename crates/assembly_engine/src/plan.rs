//! Operation plans
//!
//! Freeform text, declarative specs and templates are all translated into a
//! flat list of steps before the backend is touched. Building the plan is
//! where validation happens; applying it only issues backend calls in order.

use crate::error::accepted;
use crate::grid::{GridCursor, GridPosition, TableState};
use crate::settings::TableSettings;
use crate::{Result, TableData};
use doc_backend::{Backend, FontStyle};

/// One styled insert operation
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    SetFont(FontStyle),
    Text(String),
    ParagraphBreak,
    Table {
        rows: usize,
        cols: usize,
        data: Option<TableData>,
        has_header: bool,
    },
}

/// Ordered steps for one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, step: PlanStep) {
        self.steps.push(step);
    }

    pub fn font(&mut self, style: FontStyle) -> &mut Self {
        self.steps.push(PlanStep::SetFont(style));
        self
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.steps.push(PlanStep::Text(text.into()));
        self
    }

    pub fn paragraph_break(&mut self) -> &mut Self {
        self.steps.push(PlanStep::ParagraphBreak);
        self
    }

    pub fn breaks(&mut self, count: usize) -> &mut Self {
        for _ in 0..count {
            self.steps.push(PlanStep::ParagraphBreak);
        }
        self
    }

    /// Text that should land as one paragraph
    pub fn line(&mut self, text: impl Into<String>) -> &mut Self {
        self.text(text).paragraph_break()
    }

    pub fn extend(&mut self, other: Plan) {
        self.steps.extend(other.steps);
    }

    /// Inserted text, in order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|s| match s {
            PlanStep::Text(t) => Some(t.as_str()),
            _ => None,
        })
    }

    /// Issue every step against the backend, stopping at the first failure
    pub fn apply<B: Backend>(&self, backend: &mut B, table: &mut TableState, settings: &TableSettings) -> Result<()> {
        tracing::debug!("Applying plan of {} steps", self.steps.len());
        for step in &self.steps {
            match step {
                PlanStep::SetFont(style) => {
                    accepted(backend.set_font_style(style)?, "Failed to set font")?;
                }
                PlanStep::Text(text) => {
                    accepted(backend.insert_text(text)?, "Failed to insert text")?;
                    table.cursor_moved();
                }
                PlanStep::ParagraphBreak => {
                    accepted(backend.insert_paragraph_break()?, "Failed to insert paragraph")?;
                    table.cursor_moved();
                }
                PlanStep::Table {
                    rows,
                    cols,
                    data,
                    has_header,
                } => {
                    let mut grid = GridCursor::new(backend, table);
                    grid.create_table(*rows, *cols, settings)?;
                    if let Some(data) = data {
                        grid.fill(data, GridPosition::ORIGIN, *has_header)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_backend::MemoryBackend;
    use serde_json::json;

    #[test]
    fn test_builder_helpers() {
        let mut plan = Plan::new();
        plan.font(FontStyle::sized(16)).line("Title").breaks(2);
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.texts().collect::<Vec<_>>(), vec!["Title"]);
    }

    #[test]
    fn test_apply_text_and_table() {
        let mut plan = Plan::new();
        plan.line("Intro");
        plan.push(PlanStep::Table {
            rows: 1,
            cols: 2,
            data: Some(TableData::parse(&json!([["a", "b"]])).unwrap()),
            has_header: false,
        });
        plan.text("Outro");

        let mut backend = MemoryBackend::with_document();
        let mut table = TableState::default();
        plan.apply(&mut backend, &mut table, &TableSettings::default()).unwrap();

        assert_eq!(backend.full_text().unwrap(), "Intro\n\na\tb\nOutro");
    }

    #[test]
    fn test_apply_stops_at_rejection() {
        let mut plan = Plan::new();
        plan.text("never");

        // Connected but no document: inserts are declined
        let mut backend = MemoryBackend::new();
        doc_backend::Backend::connect(&mut backend).unwrap();
        let mut table = TableState::default();
        let result = plan.apply(&mut backend, &mut table, &TableSettings::default());
        assert!(matches!(result, Err(crate::AssemblyError::Rejected(_))));
    }
}
