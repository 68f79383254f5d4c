//! Explicit session handle
//!
//! A [`Session`] owns the backend for the duration of a caller's work. Every
//! engine entry point goes through it; there is no process-wide controller.

use crate::batch::{BatchDispatcher, BatchOperation, BatchReport};
use crate::error::accepted;
use crate::grid::{FillReport, GridCursor, GridPosition, TableShape, TableState};
use crate::interpreter::interpret;
use crate::outcome::DocumentOutcome;
use crate::plan::Plan;
use crate::segment::{plan_lines, plan_text, TextOptions};
use crate::settings::AssemblySettings;
use crate::spec::DocumentSpec;
use crate::{AssemblyError, Result, TableData};
use chrono::format::{Item, StrftimeItems};
use doc_backend::{Backend, FontStyle};
use serde_json::Value;

/// A caller-owned editing session over one backend
pub struct Session<B: Backend> {
    backend: B,
    settings: AssemblySettings,
    table: TableState,
}

impl<B: Backend> Session<B> {
    /// Create a session with default settings. The backend is connected lazily.
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, AssemblySettings::default())
    }

    pub fn with_settings(backend: B, settings: AssemblySettings) -> Self {
        Self {
            backend,
            settings,
            table: TableState::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn settings(&self) -> &AssemblySettings {
        &self.settings
    }

    /// What the engine knows about the most recent table
    pub fn table_state(&self) -> TableState {
        self.table
    }

    /// Connect if not connected yet
    pub fn ensure_connected(&mut self) -> Result<()> {
        if self.backend.is_connected() {
            return Ok(());
        }
        if self.backend.connect()? {
            tracing::info!("Connected to editing backend");
            Ok(())
        } else {
            tracing::error!("Editing backend refused the connection");
            Err(AssemblyError::BackendUnavailable)
        }
    }

    /// Optionally save to the current path, then disconnect
    pub fn close(&mut self, save: bool) -> Result<()> {
        self.table.forget();
        if !self.backend.is_connected() {
            return Ok(());
        }
        if save && !self.backend.save(None)? {
            tracing::debug!("Document has no path; closing without saving");
        }
        accepted(self.backend.disconnect()?, "Failed to close document")?;
        tracing::info!("Session closed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Document primitives
    // -------------------------------------------------------------------------

    pub fn create_document(&mut self) -> Result<()> {
        self.ensure_connected()?;
        accepted(self.backend.create_document()?, "Failed to create new document")?;
        self.table.forget();
        Ok(())
    }

    pub fn open(&mut self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(AssemblyError::validation("File path is required"));
        }
        self.ensure_connected()?;
        accepted(self.backend.open(path)?, "Failed to open document")?;
        self.table.forget();
        tracing::info!("Opened document {}", path);
        Ok(())
    }

    /// Save to `path`, or to the document's current path
    pub fn save(&mut self, path: Option<&str>) -> Result<()> {
        self.ensure_connected()?;
        accepted(self.backend.save(path)?, "Failed to save document")?;
        tracing::info!("Saved document to {}", path.unwrap_or("its current path"));
        Ok(())
    }

    /// Insert text, optionally splitting real or escaped newlines into paragraphs.
    ///
    /// Returns the number of lines inserted.
    pub fn insert_text(&mut self, text: &str, preserve_linebreaks: bool) -> Result<usize> {
        if text.is_empty() {
            return Err(AssemblyError::validation("Text is required"));
        }
        self.ensure_connected()?;
        let plan = plan_lines(text, preserve_linebreaks);
        self.apply(&plan)?;
        Ok(plan.texts().count())
    }

    pub fn insert_paragraphs(&mut self, count: usize) -> Result<()> {
        self.ensure_connected()?;
        let mut plan = Plan::new();
        plan.breaks(count);
        self.apply(&plan)
    }

    pub fn set_font(&mut self, style: &FontStyle) -> Result<()> {
        self.ensure_connected()?;
        accepted(self.backend.set_font_style(style)?, "Failed to set font")
    }

    pub fn full_text(&mut self) -> Result<String> {
        self.ensure_connected()?;
        Ok(self.backend.full_text()?)
    }

    fn apply(&mut self, plan: &Plan) -> Result<()> {
        plan.apply(&mut self.backend, &mut self.table, &self.settings.table)
    }

    fn grid(&mut self) -> GridCursor<'_, B> {
        GridCursor::new(&mut self.backend, &mut self.table)
    }

    // -------------------------------------------------------------------------
    // Tables
    // -------------------------------------------------------------------------

    pub fn create_table(&mut self, rows: usize, cols: usize) -> Result<TableShape> {
        self.ensure_connected()?;
        let settings = self.settings.table.clone();
        self.grid().create_table(rows, cols, &settings)
    }

    /// Create a table and fill it from row 1, column 1. Data is parsed before the table is created.
    ///
    /// When the cursor is already in a table, that table is filled instead.
    pub fn create_table_with_data(
        &mut self,
        rows: usize,
        cols: usize,
        data: Option<&Value>,
        has_header: bool,
    ) -> Result<Option<FillReport>> {
        if rows == 0 || cols == 0 {
            return Err(AssemblyError::validation("Valid rows and cols are required"));
        }
        let data = match data {
            None | Some(Value::Null) => None,
            Some(value) => Some(TableData::parse(value)?),
        };
        self.ensure_connected()?;
        if self.grid().cursor_in_table()? {
            tracing::info!("Cursor is already in a table; filling it instead of creating one");
        } else {
            self.create_table(rows, cols)?;
        }
        match data {
            Some(data) => Ok(Some(self.grid().fill(&data, GridPosition::ORIGIN, has_header)?)),
            None => Ok(None),
        }
    }

    /// Fill the table under the cursor (or the one just filled) from `start_row`, `start_col`
    pub fn fill_table(&mut self, data: &Value, start_row: usize, start_col: usize, has_header: bool) -> Result<FillReport> {
        let start = GridPosition::new(start_row, start_col)?;
        let data = TableData::parse(data)?;
        self.ensure_connected()?;
        self.grid().fill(&data, start, has_header)
    }

    pub fn fill_column_with_range(
        &mut self,
        start: i64,
        end: i64,
        column: usize,
        from_first_cell: bool,
    ) -> Result<FillReport> {
        self.ensure_connected()?;
        self.grid().fill_column_with_range(start, end, column, from_first_cell)
    }

    pub fn set_cell_text(&mut self, row: usize, col: usize, text: &str) -> Result<()> {
        let pos = GridPosition::new(row, col)?;
        self.ensure_connected()?;
        self.grid().write_cell(pos, text)
    }

    pub fn get_cell_text(&mut self, row: usize, col: usize) -> Result<String> {
        let pos = GridPosition::new(row, col)?;
        self.ensure_connected()?;
        self.grid().read_cell(pos)
    }

    pub fn merge_cells(&mut self, start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Result<()> {
        let coords = GridPosition::new(start_row, start_col).and_then(|s| Ok((s, GridPosition::new(end_row, end_col)?)));
        let (start, end) = coords.map_err(|_| AssemblyError::validation("Valid cell coordinates are required"))?;
        self.ensure_connected()?;
        self.grid().merge(start, end)
    }

    // -------------------------------------------------------------------------
    // Whole documents
    // -------------------------------------------------------------------------

    /// Build a new document from a declarative spec
    pub fn create_document_from_spec(&mut self, spec: &Value) -> DocumentOutcome {
        if let Err(e) = self.ensure_connected() {
            return e.into();
        }
        let spec = match DocumentSpec::from_value(spec) {
            Ok(spec) => spec,
            Err(e) => return e.into(),
        };
        let today = self.today();
        let interpreted = match interpret(&spec, &self.settings, &today) {
            Ok(interpreted) => interpreted,
            Err(e) => {
                tracing::warn!("Rejected document spec: {}", e);
                return e.into();
            }
        };

        let label = interpreted.kind.label();
        let filename = spec.save.then(|| {
            let name = spec
                .filename
                .as_deref()
                .unwrap_or_else(|| interpreted.kind.default_filename(&self.settings));
            self.settings.output.resolve(name).to_string_lossy().to_string()
        });
        self.compose(&interpreted.plan, label, filename)
    }

    /// Build a new document from freeform text
    pub fn create_document_from_text(
        &mut self,
        content: &str,
        options: &TextOptions,
        save_filename: Option<&str>,
    ) -> DocumentOutcome {
        if let Err(e) = self.ensure_connected() {
            return e.into();
        }
        let plan = match plan_text(content, options, &self.settings.text) {
            Ok(plan) => plan,
            Err(e) => return e.into(),
        };
        let save_as = save_filename
            .filter(|name| !name.is_empty())
            .map(|name| self.settings.output.resolve(name).to_string_lossy().to_string());
        let mut outcome = self.compose(&plan, "Document", save_as);
        if outcome.status.is_success() {
            outcome.message = "Document created from text successfully".to_string();
        }
        outcome
    }

    /// Create the document, apply the plan and optionally save it
    fn compose(&mut self, plan: &Plan, label: &str, save_as: Option<String>) -> DocumentOutcome {
        if let Err(e) = self.create_document() {
            return e.into();
        }
        if let Err(e) = self.apply(plan) {
            tracing::error!("{} only partially created: {}", label, e);
            return DocumentOutcome::partial(format!("{} partially created: {}", label, e));
        }

        let Some(path) = save_as else {
            tracing::info!("{} created", label);
            return DocumentOutcome::success(format!("{} created successfully", label));
        };
        match self.save(Some(&path)) {
            Ok(()) => DocumentOutcome::success(format!("{} created and saved successfully", label)).with_saved_path(path),
            Err(e) => {
                tracing::error!("Failed to save {}: {}", path, e);
                DocumentOutcome::partial(format!("{} created but failed to save", label))
            }
        }
    }

    /// Today's date in the configured template format
    fn today(&self) -> String {
        let format = &self.settings.templates.date_format;
        let valid = !StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
        let format = if valid {
            format.as_str()
        } else {
            tracing::warn!("Invalid date format '{}', using %Y-%m-%d", format);
            "%Y-%m-%d"
        };
        chrono::Local::now().format(format).to_string()
    }

    // -------------------------------------------------------------------------
    // Batches
    // -------------------------------------------------------------------------

    /// Run named operations in order, isolating each one's failure
    pub fn run_batch(&mut self, operations: &[BatchOperation]) -> BatchReport {
        BatchDispatcher::new().run(self, operations)
    }
}
