//! Batch operation dispatcher
//!
//! Operations are looked up by name in a handler table and run strictly in
//! input order against one session. A failing operation becomes an `error`
//! entry in the report; it never stops the operations after it.

use crate::outcome::{DocumentOutcome, Status};
use crate::segment::TextOptions;
use crate::session::Session;
use crate::{AssemblyError, Result};
use doc_backend::{Backend, FontStyle};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One requested operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOperation {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub params: Value,
}

impl BatchOperation {
    pub fn new(operation: impl Into<String>, params: Value) -> Self {
        Self {
            operation: operation.into(),
            params,
        }
    }
}

/// Result entry for one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation: String,
    pub status: Status,
    pub message: String,
    /// Operation specific fields such as `text`, `path` or `saved_path`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OperationResult {
    fn error(operation: &str, message: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            status: Status::Error,
            message: message.into(),
            extra: Map::new(),
        }
    }
}

/// Whole-batch result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// `success` whenever the session was usable, whatever the entries say
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub results: Vec<OperationResult>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status == Status::Error).count()
    }
}

/// Dispatcher lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    NotStarted,
    Running,
    Done,
}

/// Successful handler output
#[derive(Debug, Clone, PartialEq)]
pub struct OpOutput {
    pub status: Status,
    pub message: String,
    pub extra: Map<String, Value>,
}

impl OpOutput {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    fn from_outcome(outcome: DocumentOutcome) -> Self {
        let mut output = Self {
            status: outcome.status,
            message: outcome.message,
            extra: Map::new(),
        };
        if let Some(path) = outcome.saved_path {
            output.extra.insert("saved_path".to_string(), Value::String(path));
        }
        output
    }
}

pub type OperationHandler<B> = fn(&mut Session<B>, Value) -> Result<OpOutput>;

/// Name-to-handler table plus run state
pub struct BatchDispatcher<B: Backend> {
    handlers: HashMap<&'static str, OperationHandler<B>>,
    state: BatchState,
}

impl<B: Backend> Default for BatchDispatcher<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> BatchDispatcher<B> {
    /// Dispatcher with every built-in operation registered
    pub fn new() -> Self {
        let mut dispatcher = Self {
            handlers: HashMap::new(),
            state: BatchState::NotStarted,
        };
        dispatcher.register("create", op_create::<B>);
        dispatcher.register("open", op_open::<B>);
        dispatcher.register("save", op_save::<B>);
        dispatcher.register("insert_text", op_insert_text::<B>);
        dispatcher.register("insert_paragraph", op_insert_paragraph::<B>);
        dispatcher.register("set_font", op_set_font::<B>);
        dispatcher.register("insert_table", op_insert_table::<B>);
        dispatcher.register("fill_table", op_fill_table::<B>);
        dispatcher.register("fill_column_numbers", op_fill_column_numbers::<B>);
        dispatcher.register("set_table_cell_text", op_set_table_cell_text::<B>);
        dispatcher.register("get_table_cell_text", op_get_table_cell_text::<B>);
        dispatcher.register("merge_table_cells", op_merge_table_cells::<B>);
        dispatcher.register("get_text", op_get_text::<B>);
        dispatcher.register("close", op_close::<B>);
        dispatcher.register("create_document_from_text", op_create_document_from_text::<B>);
        dispatcher.register("create_document_from_spec", op_create_document_from_spec::<B>);
        dispatcher
    }

    pub fn register(&mut self, name: &'static str, handler: OperationHandler<B>) {
        self.handlers.insert(name, handler);
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered operation names, sorted
    pub fn operation_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Run `operations` in order, producing one result per operation
    pub fn run(&mut self, session: &mut Session<B>, operations: &[BatchOperation]) -> BatchReport {
        self.state = BatchState::Running;
        if let Err(e) = session.ensure_connected() {
            self.state = BatchState::Done;
            return BatchReport {
                status: Status::Error,
                message: Some(e.to_string()),
                results: Vec::new(),
            };
        }

        let mut results = Vec::with_capacity(operations.len());
        for op in operations {
            let name = op.operation.as_str();
            let result = match self.handlers.get(name) {
                Some(handler) => match handler(session, op.params.clone()) {
                    Ok(output) => OperationResult {
                        operation: name.to_string(),
                        status: output.status,
                        message: output.message,
                        extra: output.extra,
                    },
                    Err(e) => {
                        tracing::error!("Operation '{}' failed: {}", name, e);
                        OperationResult::error(name, error_message(name, &e))
                    }
                },
                None => {
                    tracing::warn!("Unknown operation: {}", name);
                    OperationResult::error(name, format!("Unknown operation: {}", name))
                }
            };
            results.push(result);
        }

        self.state = BatchState::Done;
        let report = BatchReport {
            status: Status::Success,
            message: None,
            results,
        };
        tracing::info!(
            "Batch finished: {} operations, {} failed",
            report.results.len(),
            report.failed_count()
        );
        report
    }
}

fn error_message(operation: &str, err: &AssemblyError) -> String {
    match err {
        AssemblyError::Fill { .. } | AssemblyError::Backend(_) => {
            format!("Error in operation '{}': {}", operation, err)
        }
        _ => err.to_string(),
    }
}

/// Decode handler parameters; a missing `params` means all defaults
fn params<T: DeserializeOwned + Default>(value: Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| AssemblyError::validation(format!("Invalid parameters: {}", e)))
}

/// Non-positive or out-of-range numbers become 0, which fails validation downstream
fn to_index(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

// =============================================================================
// Parameters
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PathParams {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct InsertTextParams {
    text: String,
    preserve_linebreaks: bool,
}

impl Default for InsertTextParams {
    fn default() -> Self {
        Self {
            text: String::new(),
            preserve_linebreaks: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ParagraphParams {
    count: usize,
}

impl Default for ParagraphParams {
    fn default() -> Self {
        Self { count: 1 }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FontParams {
    name: Option<String>,
    size: Option<u32>,
    bold: bool,
    italic: bool,
    underline: bool,
    #[serde(alias = "select_previous_text")]
    select_previous_run: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TableParams {
    rows: i64,
    cols: i64,
    data: Option<Value>,
    has_header: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FillTableParams {
    data: Value,
    start_row: i64,
    start_col: i64,
    has_header: bool,
}

impl Default for FillTableParams {
    fn default() -> Self {
        Self {
            data: Value::Null,
            start_row: 1,
            start_col: 1,
            has_header: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ColumnParams {
    start: i64,
    end: i64,
    column: i64,
    from_first_cell: bool,
}

impl Default for ColumnParams {
    fn default() -> Self {
        Self {
            start: 1,
            end: 10,
            column: 1,
            from_first_cell: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CellParams {
    row: i64,
    col: i64,
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MergeParams {
    start_row: i64,
    start_col: i64,
    end_row: i64,
    end_col: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CloseParams {
    save: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FromTextParams {
    content: String,
    title: Option<String>,
    format_content: bool,
    save_filename: Option<String>,
    preserve_linebreaks: bool,
}

impl Default for FromTextParams {
    fn default() -> Self {
        Self {
            content: String::new(),
            title: None,
            format_content: true,
            save_filename: None,
            preserve_linebreaks: true,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn op_create<B: Backend>(session: &mut Session<B>, _params: Value) -> Result<OpOutput> {
    session.create_document()?;
    Ok(OpOutput::message("New document created successfully"))
}

fn op_open<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: PathParams = params(value)?;
    let path = p.path.unwrap_or_default();
    session.open(&path)?;
    Ok(OpOutput::message(format!("Document opened: {}", path)))
}

fn op_save<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: PathParams = params(value)?;
    match p.path.filter(|path| !path.is_empty()) {
        Some(path) => {
            session.save(Some(&path))?;
            Ok(OpOutput::message(format!("Document saved to: {}", path)))
        }
        None => {
            let scratch = session.settings().output.scratch_path().to_string_lossy().to_string();
            session.save(Some(&scratch))?;
            Ok(OpOutput::message(format!("Document saved to: {}", scratch)).with("path", scratch))
        }
    }
}

fn op_insert_text<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: InsertTextParams = params(value)?;
    let lines = session.insert_text(&p.text, p.preserve_linebreaks)?;
    Ok(OpOutput::message(if lines > 1 {
        "Text with line breaks inserted successfully"
    } else {
        "Text inserted successfully"
    }))
}

fn op_insert_paragraph<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: ParagraphParams = params(value)?;
    session.insert_paragraphs(p.count)?;
    Ok(OpOutput::message(format!("{} paragraph(s) inserted successfully", p.count)))
}

fn op_set_font<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: FontParams = params(value)?;
    let style = FontStyle {
        name: p.name,
        size: p.size,
        bold: p.bold,
        italic: p.italic,
        underline: p.underline,
        select_previous_run: p.select_previous_run,
    };
    session.set_font(&style)?;
    Ok(OpOutput::message("Font set successfully"))
}

fn op_insert_table<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: TableParams = params(value)?;
    let (rows, cols) = (to_index(p.rows), to_index(p.cols));
    let data = p.data.filter(|d| !matches!(d, Value::Array(items) if items.is_empty()));
    match session.create_table_with_data(rows, cols, data.as_ref(), p.has_header)? {
        Some(report) => Ok(OpOutput::message(format!(
            "Table created and filled ({}x{}): {}",
            rows, cols, report
        ))
        .with("cells_written", report.cells_written)),
        None => Ok(OpOutput::message(format!(
            "Table inserted with {} rows and {} columns",
            rows, cols
        ))),
    }
}

fn op_fill_table<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: FillTableParams = params(value)?;
    let report = session.fill_table(&p.data, to_index(p.start_row), to_index(p.start_col), p.has_header)?;
    Ok(OpOutput::message(report.to_string()).with("cells_written", report.cells_written))
}

fn op_fill_column_numbers<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: ColumnParams = params(value)?;
    let report = session.fill_column_with_range(p.start, p.end, to_index(p.column), p.from_first_cell)?;
    Ok(OpOutput::message(format!(
        "Filled column {} with {} to {}",
        p.column, p.start, p.end
    ))
    .with("cells_written", report.cells_written))
}

fn op_set_table_cell_text<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: CellParams = params(value)?;
    session.set_cell_text(to_index(p.row), to_index(p.col), &p.text)?;
    Ok(OpOutput::message(format!("Cell ({}, {}) updated", p.row, p.col)))
}

fn op_get_table_cell_text<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: CellParams = params(value)?;
    let text = session.get_cell_text(to_index(p.row), to_index(p.col))?;
    Ok(OpOutput::message(format!("Cell ({}, {}) retrieved", p.row, p.col)).with("text", text))
}

fn op_merge_table_cells<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: MergeParams = params(value)?;
    session.merge_cells(
        to_index(p.start_row),
        to_index(p.start_col),
        to_index(p.end_row),
        to_index(p.end_col),
    )?;
    Ok(OpOutput::message(format!(
        "Cells merged ({}, {}) - ({}, {})",
        p.start_row, p.start_col, p.end_row, p.end_col
    )))
}

fn op_get_text<B: Backend>(session: &mut Session<B>, _params: Value) -> Result<OpOutput> {
    let text = session.full_text()?;
    Ok(OpOutput::message("Text retrieved successfully").with("text", text))
}

fn op_close<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: CloseParams = params(value)?;
    session.close(p.save)?;
    Ok(OpOutput::message("Document closed successfully"))
}

fn op_create_document_from_text<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    let p: FromTextParams = params(value)?;
    if p.content.is_empty() {
        return Err(AssemblyError::validation("Document content is required"));
    }
    let options = TextOptions {
        title: p.title,
        format_content: p.format_content,
        preserve_linebreaks: p.preserve_linebreaks,
    };
    let outcome = session.create_document_from_text(&p.content, &options, p.save_filename.as_deref());
    Ok(OpOutput::from_outcome(outcome))
}

fn op_create_document_from_spec<B: Backend>(session: &mut Session<B>, value: Value) -> Result<OpOutput> {
    // Either the document spec itself or wrapped as `{"document_spec": {...}}`
    let spec = match value {
        Value::Object(mut map) if map.contains_key("document_spec") => {
            map.remove("document_spec").unwrap_or(Value::Null)
        }
        other => other,
    };
    let outcome = session.create_document_from_spec(&spec);
    Ok(OpOutput::from_outcome(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_backend::MemoryBackend;
    use serde_json::json;

    fn op(name: &str, params: Value) -> BatchOperation {
        BatchOperation::new(name, params)
    }

    #[test]
    fn test_registered_operations() {
        let dispatcher = BatchDispatcher::<MemoryBackend>::new();
        assert_eq!(dispatcher.operation_names().len(), 16);
        assert!(dispatcher.has_operation("fill_column_numbers"));
        assert!(!dispatcher.has_operation("ping"));
        assert_eq!(dispatcher.state(), BatchState::NotStarted);
    }

    #[test]
    fn test_state_reaches_done() {
        let mut session = Session::new(MemoryBackend::new());
        let mut dispatcher = BatchDispatcher::new();
        dispatcher.run(&mut session, &[op("create", Value::Null)]);
        assert_eq!(dispatcher.state(), BatchState::Done);
    }

    #[test]
    fn test_required_parameter_messages() {
        let mut session = Session::new(MemoryBackend::new());
        let report = session.run_batch(&[
            op("create", Value::Null),
            op("insert_text", json!({})),
            op("open", json!({})),
            op("insert_table", json!({ "rows": 0, "cols": 2 })),
            op("set_table_cell_text", json!({ "row": 0, "col": 1, "text": "x" })),
            op("merge_table_cells", json!({ "start_row": 1, "start_col": 1, "end_row": -1, "end_col": 2 })),
            op("create_document_from_text", json!({})),
        ]);

        let messages: Vec<&str> = report.results.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "New document created successfully",
                "Text is required",
                "File path is required",
                "Valid rows and cols are required",
                "Valid row and col are required",
                "Valid cell coordinates are required",
                "Document content is required",
            ]
        );
        assert_eq!(report.status, Status::Success);
        assert_eq!(report.failed_count(), 6);
    }

    #[test]
    fn test_bad_parameter_types_fail_only_that_entry() {
        let mut session = Session::new(MemoryBackend::new());
        let report = session.run_batch(&[
            op("create", Value::Null),
            op("insert_paragraph", json!({ "count": "three" })),
            op("insert_paragraph", json!({ "count": 2 })),
        ]);
        assert_eq!(report.results[1].status, Status::Error);
        assert!(report.results[1].message.starts_with("Invalid parameters"));
        assert_eq!(report.results[2].message, "2 paragraph(s) inserted successfully");
    }

    #[test]
    fn test_refused_connection_fails_whole_batch() {
        let mut session = Session::new(MemoryBackend::refusing_connection());
        let report = session.run_batch(&[op("create", Value::Null)]);
        assert_eq!(report.status, Status::Error);
        assert!(report.results.is_empty());
        assert!(report.message.is_some());
    }

    #[test]
    fn test_result_serialization_flattens_extra() {
        let result = OperationResult {
            operation: "get_text".into(),
            status: Status::Success,
            message: "Text retrieved successfully".into(),
            extra: OpOutput::message("").with("text", "abc").extra,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["text"], "abc");
        assert_eq!(json["status"], "success");
    }
}
