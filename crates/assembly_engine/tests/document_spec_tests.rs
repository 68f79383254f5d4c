//! Integration tests for declarative document specs and templates

use assembly_engine::{AssemblySettings, Session, Status};
use doc_backend::{count_calls, BackendCall, MemoryBackend};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_heading_and_text_round_trip() {
    let mut session = Session::new(MemoryBackend::new());
    let outcome = session.create_document_from_spec(&json!({
        "elements": [
            { "type": "heading", "content": "Quarterly Summary" },
            { "type": "text", "content": "Revenue grew." }
        ]
    }));
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.message, "Document created successfully");

    let text = session.full_text().unwrap();
    let heading = text.find("Quarterly Summary").unwrap();
    let body = text.find("Revenue grew.").unwrap();
    assert!(heading < body);
}

#[test]
fn test_table_element_is_filled_and_left() {
    let mut session = Session::new(MemoryBackend::new());
    let outcome = session.create_document_from_spec(&json!({
        "title": "Inventory",
        "elements": [
            { "type": "table", "properties": { "rows": 2, "cols": 2, "data": "[[\"item\", \"qty\"], [\"bolt\", 4]]" } },
            { "type": "text", "content": "end" }
        ]
    }));
    assert_eq!(outcome.status, Status::Success, "{}", outcome.message);

    let doc = session.backend().document().unwrap();
    let table = doc.tables().next().unwrap();
    assert_eq!(table.texts(), vec![vec!["item", "qty"], vec!["bolt", "4"]]);
    assert!(!table.cell(0, 0).unwrap().content.runs[0].style.bold);
    assert!(session.full_text().unwrap().ends_with("end"));
}

#[test]
fn test_invalid_element_creates_nothing() {
    let mut session = Session::new(MemoryBackend::new());
    let outcome = session.create_document_from_spec(&json!({
        "elements": [
            { "type": "text", "content": "fine" },
            { "type": "table", "properties": { "rows": 2 } }
        ]
    }));

    assert_eq!(outcome.status, Status::Error);
    assert!(outcome.message.starts_with("Element 2"));
    let calls = session.backend().calls();
    assert_eq!(count_calls(calls, |c| matches!(c, BackendCall::CreateDocument)), 0);
}

#[test]
fn test_save_reports_path() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = AssemblySettings::default();
    settings.output.directory = Some(temp_dir.path().to_path_buf());
    let mut session = Session::with_settings(MemoryBackend::new(), settings);

    let outcome = session.create_document_from_spec(&json!({
        "save": true,
        "specialType": { "type": "report", "params": { "title": "Audit" } }
    }));

    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.message, "Report created and saved successfully");
    let expected = temp_dir.path().join("report.hwp");
    assert_eq!(outcome.saved_path.as_deref(), Some(expected.to_string_lossy().as_ref()));
    assert!(expected.exists());
}

#[test]
fn test_failed_save_is_partial_success() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not_a_dir");
    std::fs::write(&blocker, "x").unwrap();
    let target = blocker.join("letter.hwp").to_string_lossy().to_string();

    let mut session = Session::new(MemoryBackend::new());
    let outcome = session.create_document_from_spec(&json!({
        "save": true,
        "filename": target,
        "special_type": { "type": "letter", "params": { "recipient": "Team" } }
    }));

    assert_eq!(outcome.status, Status::PartialSuccess);
    assert_eq!(outcome.message, "Letter created but failed to save");
    assert!(outcome.saved_path.is_none());
    assert!(session.full_text().unwrap().contains("To: Team"));
}

#[test]
fn test_fault_mid_document_is_partial_success() {
    let mut session = Session::new(MemoryBackend::new().with_fault_after(4));
    let outcome = session.create_document_from_spec(&json!({
        "elements": [
            { "type": "heading", "content": "One" },
            { "type": "text", "content": "Two" }
        ]
    }));

    assert_eq!(outcome.status, Status::PartialSuccess);
    assert!(outcome.message.starts_with("Document partially created"), "{}", outcome.message);
}

#[test]
fn test_refused_connection_is_an_error() {
    let mut session = Session::new(MemoryBackend::refusing_connection());
    let outcome = session.create_document_from_spec(&json!({ "elements": [] }));
    assert_eq!(outcome.status, Status::Error);
}

#[test]
fn test_missing_spec_body() {
    let mut session = Session::new(MemoryBackend::new());
    assert_eq!(
        session.create_document_from_spec(&json!({})).message,
        "Document specification is required"
    );
    assert_eq!(
        session.create_document_from_spec(&json!({ "title": "Only" })).message,
        "Document must contain 'elements' or 'special_type'"
    );
    assert_eq!(
        session
            .create_document_from_spec(&json!({ "special_type": { "type": "memo" } }))
            .message,
        "Unknown special document type: memo"
    );
}
