//! Document spec interpreter
//!
//! Translates a [`DocumentSpec`] into a [`Plan`], either by walking its
//! element list or by delegating to a named template. Nothing here touches
//! the backend, so every validation failure happens before the document is
//! created.

use crate::plan::{Plan, PlanStep};
use crate::settings::AssemblySettings;
use crate::spec::{DocumentSpec, Element, ElementKind};
use crate::templates::Template;
use crate::{AssemblyError, Result, TableData};
use doc_backend::FontStyle;
use serde_json::Value;

/// Which interpretation path a spec took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Generic,
    Template(Template),
}

impl DocumentKind {
    /// Capitalized noun used in outcome messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Generic => "Document",
            Self::Template(t) => t.label(),
        }
    }

    /// File name used when a document spec asks to save without naming one
    pub fn default_filename<'a>(&self, settings: &'a AssemblySettings) -> &'a str {
        match self {
            Self::Generic => &settings.output.document_filename,
            Self::Template(Template::Report) => &settings.output.report_filename,
            Self::Template(Template::Letter) => &settings.output.letter_filename,
        }
    }
}

/// A validated spec, ready to apply
#[derive(Debug, Clone, PartialEq)]
pub struct InterpretedSpec {
    pub kind: DocumentKind,
    pub plan: Plan,
}

/// Validate `spec` and build its plan. `today` fills in template dates.
pub fn interpret(spec: &DocumentSpec, settings: &AssemblySettings, today: &str) -> Result<InterpretedSpec> {
    if let Some(special) = &spec.special_type {
        if spec.elements.is_some() {
            tracing::warn!("Spec has both elements and a special type; using the '{}' template", special.kind);
        }
        let template = Template::from_name(&special.kind).ok_or_else(|| {
            AssemblyError::validation(format!("Unknown special document type: {}", special.kind))
        })?;
        let plan = template.plan(&special.params, &settings.templates, today)?;
        return Ok(InterpretedSpec {
            kind: DocumentKind::Template(template),
            plan,
        });
    }

    let Some(elements) = &spec.elements else {
        return Err(AssemblyError::validation(
            "Document must contain 'elements' or 'special_type'",
        ));
    };

    let mut plan = Plan::new();
    if let Some(title) = spec.title.as_deref().filter(|t| !t.is_empty()) {
        plan.font(FontStyle::sized(settings.elements.title_size).with_bold(true))
            .line(title);
    }
    for (index, element) in elements.iter().enumerate() {
        match element.kind() {
            Some(kind) => plan.extend(plan_element(kind, element, settings).map_err(|e| match e {
                AssemblyError::Validation(msg) => AssemblyError::Validation(format!("Element {}: {}", index + 1, msg)),
                other => other,
            })?),
            None => tracing::warn!("Unknown element type: {}", element.kind),
        }
    }
    tracing::debug!("Interpreted {} elements into {} steps", elements.len(), plan.len());
    Ok(InterpretedSpec {
        kind: DocumentKind::Generic,
        plan,
    })
}

fn plan_element(kind: ElementKind, element: &Element, settings: &AssemblySettings) -> Result<Plan> {
    let props = &element.properties;
    let mut plan = Plan::new();
    match kind {
        ElementKind::Heading => {
            // Headings are never italic
            if props.italic == Some(true) {
                tracing::debug!("Ignoring italic on heading '{}'", element.content);
            }
            let style = FontStyle::sized(props.font_size.unwrap_or(settings.elements.heading_size))
                .with_name(props.font_name.clone())
                .with_bold(props.bold.unwrap_or(true))
                .with_underline(props.underline.unwrap_or(false));
            plan.font(style).line(element.content.as_str());
        }
        ElementKind::Text => {
            let style = FontStyle::sized(props.font_size.unwrap_or(settings.elements.text_size))
                .with_name(props.font_name.clone())
                .with_bold(props.bold.unwrap_or(false))
                .with_italic(props.italic.unwrap_or(false))
                .with_underline(props.underline.unwrap_or(false));
            plan.font(style).text(element.content.as_str());
        }
        ElementKind::Paragraph => {
            plan.paragraph_break();
        }
        ElementKind::Table => {
            let rows = positive(props.rows);
            let cols = positive(props.cols);
            let (Some(rows), Some(cols)) = (rows, cols) else {
                return Err(AssemblyError::validation("Valid rows and cols are required"));
            };
            let data = match &props.data {
                None | Some(Value::Null) => None,
                Some(Value::Array(items)) if items.is_empty() => None,
                Some(value) => Some(TableData::parse(value)?),
            };
            plan.push(PlanStep::Table {
                rows,
                cols,
                data,
                has_header: props.has_header.unwrap_or(false),
            });
        }
    }
    Ok(plan)
}

fn positive(value: Option<i64>) -> Option<usize> {
    value.filter(|v| *v > 0).and_then(|v| usize::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> DocumentSpec {
        DocumentSpec::from_value(&value).unwrap()
    }

    fn run(value: Value) -> Result<InterpretedSpec> {
        interpret(&spec(value), &AssemblySettings::default(), "2026-10-14")
    }

    #[test]
    fn test_heading_and_text_defaults() {
        let result = run(json!({
            "elements": [
                { "type": "heading", "content": "Head" },
                { "type": "text", "content": "Body", "properties": { "italic": true } }
            ]
        }))
        .unwrap();

        assert_eq!(result.kind, DocumentKind::Generic);
        assert_eq!(
            result.plan.steps(),
            &[
                PlanStep::SetFont(FontStyle::sized(16).with_bold(true)),
                PlanStep::Text("Head".into()),
                PlanStep::ParagraphBreak,
                PlanStep::SetFont(FontStyle::sized(10).with_italic(true)),
                PlanStep::Text("Body".into()),
            ]
        );
    }

    #[test]
    fn test_heading_style_overrides_skip_italic() {
        let result = run(json!({
            "elements": [{
                "type": "heading",
                "content": "Head",
                "properties": { "italic": true, "underline": true, "fontName": "Batang", "bold": false }
            }]
        }))
        .unwrap();

        let expected = FontStyle::sized(16)
            .with_name(Some("Batang".into()))
            .with_underline(true);
        assert_eq!(result.plan.steps()[0], PlanStep::SetFont(expected));
    }

    #[test]
    fn test_title_becomes_leading_heading() {
        let result = run(json!({ "title": "Doc", "elements": [] })).unwrap();
        assert_eq!(result.plan.texts().collect::<Vec<_>>(), vec!["Doc"]);
    }

    #[test]
    fn test_unknown_elements_are_skipped() {
        let result = run(json!({
            "elements": [{ "type": "image", "content": "x.png" }, { "type": "paragraph", "content": "ignored" }]
        }))
        .unwrap();
        assert_eq!(result.plan.steps(), &[PlanStep::ParagraphBreak]);
    }

    #[test]
    fn test_table_element() {
        let result = run(json!({
            "elements": [{ "type": "table", "properties": { "rows": 2, "cols": 2, "data": [["a", "b"]] } }]
        }))
        .unwrap();
        match &result.plan.steps()[0] {
            PlanStep::Table { rows, cols, data, has_header } => {
                assert_eq!((*rows, *cols), (2, 2));
                assert!(!has_header);
                assert_eq!(data.as_ref().unwrap().cell_count(), 2);
            }
            other => panic!("expected table step, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_table_is_rejected() {
        let result = run(json!({
            "elements": [{ "type": "text", "content": "ok" }, { "type": "table", "properties": { "rows": 0, "cols": 2 } }]
        }));
        match result {
            Err(AssemblyError::Validation(msg)) => assert!(msg.starts_with("Element 2")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_template_wins_over_elements() {
        let result = run(json!({
            "elements": [{ "type": "text", "content": "lost" }],
            "special_type": { "type": "letter", "params": {} }
        }))
        .unwrap();
        assert_eq!(result.kind, DocumentKind::Template(Template::Letter));
        assert!(!result.plan.texts().any(|t| t == "lost"));
    }

    #[test]
    fn test_unknown_template_and_missing_body() {
        assert!(matches!(
            run(json!({ "specialType": { "type": "memo" } })),
            Err(AssemblyError::Validation(msg)) if msg.contains("memo")
        ));
        assert!(matches!(run(json!({ "title": "x" })), Err(AssemblyError::Validation(_))));
    }

    #[test]
    fn test_default_filenames() {
        let settings = AssemblySettings::default();
        assert_eq!(DocumentKind::Generic.default_filename(&settings), "generated_document.hwp");
        assert_eq!(
            DocumentKind::Template(Template::Report).default_filename(&settings),
            "report.hwp"
        );
        assert_eq!(DocumentKind::Template(Template::Letter).label(), "Letter");
    }
}
