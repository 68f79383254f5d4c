//! Declarative document specification
//!
//! Keys are accepted in both `camelCase` and `snake_case`.

use crate::{AssemblyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A whole document described as data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSpec {
    pub title: Option<String>,
    pub filename: Option<String>,
    pub elements: Option<Vec<Element>>,
    #[serde(alias = "specialType")]
    pub special_type: Option<SpecialType>,
    pub save: bool,
}

impl DocumentSpec {
    /// Decode a spec from request JSON
    pub fn from_value(value: &Value) -> Result<Self> {
        let empty = match value {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if empty {
            return Err(AssemblyError::validation("Document specification is required"));
        }
        DocumentSpec::deserialize(value)
            .map_err(|e| AssemblyError::validation(format!("Invalid document specification: {}", e)))
    }
}

/// Recognized element types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Heading,
    Text,
    Paragraph,
    Table,
}

impl ElementKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "heading" => Some(Self::Heading),
            "text" => Some(Self::Text),
            "paragraph" => Some(Self::Paragraph),
            "table" => Some(Self::Table),
            _ => None,
        }
    }
}

/// One entry of the element list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub properties: ElementProperties,
}

impl Element {
    pub fn kind(&self) -> Option<ElementKind> {
        ElementKind::from_name(&self.kind)
    }
}

/// Optional element properties; which ones apply depends on the element type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementProperties {
    #[serde(alias = "fontSize")]
    pub font_size: Option<u32>,
    #[serde(alias = "fontName")]
    pub font_name: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub rows: Option<i64>,
    pub cols: Option<i64>,
    pub data: Option<Value>,
    #[serde(alias = "hasHeader")]
    pub has_header: Option<bool>,
}

/// A named template and its parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialType {
    #[serde(rename = "type")]
    pub kind: String,
    pub params: Value,
}
