//! Table data ingestion
//!
//! Tabular input arrives loosely typed: a JSON array, a string holding JSON or
//! bracketed literal syntax, a comma separated list, or a bare scalar. Strings
//! go through an ordered chain of parsers, strictest first, ending in a
//! catch-all that wraps the input as a single cell. Malformed strings are
//! therefore always accepted as *some* table; only structurally impossible
//! input (objects, null, empty lists) is refused.

use crate::literal::parse_literal;
use crate::{AssemblyError, Result};
use serde::Serialize;
use serde_json::Value;

/// How the input was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    /// Already a list
    List,
    /// A bare number or boolean
    Scalar,
    Json,
    Literal,
    CommaSplit,
    SingleCell,
}

impl ParseStrategy {
    /// String strategies in the order they are tried
    pub const STRING_CHAIN: [ParseStrategy; 4] = [
        ParseStrategy::Json,
        ParseStrategy::Literal,
        ParseStrategy::CommaSplit,
        ParseStrategy::SingleCell,
    ];

    /// Try to read `input` as a list of rows
    fn attempt(self, input: &str) -> Option<Vec<Value>> {
        match self {
            ParseStrategy::Json => match serde_json::from_str::<Value>(input) {
                Ok(Value::Array(rows)) => Some(rows),
                _ => None,
            },
            ParseStrategy::Literal => match parse_literal(input) {
                Ok(Value::Array(rows)) => Some(rows),
                _ => None,
            },
            ParseStrategy::CommaSplit if input.contains(',') => Some(
                input
                    .split(',')
                    .map(|token| Value::Array(vec![Value::String(token.trim().to_string())]))
                    .collect(),
            ),
            ParseStrategy::SingleCell => Some(vec![Value::Array(vec![Value::String(input.to_string())])]),
            _ => None,
        }
    }
}

/// Rows of cell text, in data order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableData {
    rows: Vec<Vec<String>>,
    strategy: ParseStrategy,
}

impl TableData {
    /// Interpret any JSON value as table data
    pub fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::Array(rows) => Self::normalize(rows, ParseStrategy::List),
            Value::String(s) => Self::parse_str(s),
            Value::Number(_) | Value::Bool(_) => Self::normalize(std::slice::from_ref(value), ParseStrategy::Scalar),
            Value::Object(_) => Err(AssemblyError::Parse("objects are not tabular data".to_string())),
            Value::Null => Err(AssemblyError::Parse("no table data given".to_string())),
        }
    }

    /// Interpret a string through the strategy chain
    pub fn parse_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(AssemblyError::validation("Table data is required"));
        }
        for strategy in ParseStrategy::STRING_CHAIN {
            if let Some(rows) = strategy.attempt(input) {
                if strategy != ParseStrategy::Json {
                    tracing::warn!("Table data is not a JSON array, read it as {:?}", strategy);
                }
                return Self::normalize(&rows, strategy);
            }
        }
        // SingleCell never declines
        Err(AssemblyError::Parse(input.to_string()))
    }

    fn normalize(rows: &[Value], strategy: ParseStrategy) -> Result<Self> {
        if rows.is_empty() {
            return Err(AssemblyError::validation("Empty data list"));
        }
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Array(cells) => cells.iter().map(cell_text).collect(),
                scalar => {
                    tracing::debug!("Row {} is not a list, promoting it to one cell", i);
                    vec![cell_text(scalar)]
                }
            })
            .collect();
        Ok(Self { rows, strategy })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn strategy(&self) -> ParseStrategy {
        self.strategy
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row
    pub fn max_cols(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Drop rows and cells that fall outside `max_rows` x `max_cols`.
    ///
    /// Returns the number of dropped rows and the number of rows that lost cells.
    pub fn clamp(&mut self, max_rows: usize, max_cols: usize) -> (usize, usize) {
        let dropped_rows = self.rows.len().saturating_sub(max_rows);
        self.rows.truncate(max_rows);
        let mut clipped = 0;
        for row in &mut self.rows {
            if row.len() > max_cols {
                row.truncate(max_cols);
                clipped += 1;
            }
        }
        (dropped_rows, clipped)
    }
}

/// Text written into a cell for a data value
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_is_used_directly() {
        let data = TableData::parse(&json!([["a", 1], ["b", null, true]])).unwrap();
        assert_eq!(data.strategy(), ParseStrategy::List);
        assert_eq!(data.rows(), &[vec!["a", "1"], vec!["b", "", "true"]]);
        assert_eq!(data.max_cols(), 3);
        assert_eq!(data.cell_count(), 5);
    }

    #[test]
    fn test_scalar_rows_are_promoted() {
        let data = TableData::parse(&json!(["x", 2, ["y"]])).unwrap();
        assert_eq!(data.rows(), &[vec!["x"], vec!["2"], vec!["y"]]);
    }

    #[test]
    fn test_json_string() {
        let data = TableData::parse(&json!(r#"[["h1","h2"],["v1","v2"]]"#)).unwrap();
        assert_eq!(data.strategy(), ParseStrategy::Json);
        assert_eq!(data.rows(), &[vec!["h1", "h2"], vec!["v1", "v2"]]);
    }

    #[test]
    fn test_literal_string() {
        let data = TableData::parse_str("[('a', 1), ('b', None)]").unwrap();
        assert_eq!(data.strategy(), ParseStrategy::Literal);
        assert_eq!(data.rows(), &[vec!["a", "1"], vec!["b", ""]]);
    }

    #[test]
    fn test_comma_split_fallback() {
        let data = TableData::parse_str("not json, not list").unwrap();
        assert_eq!(data.strategy(), ParseStrategy::CommaSplit);
        assert_eq!(data.rows(), &[vec!["not json"], vec!["not list"]]);
    }

    #[test]
    fn test_single_cell_fallback() {
        let data = TableData::parse_str("just words").unwrap();
        assert_eq!(data.strategy(), ParseStrategy::SingleCell);
        assert_eq!(data.rows(), &[vec!["just words"]]);
    }

    #[test]
    fn test_deeply_nested_input_is_one_cell() {
        let input = "[".repeat(20_000);
        let data = TableData::parse_str(&input).unwrap();
        assert_eq!(data.strategy(), ParseStrategy::SingleCell);
        assert_eq!(data.rows()[0][0].len(), 20_000);
    }

    #[test]
    fn test_json_scalar_string_falls_through() {
        let data = TableData::parse_str("42").unwrap();
        assert_eq!(data.strategy(), ParseStrategy::SingleCell);
        assert_eq!(data.rows(), &[vec!["42"]]);
    }

    #[test]
    fn test_number_value_is_one_cell() {
        let data = TableData::parse(&json!(7)).unwrap();
        assert_eq!(data.strategy(), ParseStrategy::Scalar);
        assert_eq!(data.rows(), &[vec!["7"]]);
    }

    #[test]
    fn test_rejected_shapes() {
        assert!(matches!(TableData::parse(&json!([])), Err(AssemblyError::Validation(_))));
        assert!(matches!(TableData::parse(&json!("[]")), Err(AssemblyError::Validation(_))));
        assert!(matches!(TableData::parse(&json!({"a": 1})), Err(AssemblyError::Parse(_))));
        assert!(matches!(TableData::parse(&Value::Null), Err(AssemblyError::Parse(_))));
        assert!(matches!(TableData::parse_str("   "), Err(AssemblyError::Validation(_))));
    }

    #[test]
    fn test_nested_cells_keep_json_form() {
        let data = TableData::parse(&json!([[["x", 1]]])).unwrap();
        assert_eq!(data.rows(), &[vec![r#"["x",1]"#]]);
    }

    #[test]
    fn test_clamp() {
        let mut data = TableData::parse(&json!([["a", "b", "c"], ["d"], ["e", "f"]])).unwrap();
        let (rows, cols) = data.clamp(2, 2);
        assert_eq!((rows, cols), (1, 1));
        assert_eq!(data.rows(), &[vec!["a", "b"], vec!["d"]]);
    }
}
