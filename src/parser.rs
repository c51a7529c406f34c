//! File parsing for JSON metadata documents.
//!
//! A [`Document`] couples the parsed value tree with the [`SourceLocator`]
//! built from the same text, so that every change can be annotated with the
//! line it came from.
//!
//! # Examples
//!
//! ```no_run
//! use frappe_diff::parser::parse_file;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = parse_file(Path::new("task.json"))?;
//! println!("{} has {} located nodes", doc.label, doc.locator.len());
//! # Ok(())
//! # }
//! ```

use crate::error::ParseError;
use crate::locator::SourceLocator;
use crate::tree::Node;
use std::fs;
use std::path::Path;

/// A parsed document together with its source positions.
#[derive(Debug, Clone)]
pub struct Document {
    /// File identity used in error messages and rendered headers.
    pub label: String,
    pub root: Node,
    pub locator: SourceLocator,
}

impl Document {
    /// Parses `content` into a document labelled `label`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::JsonError` when the text is not valid JSON, and
    /// `ParseError::SourceMap` if position mapping fails.
    pub fn parse(label: impl Into<String>, content: &str) -> Result<Self, ParseError> {
        let label = label.into();
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let root = parse_json(content).map_err(|e| ParseError::json_error(label.clone(), e))?;
        let locator =
            SourceLocator::build(content).map_err(|e| ParseError::source_map(label.clone(), e))?;

        log::debug!("parsed {} ({} located nodes)", label, locator.len());

        Ok(Self {
            label,
            root,
            locator,
        })
    }
}

/// Reads and parses a JSON file into a [`Document`].
///
/// # Errors
///
/// This function will return an error if:
/// - The file does not exist (`ParseError::FileNotFound`)
/// - The file cannot be read or is not UTF-8 (`ParseError::ReadError`)
/// - The file contains invalid JSON (`ParseError::JsonError`)
pub fn parse_file(path: &Path) -> Result<Document, ParseError> {
    let label = path.to_string_lossy().to_string();

    if !path.exists() {
        return Err(ParseError::file_not_found(label));
    }

    let content = fs::read_to_string(path).map_err(|e| ParseError::read_error(label.clone(), e))?;

    Document::parse(label, &content)
}

/// Parses a JSON string into a Node.
///
/// # Examples
///
/// ```
/// use frappe_diff::parser::parse_json;
///
/// let json = r#"{"doctype": "DocType", "name": "Task"}"#;
/// let node = parse_json(json).unwrap();
/// assert_eq!(node.type_name(), "object");
/// ```
pub fn parse_json(content: &str) -> Result<Node, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    Ok(json_to_node(value))
}

/// Converts a serde_json::Value to our Node representation, keeping key order.
pub fn json_to_node(value: serde_json::Value) -> Node {
    match value {
        serde_json::Value::Null => Node::Null,
        serde_json::Value::Bool(b) => Node::Bool(b),
        serde_json::Value::Number(n) => Node::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => Node::String(s),
        serde_json::Value::Array(arr) => Node::Array(arr.into_iter().map(json_to_node).collect()),
        serde_json::Value::Object(obj) => {
            Node::Object(obj.into_iter().map(|(k, v)| (k, json_to_node(v))).collect())
        }
    }
}
