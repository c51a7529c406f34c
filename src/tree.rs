//! Value tree for parsed metadata documents.

use indexmap::IndexMap;

/// A node representing one JSON value. Objects keep their source key order.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(IndexMap<String, Node>),
    Array(Vec<Node>),
}

impl Node {
    pub fn type_name(&self) -> &str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Object(_) => "object",
            Node::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Checks if two nodes are semantically equal (ignores key ordering, uses epsilon for floats).
    pub fn semantic_equals(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Null, Node::Null) => true,
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::String(a), Node::String(b)) => a == b,
            (Node::Number(a), Node::Number(b)) => {
                const EPSILON: f64 = 1e-10;
                (a - b).abs() < EPSILON
            }
            (Node::Object(a), Node::Object(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|v| value.semantic_equals(v)))
            }
            (Node::Array(a), Node::Array(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(item_a, item_b)| item_a.semantic_equals(item_b))
            }
            _ => false,
        }
    }

    /// Compact JSON text with object keys sorted, usable as a hash key.
    ///
    /// Two nodes that are `semantic_equals` up to float epsilon produce the
    /// same canonical text in practice, since both come from decimal literals.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }

    fn write_canonical(&self, out: &mut String) {
        match self {
            Node::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                out.push('{');
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&serde_json::Value::String(key.clone()).to_string());
                    out.push(':');
                    if let Some(value) = map.get(key) {
                        value.write_canonical(out);
                    }
                }
                out.push('}');
            }
            Node::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_canonical(out);
                }
                out.push(']');
            }
            scalar => out.push_str(&scalar.to_json().to_string()),
        }
    }

    /// Text shown to a reviewer: strings as-is, everything else as compact JSON.
    pub fn display(&self) -> String {
        match self {
            Node::String(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }

    /// Returns `display()` truncated to `max_len` characters.
    pub fn preview(&self, max_len: usize) -> String {
        let text = self.display();
        if text.chars().count() > max_len {
            let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        } else {
            text
        }
    }

    /// Converts back to a `serde_json::Value`, preserving key order.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Null => serde_json::Value::Null,
            Node::Bool(b) => serde_json::Value::Bool(*b),
            Node::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 9.0e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Node::String(s) => serde_json::Value::String(s.clone()),
            Node::Array(arr) => serde_json::Value::Array(arr.iter().map(Node::to_json).collect()),
            Node::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}
