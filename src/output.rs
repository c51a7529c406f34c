//! Output formatting for diff results.
//!
//! Two human views and one machine view:
//!
//! - [`OutputFormat::Tree`] nests changes under the keys and record
//!   identities that lead to them, headed by the document name;
//! - [`OutputFormat::Table`] lists one row per side of each change with its
//!   source line and pointer path;
//! - [`OutputFormat::Json`] serialises the full change list.
//!
//! Renderers only read the [`Diff`]; line numbers come from the changes.
//!
//! # Examples
//!
//! ```
//! use frappe_diff::{compute_diff, format_diff, parse_json, DiffConfig, OutputFormat, OutputOptions};
//!
//! let base = parse_json(r#"{"label": "Task"}"#).unwrap();
//! let head = parse_json(r#"{"label": "Todo"}"#).unwrap();
//! let diff = compute_diff(&base, &head, &DiffConfig::default());
//!
//! let options = OutputOptions { color: false, ..Default::default() };
//! let output = format_diff(&diff, "task.json", &OutputFormat::Tree, &options).unwrap();
//! assert!(output.contains("label : Task => Todo"));
//! ```

use crate::diff::{Change, ChangeType, Diff, DiffStats};
use crate::error::OutputError;
use crate::tree::Node;
use colored::*;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Changes nested under their keys and record identities
    Tree,
    /// One row per change side with line and path
    Table,
    /// JSON representation of the diff
    Json,
}

/// Options for controlling output formatting.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Emit ANSI colours (red removed, green added)
    pub color: bool,
    /// Maximum length for displayed values (truncate if longer)
    pub max_value_length: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            color: true,
            max_value_length: 120,
        }
    }
}

/// Formats a diff according to the specified format and options.
///
/// `title` names the compared document and heads the tree and table views.
pub fn format_diff(
    diff: &Diff,
    title: &str,
    format: &OutputFormat,
    options: &OutputOptions,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Tree => Ok(format_tree(diff, title, options)),
        OutputFormat::Table => Ok(format_table(diff, title, options)),
        OutputFormat::Json => format_json(diff, title),
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Added,
    Removed,
    Title,
}

fn paint(text: &str, tone: Tone, options: &OutputOptions) -> String {
    if !options.color {
        return text.to_string();
    }
    match tone {
        Tone::Added => text.green().to_string(),
        Tone::Removed => text.red().to_string(),
        Tone::Title => text.bold().to_string(),
    }
}

fn line_label(line: Option<usize>) -> String {
    match line {
        Some(line) => format!("L{}", line),
        None => "L?".to_string(),
    }
}

fn value_text(value: Option<&Node>, options: &OutputOptions) -> String {
    value
        .map(|node| node.preview(options.max_value_length))
        .unwrap_or_default()
}

// --- tree ---------------------------------------------------------------

#[derive(Debug)]
struct Branch {
    label: String,
    children: Vec<Branch>,
    items: Vec<Item>,
}

#[derive(Debug)]
enum Item {
    /// Index into the owning branch's `children`.
    Branch(usize),
    Leaf { text: String, details: Vec<String> },
}

impl Branch {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            children: Vec::new(),
            items: Vec::new(),
        }
    }

    fn child(&mut self, label: &str) -> &mut Branch {
        let index = match self.children.iter().position(|b| b.label == label) {
            Some(index) => index,
            None => {
                self.children.push(Branch::new(label));
                let index = self.children.len() - 1;
                self.items.push(Item::Branch(index));
                index
            }
        };
        &mut self.children[index]
    }
}

fn format_tree(diff: &Diff, title: &str, options: &OutputOptions) -> String {
    if diff.changes.is_empty() {
        return paint(title, Tone::Title, options);
    }

    let mut root = Branch::new(title);

    for change in &diff.changes {
        let mut branch = &mut root;
        for label in &change.trail {
            branch = branch.child(label);
        }
        branch.items.push(tree_leaf(change, options));
    }

    let mut output = paint(&root.label, Tone::Title, options);
    output.push('\n');
    render_branch(&root, "", &mut output);
    output.push('\n');
    output.push_str(&format_summary(&diff.stats));
    output
}

fn tree_leaf(change: &Change, options: &OutputOptions) -> Item {
    let max = options.max_value_length;
    match change.change_type {
        ChangeType::Removed | ChangeType::Added => {
            let (sign, line, value, tone) = if change.change_type == ChangeType::Removed {
                ("-", change.base_line, change.base_value.as_ref(), Tone::Removed)
            } else {
                ("+", change.head_line, change.head_value.as_ref(), Tone::Added)
            };

            let text = if change.is_record() || change.is_element() {
                format!("{} {} {}", sign, line_label(line), change.key)
            } else {
                format!(
                    "{} {} {} : {}",
                    sign,
                    line_label(line),
                    change.key,
                    value_text(value, options)
                )
            };

            let details = match (change.is_record(), value) {
                (true, Some(Node::Object(map))) => map
                    .iter()
                    .map(|(k, v)| {
                        paint(&format!("{} {} : {}", sign, k, v.preview(max)), tone, options)
                    })
                    .collect(),
                _ => Vec::new(),
            };

            Item::Leaf {
                text: paint(&text, tone, options),
                details,
            }
        }
        ChangeType::Modified => {
            let text = format!(
                "{} => {} {} : {} => {}",
                paint(&line_label(change.base_line), Tone::Removed, options),
                paint(&line_label(change.head_line), Tone::Added, options),
                change.key,
                paint(&value_text(change.base_value.as_ref(), options), Tone::Removed, options),
                paint(&value_text(change.head_value.as_ref(), options), Tone::Added, options),
            );
            Item::Leaf {
                text,
                details: Vec::new(),
            }
        }
    }
}

fn render_branch(branch: &Branch, prefix: &str, output: &mut String) {
    let items = &branch.items;
    for (i, item) in items.iter().enumerate() {
        let last = i + 1 == items.len();
        let (connector, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let child_prefix = format!("{}{}", prefix, indent);

        match item {
            Item::Branch(index) => {
                let child = &branch.children[*index];
                output.push_str(&format!("{}{}{}\n", prefix, connector, child.label));
                render_branch(child, &child_prefix, output);
            }
            Item::Leaf { text, details } => {
                output.push_str(&format!("{}{}{}\n", prefix, connector, text));
                for (j, detail) in details.iter().enumerate() {
                    let detail_connector = if j + 1 == details.len() {
                        "└── "
                    } else {
                        "├── "
                    };
                    output.push_str(&format!("{}{}{}\n", child_prefix, detail_connector, detail));
                }
            }
        }
    }
}

// --- table --------------------------------------------------------------

const TABLE_HEADERS: [&str; 3] = ["+-, L#, Path", "Key or Element", "Value"];

struct Row {
    cells: [String; 3],
    tone: Tone,
}

fn table_rows(change: &Change, options: &OutputOptions) -> Vec<Row> {
    let removed = |key: &str, value: String| Row {
        cells: [
            format!(
                "- {} {}",
                line_label(change.base_line),
                change.base_path.as_ref().map(|p| p.to_string()).unwrap_or_default()
            ),
            key.to_string(),
            value,
        ],
        tone: Tone::Removed,
    };
    let added = |key: &str, value: String| Row {
        cells: [
            format!(
                "+ {} {}",
                line_label(change.head_line),
                change.head_path.as_ref().map(|p| p.to_string()).unwrap_or_default()
            ),
            key.to_string(),
            value,
        ],
        tone: Tone::Added,
    };

    let mut rows = Vec::new();
    match change.change_type {
        ChangeType::Modified => {
            rows.push(removed(&change.key, value_text(change.base_value.as_ref(), options)));
            rows.push(added(&change.key, value_text(change.head_value.as_ref(), options)));
        }
        ChangeType::Removed | ChangeType::Added => {
            let is_removed = change.change_type == ChangeType::Removed;
            let value = if is_removed {
                change.base_value.as_ref()
            } else {
                change.head_value.as_ref()
            };
            let tone = if is_removed { Tone::Removed } else { Tone::Added };
            let head_row = if change.is_record() {
                "VALUES BELOW".to_string()
            } else if change.is_element() {
                String::new()
            } else {
                value_text(value, options)
            };
            rows.push(if is_removed {
                removed(&change.key, head_row)
            } else {
                added(&change.key, head_row)
            });

            if let (true, Some(Node::Object(map))) = (change.is_record(), value) {
                for (k, v) in map {
                    rows.push(Row {
                        cells: [
                            format!("In Dict: {}", change.key),
                            k.clone(),
                            v.preview(options.max_value_length),
                        ],
                        tone,
                    });
                }
            }
        }
    }
    rows
}

fn format_table(diff: &Diff, title: &str, options: &OutputOptions) -> String {
    if diff.changes.is_empty() {
        return paint(title, Tone::Title, options);
    }

    let rows: Vec<Row> = diff
        .changes
        .iter()
        .flat_map(|change| table_rows(change, options))
        .collect();

    let mut widths = TABLE_HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: [&str; 3]| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut output = paint(title, Tone::Title, options);
    output.push('\n');
    output.push_str(&render(TABLE_HEADERS));
    output.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    output.push_str(&rule.join("─┼─"));
    output.push('\n');

    for row in &rows {
        let line = render([
            row.cells[0].as_str(),
            row.cells[1].as_str(),
            row.cells[2].as_str(),
        ]);
        output.push_str(&paint(&line, row.tone, options));
        output.push('\n');
    }

    output.push('\n');
    output.push_str(&format_summary(&diff.stats));
    output
}

// --- json ---------------------------------------------------------------

/// Formats a diff as JSON, including statistics and diagnostics.
fn format_json(diff: &Diff, title: &str) -> Result<String, OutputError> {
    use serde_json::json;

    let changes: Vec<serde_json::Value> = diff
        .changes
        .iter()
        .map(|c| {
            json!({
                "type": c.change_type,
                "path": c.path().to_string(),
                "base_path": c.base_path.as_ref().map(|p| p.to_string()),
                "head_path": c.head_path.as_ref().map(|p| p.to_string()),
                "trail": c.trail,
                "key": c.key,
                "base_value": c.base_value.as_ref().map(Node::to_json),
                "head_value": c.head_value.as_ref().map(Node::to_json),
                "base_line": c.base_line,
                "head_line": c.head_line,
                "identity": c.identity,
            })
        })
        .collect();

    let diagnostics = serde_json::to_value(&diff.diagnostics)
        .map_err(|e| OutputError::JsonSerializationError { source: e })?;

    let output = json!({
        "label": title,
        "changes": changes,
        "stats": {
            "added": diff.stats.added,
            "removed": diff.stats.removed,
            "modified": diff.stats.modified,
        },
        "diagnostics": diagnostics,
    });

    serde_json::to_string_pretty(&output)
        .map_err(|e| OutputError::JsonSerializationError { source: e })
}

/// Formats summary statistics.
fn format_summary(stats: &DiffStats) -> String {
    if stats.is_empty() {
        return "Summary: No changes".to_string();
    }

    let mut parts = Vec::new();
    if stats.added > 0 {
        parts.push(format!("{} added", stats.added));
    }
    if stats.removed > 0 {
        parts.push(format!("{} removed", stats.removed));
    }
    if stats.modified > 0 {
        parts.push(format!("{} modified", stats.modified));
    }

    format!("Summary: {}", parts.join(", "))
}
