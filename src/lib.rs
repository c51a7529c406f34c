//! frappe-diff - structural diff for Frappe JSON metadata.
//!
//! Compares two versions of a DocType, customization, print format or
//! fixtures file and reports what was added, removed and modified. Records
//! in lists are paired by identity (`fieldname`, `role`, `state`...) rather
//! than position, every change carries the source line on each side, and
//! fields that embed JSON as text are diffed structurally.
//!
//! # Example
//!
//! ```no_run
//! use frappe_diff::{parse_file, compare_documents, DiffConfig, format_diff, OutputFormat, OutputOptions};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let base = parse_file(Path::new("old/task.json"))?;
//! let head = parse_file(Path::new("new/task.json"))?;
//!
//! let diff = compare_documents(&base, &head, &DiffConfig::default());
//!
//! let output = format_diff(&diff, "task.json", &OutputFormat::Tree, &OutputOptions::default())?;
//! println!("{}", output);
//! # Ok(())
//! # }
//! ```

pub mod diff;
pub mod error;
pub mod git;
pub mod locator;
pub mod matcher;
pub mod output;
pub mod parser;
pub mod path;
pub mod tree;

// Re-export commonly used types for convenience
pub use diff::{
    compare_documents, compute_diff, diff_into, Change, ChangeType, Diagnostic, Diff, DiffConfig,
    DiffSink, DiffStats, Side,
};
pub use error::{FrappeDiffError, LocateError, OutputError, ParseError};
pub use locator::{LocationKind, Position, SourceLocator};
pub use output::{format_diff, OutputFormat, OutputOptions};
pub use parser::{parse_file, parse_json, Document};
pub use path::{JsonPath, Segment};
pub use tree::Node;
