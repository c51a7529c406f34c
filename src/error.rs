//! Custom error types for frappe-diff.

use crate::locator::ScanError;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read file {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not map source positions in {path}: {source}")]
    SourceMap {
        path: String,
        #[source]
        source: ScanError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("No source position for path {path}")]
    PathNotFound { path: String },
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to serialize to JSON: {source}")]
    JsonSerializationError {
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FrappeDiffError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Git(#[from] crate::git::GitError),
}

impl ParseError {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn read_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub fn json_error(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonError {
            path: path.into(),
            source,
        }
    }

    pub fn source_map(path: impl Into<String>, source: ScanError) -> Self {
        Self::SourceMap {
            path: path.into(),
            source,
        }
    }

    /// The file label the error refers to.
    pub fn path(&self) -> &str {
        match self {
            Self::FileNotFound { path }
            | Self::ReadError { path, .. }
            | Self::JsonError { path, .. }
            | Self::SourceMap { path, .. } => path,
        }
    }
}

impl LocateError {
    pub fn path_not_found(path: impl ToString) -> Self {
        Self::PathNotFound {
            path: path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::file_not_found("test.json");
        assert_eq!(err.to_string(), "File not found: test.json");
    }

    #[test]
    fn test_json_error_names_file() {
        let source = serde_json::from_str::<serde_json::Value>("{oops}").unwrap_err();
        let err = ParseError::json_error("doctype/task/task.json", source);
        assert!(err.to_string().contains("Invalid JSON"));
        assert!(err.to_string().contains("doctype/task/task.json"));
        assert_eq!(err.path(), "doctype/task/task.json");
    }

    #[test]
    fn test_path_not_found_display() {
        let err = LocateError::path_not_found("/fields/9");
        assert_eq!(err.to_string(), "No source position for path /fields/9");
    }

    #[test]
    fn test_frappe_diff_error_from_parse_error() {
        let parse_err = ParseError::file_not_found("test.json");
        let err: FrappeDiffError = parse_err.into();
        assert!(matches!(err, FrappeDiffError::Parse(_)));
    }
}
