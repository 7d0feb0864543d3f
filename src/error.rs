use std::path::PathBuf;

use thiserror::Error;

/// A single problem found while compiling a schema document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaIssue {
    #[error("invalid anchor side `{0}` (expected left, right, top, bottom or center)")]
    InvalidAnchorSide(String),

    #[error("relationship #{index} ({from} -> {to}) references unknown entity `{missing}`")]
    DanglingRelationship {
        index: usize,
        from: String,
        to: String,
        missing: String,
    },

    #[error("entity `{0}` is declared more than once")]
    DuplicateEntity(String),

    #[error("field `{field}` of entity `{entity}` carries more than one key tag")]
    ConflictingFieldTags { entity: String, field: String },

    #[error("unknown cardinality `{0}` (expected one_to_one or one_to_many)")]
    UnknownCardinality(String),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse schema document: {0}")]
    Parse(String),

    #[error("schema has {} problem(s): {}", .0.len(), join_issues(.0))]
    Invalid(Vec<SchemaIssue>),
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("relationship `{label}` references unknown entity `{missing}`")]
    DanglingRelationship { label: String, missing: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to parse rendered scene: {0}")]
    Scene(String),

    #[error("failed to allocate a {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    #[error("failed to encode PNG: {0}")]
    Encode(String),

    #[error("invalid PNG scale {0}")]
    Scale(f32),
}

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("statistics source unavailable: {0}")]
    Unavailable(String),

    #[error("invalid month `{0}` (expected YYYY-MM)")]
    InvalidMonth(String),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("unknown built-in theme `{name}`. Available: {available}")]
    UnknownBuiltin { name: String, available: String },

    #[error("failed to read theme file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse theme: {0}")]
    Parse(String),
}

/// Top-level error used by the binaries.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error("failed to read {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_schema_lists_every_issue() {
        let err = SchemaError::Invalid(vec![
            SchemaIssue::DuplicateEntity("users".to_string()),
            SchemaIssue::InvalidAnchorSide("diagonal".to_string()),
        ]);
        let message = err.to_string();
        assert!(message.starts_with("schema has 2 problem(s)"));
        assert!(message.contains("`users`"));
        assert!(message.contains("`diagonal`"));
    }
}
