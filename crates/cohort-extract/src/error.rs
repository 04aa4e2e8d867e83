use thiserror::Error;

/// Fatal extraction failures. Row-level missing data never surfaces here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Roster error: {0}")]
    Roster(String),

    #[error("Column {column} not found in {source_id} ({available} columns available)")]
    MissingColumn {
        source_id: String,
        column: String,
        available: usize,
    },

    #[error("No value in column {column} of {source_id} could be read as {kind} ({failed} rows failed)")]
    ColumnCoercion {
        source_id: String,
        column: String,
        kind: String,
        failed: usize,
    },

    #[error("Column '{column}' holds non-numeric value '{value}' at row {row}")]
    NotNumeric {
        column: String,
        value: String,
        row: usize,
    },

    #[error("Column '{column}' must hold categorical text to build an indicator, found '{value}' at row {row}")]
    NotCategorical {
        column: String,
        value: String,
        row: usize,
    },

    #[error("Column '{0}' is already present in the table")]
    DuplicateColumn(String),

    #[error("Column '{0}' is not present in the table")]
    UnknownColumn(String),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
