//! Error types for the Tableau core.

use thiserror::Error;

/// Errors raised while ingesting the tabular data source.
///
/// Ingestion failures are non-fatal for the process: the caller reports
/// them and no stage is constructed.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source returned no rows (or no `values` key at all)
    #[error("No data returned from the tabular source")]
    NoData,

    /// A row did not have exactly six cells
    #[error("Row {row} has {found} cells, expected 6")]
    RowWidth { row: usize, found: usize },

    /// A cell was neither a string nor a number
    #[error("Row {row}, column {column}: unsupported cell value")]
    InvalidCell { row: usize, column: usize },

    /// The source document was not valid JSON
    #[error("Malformed source document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors raised while constructing a stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// A stage is never built without records; formations would be undefined
    #[error("Cannot build a stage from an empty record store")]
    EmptyRecordStore,

    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
