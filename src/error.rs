use thiserror::Error;

/// Failures raised while turning the raw datasets into the demo table.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("dataset '{dataset}': column '{column}' not found (available: {available})")]
    MissingColumn {
        dataset: String,
        column: String,
        available: String,
    },

    #[error("dataset '{dataset}': row {row}: column '{column}' holds non-numeric id '{value}'")]
    InvalidId {
        dataset: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("dataset '{dataset}': row {row}: column '{column}' is empty")]
    MissingName {
        dataset: String,
        column: String,
        row: usize,
    },

    #[error("dataset '{dataset}': row {row}: column '{column}' holds invalid count '{value}'")]
    InvalidCount {
        dataset: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("join '{step}': key '{key}' appears more than once in {side}")]
    DuplicateKey {
        step: String,
        side: String,
        key: String,
    },

    #[error("unsupported coordinate reference system: {0}")]
    UnknownCrs(String),

    #[error("dataset '{0}' declares no coordinate reference system; set `crs` in the config")]
    MissingCrs(String),

    #[error("{0} is empty")]
    EmptyTable(String),

    #[error("metric '{0}' has no defined values")]
    NoValues(String),
}
