use thiserror::Error;

#[derive(Error, Debug)]
pub enum DendroError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Column '{0}' not found in table header")]
    ColumnNotFound(String),

    #[error("Invalid edge {a}-{b}: {reason}")]
    InvalidEdge { a: String, b: String, reason: String },

    #[error("Conflicting values for pair {a}-{b}: {existing} vs {incoming}")]
    DuplicateConflict {
        a: String,
        b: String,
        existing: f64,
        incoming: f64,
    },

    #[error("Individual '{individual}' assigned to networks '{first}' and '{second}'")]
    NetworkConflict {
        individual: String,
        first: String,
        second: String,
    },

    #[error("Network '{network}' has insufficient data: {reason}")]
    InsufficientData { network: String, reason: String },

    #[error("Incomplete coverage: {0}")]
    IncompleteCoverage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DendroError>;
