use thiserror::Error;

#[derive(Error, Debug)]
pub enum FnirsError {
    #[error("Malformed file name '{0}': expected YYYYMMDD_TREATMENT_ID.<ext>")]
    MalformedFileName(String),

    #[error("Invalid recording '{path}': {reason}")]
    InvalidRecording { path: String, reason: String },

    #[error("Invalid channel mapping: {0}")]
    InvalidMapping(String),

    #[error("No recordings were processed ({attempted} input file(s) attempted)")]
    NoRecordingsProcessed { attempted: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Heatmap rendering failed: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, FnirsError>;
