#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Parse failed with: {0}")]
    Parse(String),

    #[error("Extraction failed with: {0}")]
    Extraction(String),

    #[error("Analysis failed with: {0}")]
    Analysis(String),

    #[error("Persistence failed with: {0}")]
    Persistence(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid value: {0}")]
    Validation(String),
}
