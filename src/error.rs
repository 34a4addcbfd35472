use thiserror::Error;

/// Input that cannot be interpreted at all. Missing dates or weights inside
/// otherwise valid input are not errors; they surface as `None`.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("grade items must be a JSON array, got {0}")]
    NotAnArray(&'static str),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("syllabus text is not valid UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
    #[error("target grade must be between 0 and 100, got {0}")]
    InvalidTarget(f64),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}
