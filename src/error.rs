use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration not found: {0}")]
    ConfigurationNotFound(String),
    #[error("producer for `{key}` failed: {message}")]
    ProducerFailure { key: String, message: String },
    #[error("report `{0}` is disabled")]
    AccessDenied(String),
    #[error("chart template not found: {0}")]
    TemplateNotFound(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub fn producer(key: &str, message: impl Into<String>) -> Self {
        ReportError::ProducerFailure {
            key: key.to_string(),
            message: message.into(),
        }
    }
}
