use thiserror::Error;

/// Failures talking to a drawing backend or decoding its documents.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("backend I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("drawing document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backend rejected the request: {0}")]
    Backend(String),
    #[error("malformed drawing document: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot read settings: {0}")]
    Read(#[from] std::io::Error),
    #[error("cannot parse settings: {0}")]
    Parse(String),
    #[error("cannot write settings: {0}")]
    Write(String),
}
