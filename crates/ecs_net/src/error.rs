use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed wire message: {0}")]
    Codec(#[from] serde_json::Error),
}
