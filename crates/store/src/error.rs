/// Errors raised by catalog persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
