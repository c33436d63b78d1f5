use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error for key '{key}': {source}")]
    SerializeError {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
