use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImportError {
    #[error("CSV must contain an 'email' column.")]
    MissingEmailColumn,

    #[error("Row {row} is missing an email address.")]
    MissingEmail { row: usize },
}

#[derive(Error, Debug)]
pub enum RecipientError {
    #[error("CSV parsing error: {0}")]
    Import(#[from] ImportError),

    #[error("Recipient email cannot be empty")]
    EmptyEmail,

    #[error("Recipient with email '{0}' already exists")]
    Duplicate(String),

    #[error("Recipient not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
