use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template {0} cannot be empty")]
    MissingField(&'static str),

    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
