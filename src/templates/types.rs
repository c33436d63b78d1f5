use super::error::TemplateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// User-editable part of a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

impl TemplateDraft {
    pub fn new(
        name: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::MissingField("name"));
        }
        if self.subject.trim().is_empty() {
            return Err(TemplateError::MissingField("subject"));
        }
        if self.body.trim().is_empty() {
            return Err(TemplateError::MissingField("body"));
        }
        Ok(())
    }
}
