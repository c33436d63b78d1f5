pub mod error;
pub mod handlers;
pub mod personalize;
pub mod types;

pub use error::TemplateError;
pub use personalize::{Preview, personalize, preview};
pub use types::{EmailTemplate, TemplateDraft};

use crate::store::{Store, TEMPLATES_KEY};
use chrono::Utc;
use tracing::info;

pub async fn list_templates(store: &Store) -> Result<Vec<EmailTemplate>, TemplateError> {
    Ok(store.load_or_init(TEMPLATES_KEY, Vec::new()).await?)
}

pub async fn get_template(store: &Store, id: &str) -> Result<EmailTemplate, TemplateError> {
    list_templates(store)
        .await?
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| TemplateError::NotFound(id.to_string()))
}

pub async fn create_template(
    store: &Store,
    draft: TemplateDraft,
) -> Result<EmailTemplate, TemplateError> {
    draft.validate()?;

    let now = Utc::now();
    let created = store
        .update(TEMPLATES_KEY, Vec::new(), |templates: &mut Vec<EmailTemplate>| {
            // Ids are millisecond stamps; step past any taken one
            let mut stamp = now.timestamp_millis();
            while templates.iter().any(|t| t.id == format!("template-{}", stamp)) {
                stamp += 1;
            }

            let template = EmailTemplate {
                id: format!("template-{}", stamp),
                name: draft.name,
                subject: draft.subject,
                body: draft.body,
                created_at: now,
            };
            templates.push(template.clone());
            Ok::<_, TemplateError>(template)
        })
        .await?;

    info!("Template \"{}\" created ({})", created.name, created.id);
    Ok(created)
}

/// Replaces the editable fields, keeping `id` and `created_at`.
pub async fn update_template(
    store: &Store,
    id: &str,
    draft: TemplateDraft,
) -> Result<EmailTemplate, TemplateError> {
    draft.validate()?;

    let updated = store
        .update(TEMPLATES_KEY, Vec::new(), |templates: &mut Vec<EmailTemplate>| {
            let template = templates
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
            template.name = draft.name;
            template.subject = draft.subject;
            template.body = draft.body;
            Ok::<_, TemplateError>(template.clone())
        })
        .await?;

    info!("Template \"{}\" updated ({})", updated.name, updated.id);
    Ok(updated)
}

pub async fn delete_template(store: &Store, id: &str) -> Result<EmailTemplate, TemplateError> {
    let removed = store
        .update(TEMPLATES_KEY, Vec::new(), |templates: &mut Vec<EmailTemplate>| {
            let position = templates
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
            Ok::<_, TemplateError>(templates.remove(position))
        })
        .await?;

    info!("Template \"{}\" deleted", removed.name);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_store() -> (TempDir, Store) {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(temp_dir.path()).await.unwrap();
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (_temp_dir, store) = setup_store().await;

        let created = create_template(
            &store,
            TemplateDraft::new("Welcome", "Hi {{firstName}}", "Thanks for joining"),
        )
        .await
        .unwrap();
        assert!(created.id.starts_with("template-"));

        let templates = list_templates(&store).await.unwrap();
        assert_eq!(templates, vec![created]);
    }

    #[tokio::test]
    async fn test_back_to_back_creates_get_distinct_ids() {
        let (_temp_dir, store) = setup_store().await;

        let first = create_template(&store, TemplateDraft::new("A", "S", "B"))
            .await
            .unwrap();
        let second = create_template(&store, TemplateDraft::new("C", "S", "B"))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_create_rejects_incomplete_draft() {
        let (_temp_dir, store) = setup_store().await;

        let err = create_template(&store, TemplateDraft::new("Welcome", "", "Body"))
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateError::MissingField("subject")));
        assert!(list_templates(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_created_at() {
        let (_temp_dir, store) = setup_store().await;
        let created = create_template(&store, TemplateDraft::new("A", "S", "B"))
            .await
            .unwrap();

        let updated = update_template(&store, &created.id, TemplateDraft::new("A2", "S2", "B2"))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.name, "A2");
        assert_eq!(get_template(&store, &created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let (_temp_dir, store) = setup_store().await;

        let err = update_template(&store, "nope", TemplateDraft::new("A", "S", "B"))
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));

        let err = delete_template(&store, "nope").await.unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_temp_dir, store) = setup_store().await;
        let created = create_template(&store, TemplateDraft::new("A", "S", "B"))
            .await
            .unwrap();

        delete_template(&store, &created.id).await.unwrap();
        assert!(list_templates(&store).await.unwrap().is_empty());
    }
}
