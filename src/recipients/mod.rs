pub mod error;
pub mod handlers;
pub mod import;
pub mod merge;
pub mod types;

pub use error::{ImportError, RecipientError};
pub use import::parse_csv;
pub use merge::{MergeOutcome, merge_recipients};
pub use types::{ImportSummary, Recipient};

use crate::store::{RECIPIENTS_KEY, Store};
use chrono::Utc;
use tracing::info;

pub async fn list_recipients(store: &Store) -> Result<Vec<Recipient>, RecipientError> {
    Ok(store.load_or_init(RECIPIENTS_KEY, Vec::new()).await?)
}

/// Parses a CSV upload and merges it into the stored list.
///
/// A parse failure leaves the stored list untouched.
pub async fn import_csv(store: &Store, text: &str) -> Result<ImportSummary, RecipientError> {
    let batch = parse_csv(text, Utc::now())?;
    let processed = batch.len();

    let outcome = store
        .update(RECIPIENTS_KEY, Vec::new(), |existing: &mut Vec<Recipient>| {
            Ok::<_, RecipientError>(merge_recipients(existing, batch))
        })
        .await?;

    info!(
        "Imported recipients: {} processed, {} added, {} already present",
        processed, outcome.added, outcome.skipped
    );

    Ok(ImportSummary {
        processed,
        added: outcome.added,
        skipped: outcome.skipped,
    })
}

pub async fn add_recipient(
    store: &Store,
    email: &str,
    fields: Vec<(String, String)>,
) -> Result<Recipient, RecipientError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(RecipientError::EmptyEmail);
    }

    let mut recipient = Recipient::new(format!("manual-{}", uuid::Uuid::new_v4()), email);
    for (name, value) in fields {
        if !types::is_reserved_field(&name) {
            recipient.set_field(name, value);
        }
    }

    let added = recipient.clone();
    store
        .update(RECIPIENTS_KEY, Vec::new(), |existing: &mut Vec<Recipient>| {
            if existing.iter().any(|r| r.email == recipient.email) {
                return Err(RecipientError::Duplicate(recipient.email.clone()));
            }
            existing.push(recipient);
            Ok::<_, RecipientError>(())
        })
        .await?;

    info!("Added recipient {}", added.id);
    Ok(added)
}

pub async fn delete_recipient(store: &Store, id: &str) -> Result<Recipient, RecipientError> {
    let removed = store
        .update(RECIPIENTS_KEY, Vec::new(), |existing: &mut Vec<Recipient>| {
            let position = existing
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| RecipientError::NotFound(id.to_string()))?;
            Ok::<_, RecipientError>(existing.remove(position))
        })
        .await?;

    info!("Deleted recipient {}", removed.id);
    Ok(removed)
}

/// Column headings for tabular display: the first record's keys minus `id`.
pub fn display_columns(recipients: &[Recipient]) -> Vec<String> {
    match recipients.first() {
        Some(first) => first
            .keys()
            .filter(|key| *key != "id")
            .map(str::to_string)
            .collect(),
        None => vec!["email".to_string()],
    }
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
    async fn test_import_persists_batch() {
        let (_temp_dir, store) = setup_store().await;

        let summary = import_csv(&store, "email,firstName\na@x.com,Ann\nb@y.com,Bob")
            .await
            .unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                processed: 2,
                added: 2,
                skipped: 0
            }
        );

        let stored = list_recipients(&store).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].field("firstName"), Some("Bob"));
    }

    #[tokio::test]
    async fn test_reimport_leaves_size_unchanged() {
        let (_temp_dir, store) = setup_store().await;
        let csv = "email,firstName\na@x.com,Ann\nb@y.com,Bob";

        import_csv(&store, csv).await.unwrap();
        let summary = import_csv(&store, csv).await.unwrap();

        assert_eq!(summary.added, 0);
        assert_eq!(summary.skipped, 2);
        assert_eq!(list_recipients(&store).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_import_keeps_duplicates_within_one_batch() {
        let (_temp_dir, store) = setup_store().await;

        let summary = import_csv(&store, "email\ndup@x.com\ndup@x.com").await.unwrap();
        assert_eq!(summary.added, 2);
        assert_eq!(summary.skipped, 0);

        let stored = list_recipients(&store).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|r| r.email == "dup@x.com"));
        assert_ne!(stored[0].id, stored[1].id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_imports_and_lists_lose_nothing() {
        let (_temp_dir, store) = setup_store().await;
        let store = std::sync::Arc::new(store);

        let seed: String = (0..2000).map(|i| format!("\nseed{}@x.com", i)).collect();
        import_csv(&store, &format!("email{}", seed)).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..200 {
            let importer = store.clone();
            tasks.push(tokio::spawn(async move {
                import_csv(&importer, &format!("email\nnew{}@x.com", i))
                    .await
                    .unwrap();
            }));
            for _ in 0..4 {
                let reader = store.clone();
                tasks.push(tokio::spawn(async move {
                    let listed = list_recipients(&reader).await.unwrap();
                    assert!(listed.len() >= 2000);
                }));
            }
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(list_recipients(&store).await.unwrap().len(), 2200);
    }

    #[tokio::test]
    async fn test_failed_import_writes_nothing() {
        let (_temp_dir, store) = setup_store().await;
        import_csv(&store, "email\nfirst@x.com").await.unwrap();

        let err = import_csv(&store, "email,name\nok@x.com,Ok\n,Ann")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecipientError::Import(ImportError::MissingEmail { row: 3 })
        ));

        let stored = list_recipients(&store).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].email, "first@x.com");
    }

    #[tokio::test]
    async fn test_add_recipient_rejects_duplicate() {
        let (_temp_dir, store) = setup_store().await;

        let added = add_recipient(
            &store,
            " ann@example.com ",
            vec![("firstName".to_string(), "Ann".to_string())],
        )
        .await
        .unwrap();
        assert!(added.id.starts_with("manual-"));
        assert_eq!(added.email, "ann@example.com");

        let err = add_recipient(&store, "ann@example.com", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RecipientError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_add_recipient_requires_email() {
        let (_temp_dir, store) = setup_store().await;
        let err = add_recipient(&store, "  ", Vec::new()).await.unwrap_err();
        assert!(matches!(err, RecipientError::EmptyEmail));
    }

    #[tokio::test]
    async fn test_delete_recipient() {
        let (_temp_dir, store) = setup_store().await;
        import_csv(&store, "email\na@x.com\nb@x.com").await.unwrap();
        let stored = list_recipients(&store).await.unwrap();

        let removed = delete_recipient(&store, &stored[0].id).await.unwrap();
        assert_eq!(removed.email, "a@x.com");
        assert_eq!(list_recipients(&store).await.unwrap().len(), 1);

        let err = delete_recipient(&store, "missing").await.unwrap_err();
        assert!(matches!(err, RecipientError::NotFound(_)));
    }

    #[test]
    fn test_display_columns() {
        assert_eq!(display_columns(&[]), vec!["email".to_string()]);

        let recipients = vec![Recipient::new("1", "a@x.com").with_field("firstName", "Ann")];
        assert_eq!(
            display_columns(&recipients),
            vec!["email".to_string(), "firstName".to_string()]
        );
    }
}
