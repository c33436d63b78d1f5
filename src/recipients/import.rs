//! Comma-separated recipient import.
//!
//! Splitting is deliberately naive: no quoting, escaped commas or embedded
//! newlines. The first line is the header row and must contain `email`.

use super::error::ImportError;
use super::types::{Recipient, is_reserved_field};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Parses `text` into a batch of recipients, all-or-nothing.
///
/// Ids are `csv-<imported_at millis>-<row ordinal>`.
pub fn parse_csv(text: &str, imported_at: DateTime<Utc>) -> Result<Vec<Recipient>, ImportError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut lines = text.split('\n');
    let headers: Vec<&str> = match lines.next() {
        Some(header_line) => header_line.split(',').map(str::trim).collect(),
        None => return Ok(Vec::new()),
    };

    let email_index = headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case("email"))
        .ok_or(ImportError::MissingEmailColumn)?;

    let batch_stamp = imported_at.timestamp_millis();

    let recipients = lines
        .enumerate()
        .map(|(index, line)| parse_row(&headers, email_index, line, index, batch_stamp))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Parsed {} recipients from CSV", recipients.len());
    Ok(recipients)
}

fn parse_row(
    headers: &[&str],
    email_index: usize,
    line: &str,
    index: usize,
    batch_stamp: i64,
) -> Result<Recipient, ImportError> {
    let values: Vec<&str> = line.split(',').map(str::trim).collect();

    let email = values.get(email_index).copied().unwrap_or_default();
    if email.is_empty() {
        // +1 for the header line, +1 for 1-based numbering
        return Err(ImportError::MissingEmail { row: index + 2 });
    }

    let mut recipient = Recipient::new(format!("csv-{}-{}", batch_stamp, index), email);
    for (column, header) in headers.iter().enumerate() {
        if header.is_empty() || is_reserved_field(header) {
            continue;
        }
        // Short rows leave trailing columns unset
        if let Some(value) = values.get(column) {
            recipient.set_field(*header, *value);
        }
    }

    Ok(recipient)
}
