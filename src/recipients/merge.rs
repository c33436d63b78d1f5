use super::types::Recipient;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub skipped: usize,
}

/// Appends the batch records whose email is not already in `existing`.
///
/// Existing records are never replaced. The batch is only checked against
/// the records present before the merge, so repeated emails inside one
/// batch are all kept.
pub fn merge_recipients(existing: &mut Vec<Recipient>, batch: Vec<Recipient>) -> MergeOutcome {
    let known: HashSet<String> = existing.iter().map(|r| r.email.clone()).collect();
    let before = existing.len();
    let total = batch.len();

    existing.extend(
        batch
            .into_iter()
            .filter(|recipient| !known.contains(&recipient.email)),
    );

    let added = existing.len() - before;
    MergeOutcome {
        added,
        skipped: total - added,
    }
}
