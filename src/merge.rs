//! Credits merge engine.
//!
//! Folds newly resolved `label -> people` groups into a project's existing
//! credits without duplicating anyone. Labels match case-insensitively after
//! trimming; unknown labels are appended as new rows. A person link is added
//! only when its document id isn't already under that label, so merging the
//! same additions twice is a no-op. Rows no addition touches come back
//! unchanged, extra fields included.

use std::collections::HashSet;

use crate::models::{CreditEntry, PersonLink};

/// People to link under one label.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditAddition {
    pub label: String,
    pub person: Vec<PersonLink>,
}

fn label_key(label: Option<&str>) -> String {
    label.unwrap_or_default().trim().to_lowercase()
}

pub fn merge_credits(existing: &[CreditEntry], additions: &[CreditAddition]) -> Vec<CreditEntry> {
    let mut out: Vec<CreditEntry> = existing.to_vec();

    for add in additions {
        let key = label_key(Some(&add.label));
        let pos = match out
            .iter()
            .position(|e| label_key(e.label.as_deref()) == key)
        {
            Some(pos) => pos,
            None => {
                out.push(CreditEntry::new(add.label.clone()));
                out.len() - 1
            }
        };

        let target = &mut out[pos];
        let mut ids: HashSet<String> = target
            .person
            .iter()
            .filter_map(|p| p.target_id().map(str::to_string))
            .collect();

        for link in &add.person {
            let Some(id) = link.target_id() else {
                continue;
            };
            if ids.insert(id.to_string()) {
                target.person.push(link.clone());
            }
        }
    }

    out
}

/// Number of person links across all rows.
pub fn count_links(credits: &[CreditEntry]) -> usize {
    credits.iter().map(|e| e.person.len()).sum()
}
