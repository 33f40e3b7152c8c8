//! Person directory index.
//!
//! Built once per run from the complete set of person records fetched from
//! the CMS. Lookups are by lowercased, trimmed name and by normalized
//! profile URL. When two records share a key the later one wins, matching
//! a plain map insert over the fetched collection.

use std::collections::HashMap;

use crate::models::PersonRecord;
use crate::parse::normalize_href;

/// Lookup key for a person name.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Lookup key for a profile URL; `None` when the URL is blank.
pub fn url_key(url: &str) -> Option<String> {
    let normalized = normalize_href(url);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[derive(Debug, Default, Clone)]
pub struct DirectoryIndex {
    people: Vec<PersonRecord>,
    by_name: HashMap<String, usize>,
    by_url: HashMap<String, usize>,
}

impl DirectoryIndex {
    pub fn new(people: Vec<PersonRecord>) -> Self {
        let mut index = Self::default();
        for person in people {
            index.register(person);
        }
        index
    }

    /// Add a record, typically one created during the current run.
    pub fn register(&mut self, person: PersonRecord) {
        let pos = self.people.len();
        let name = name_key(&person.name);
        if !name.is_empty() {
            self.by_name.insert(name, pos);
        }
        if let Some(url) = person.url.as_deref().and_then(url_key) {
            self.by_url.insert(url, pos);
        }
        self.people.push(person);
    }

    pub fn by_name(&self, name: &str) -> Option<&PersonRecord> {
        let key = name_key(name);
        if key.is_empty() {
            return None;
        }
        self.by_name.get(&key).map(|&i| &self.people[i])
    }

    pub fn by_url(&self, url: &str) -> Option<&PersonRecord> {
        let key = url_key(url)?;
        self.by_url.get(&key).map(|&i| &self.people[i])
    }

    /// All records in the order they were registered.
    pub fn people(&self) -> &[PersonRecord] {
        &self.people
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.people.iter().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}
