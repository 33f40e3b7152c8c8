//! In-memory [`CmsClient`] for tests and offline runs.
//!
//! Documents live in `Vec`s behind `std::sync::RwLock`. Person ids are
//! random UUIDs. Every create attempt and every project update is recorded
//! so callers can assert on what would have been sent to a real CMS.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{NewPerson, PersonRecord, ProjectDocument, ProjectUpdate};

use super::{CmsClient, CmsError};

pub struct MemoryCms {
    persons: RwLock<Vec<PersonRecord>>,
    projects: RwLock<Vec<ProjectDocument>>,
    taken_uids: RwLock<HashSet<String>>,
    create_attempts: RwLock<Vec<NewPerson>>,
    updates: RwLock<Vec<(String, ProjectUpdate)>>,
    writable: bool,
}

impl MemoryCms {
    pub fn new() -> Self {
        Self {
            persons: RwLock::new(Vec::new()),
            projects: RwLock::new(Vec::new()),
            taken_uids: RwLock::new(HashSet::new()),
            create_attempts: RwLock::new(Vec::new()),
            updates: RwLock::new(Vec::new()),
            writable: true,
        }
    }

    pub fn with_persons(self, persons: Vec<PersonRecord>) -> Self {
        self.persons.write().unwrap().extend(persons);
        self
    }

    pub fn with_project(self, project: ProjectDocument) -> Self {
        self.projects.write().unwrap().push(project);
        self
    }

    /// Mark a uid as used by some document outside the person directory.
    pub fn with_taken_uid(self, uid: &str) -> Self {
        self.taken_uids.write().unwrap().insert(uid.to_string());
        self
    }

    /// Behave like a CMS reached without a write token.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn persons(&self) -> Vec<PersonRecord> {
        self.persons.read().unwrap().clone()
    }

    pub fn project(&self, uid: &str) -> Option<ProjectDocument> {
        self.projects
            .read()
            .unwrap()
            .iter()
            .find(|p| p.uid == uid)
            .cloned()
    }

    /// Every `create_person` call, including ones rejected for conflicts.
    pub fn create_attempts(&self) -> Vec<NewPerson> {
        self.create_attempts.read().unwrap().clone()
    }

    /// Every successful `update_project` call as `(id, payload)`.
    pub fn updates(&self) -> Vec<(String, ProjectUpdate)> {
        self.updates.read().unwrap().clone()
    }
}

impl Default for MemoryCms {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CmsClient for MemoryCms {
    async fn get_all_persons(&self) -> Result<Vec<PersonRecord>, CmsError> {
        Ok(self.persons())
    }

    async fn get_project(&self, uid: &str) -> Result<ProjectDocument, CmsError> {
        self.project(uid)
            .ok_or_else(|| CmsError::NotFound(format!("project \"{}\"", uid)))
    }

    async fn create_person(&self, person: &NewPerson) -> Result<PersonRecord, CmsError> {
        if !self.writable {
            return Err(CmsError::ReadOnly);
        }
        self.create_attempts.write().unwrap().push(person.clone());

        let mut persons = self.persons.write().unwrap();
        let taken = self.taken_uids.read().unwrap().contains(&person.uid)
            || persons.iter().any(|p| p.uid == person.uid);
        if taken {
            return Err(CmsError::Conflict(person.uid.clone()));
        }

        let record = PersonRecord {
            id: Uuid::new_v4().simple().to_string(),
            uid: person.uid.clone(),
            name: person.name.clone(),
            url: person.url.clone(),
        };
        persons.push(record.clone());
        Ok(record)
    }

    async fn update_project(
        &self,
        id: &str,
        update: &ProjectUpdate,
    ) -> Result<ProjectDocument, CmsError> {
        if !self.writable {
            return Err(CmsError::ReadOnly);
        }
        let mut projects = self.projects.write().unwrap();
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CmsError::NotFound(format!("document {}", id)))?;
        project.data = update.data.clone();
        let updated = project.clone();

        self.updates
            .write()
            .unwrap()
            .push((id.to_string(), update.clone()));
        Ok(updated)
    }

    fn can_write(&self) -> bool {
        self.writable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_person(uid: &str) -> NewPerson {
        NewPerson {
            uid: uid.into(),
            lang: "en-us".into(),
            name: "Jane Doe".into(),
            url: None,
        }
    }

    #[tokio::test]
    async fn test_create_conflicts_on_taken_uid() {
        let cms = MemoryCms::new().with_taken_uid("jane-doe");
        let err = cms.create_person(&new_person("jane-doe")).await.unwrap_err();
        assert!(matches!(err, CmsError::Conflict(_)));

        let ok = cms.create_person(&new_person("jane-doe-2")).await.unwrap();
        assert_eq!(ok.uid, "jane-doe-2");

        let again = cms.create_person(&new_person("jane-doe-2")).await;
        assert!(matches!(again, Err(CmsError::Conflict(_))));
        assert_eq!(cms.create_attempts().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_project() {
        let cms = MemoryCms::new();
        let err = cms.get_project("nope").await.unwrap_err();
        assert!(matches!(err, CmsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let cms = MemoryCms::new().read_only();
        assert!(!cms.can_write());
        let err = cms.create_person(&new_person("x")).await.unwrap_err();
        assert!(matches!(err, CmsError::ReadOnly));
    }
}
