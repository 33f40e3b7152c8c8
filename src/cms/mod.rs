//! CMS collaborator boundary.
//!
//! The importer never talks HTTP directly. Everything it needs from the CMS
//! goes through [`CmsClient`]: fetch the person directory, fetch a project,
//! create a person, and write a project back.
//!
//! # Implementations
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`http::PrismicClient`] | Read API + migration API over `reqwest` |
//! | [`memory::MemoryCms`] | In-process documents for tests and offline runs |

pub mod http;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewPerson, PersonRecord, ProjectDocument, ProjectUpdate};

/// Failure reported by a [`CmsClient`].
#[derive(Debug, Error)]
pub enum CmsError {
    /// The requested document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The uid is already taken by another document.
    #[error("uid already in use: {0}")]
    Conflict(String),

    /// Non-success HTTP status not covered by the variants above.
    #[error("CMS returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network or TLS failure.
    #[error("CMS request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response could not be interpreted.
    #[error("unexpected CMS response: {0}")]
    Decode(String),

    /// A write was attempted without write credentials.
    #[error("no write token configured")]
    ReadOnly,
}

/// Access to the documents the importer reads and writes.
///
/// Calls are awaited one at a time by the importer; implementations don't
/// need to handle concurrent person creation.
#[async_trait]
pub trait CmsClient: Send + Sync {
    /// Every person document, unpaginated, in the CMS's listing order.
    async fn get_all_persons(&self) -> Result<Vec<PersonRecord>, CmsError>;

    /// Look up a project by its uid. Fails with [`CmsError::NotFound`].
    async fn get_project(&self, uid: &str) -> Result<ProjectDocument, CmsError>;

    /// Create a person. Fails with [`CmsError::Conflict`] when the uid is taken.
    async fn create_person(&self, person: &NewPerson) -> Result<PersonRecord, CmsError>;

    /// Replace a project's data in a single request.
    async fn update_project(
        &self,
        id: &str,
        update: &ProjectUpdate,
    ) -> Result<ProjectDocument, CmsError>;

    /// Whether writes can succeed. Importers degrade to dry-run otherwise.
    fn can_write(&self) -> bool {
        true
    }
}
