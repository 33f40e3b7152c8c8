//! Error taxonomy for a single import input.
//!
//! Every variant is fatal for the input being processed and is recorded in
//! that input's report; the batch moves on to the next input. Mentions that
//! can't be resolved are not errors and show up as `willCreate` or
//! `unresolved` instead.

use thiserror::Error;

use crate::cms::CmsError;

#[derive(Debug, Error)]
pub enum ImportError {
    /// Missing or unreadable file, malformed JSON, or nothing to import.
    #[error("input error: {0}")]
    Input(String),

    #[error("project \"{0}\" not found")]
    ProjectNotFound(String),

    /// Every generated uid for a person was already taken.
    #[error(
        "could not create \"{name}\": uid conflict after {attempts} attempts \
         (last tried \"{last_uid}\")"
    )]
    CreationConflict {
        name: String,
        attempts: u32,
        last_uid: String,
    },

    #[error(transparent)]
    Cms(#[from] CmsError),
}

impl ImportError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Stable identifier used in `error` reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::ProjectNotFound(_) => "not-found",
            Self::CreationConflict { .. } => "conflict",
            Self::Cms(_) => "cms",
        }
    }
}
