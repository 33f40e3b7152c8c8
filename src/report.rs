//! Per-input run reports.
//!
//! The `import` command prints one JSON document:
//!
//! ```json
//! { "results": [ { "file": "...", "project": "the-final", "mode": "dry-run", ... } ] }
//! ```
//!
//! `mode` is one of `dry-run`, `applied`, `generated-json`, or `error`, and
//! selects which other fields are present.

use serde::Serialize;

use crate::error::ImportError;
use crate::models::{CreditMention, CreditRow, CreditsDocument, PersonRecord};
use crate::resolve::{MatchKind, Resolution};

/// Envelope printed to stdout.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResults {
    pub results: Vec<RunReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub project: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl RunReport {
    pub fn error(file: Option<String>, project: String, err: &ImportError) -> Self {
        Self {
            file,
            project,
            outcome: Outcome::Error(ErrorReport {
                error_kind: err.kind().to_string(),
                error: err.to_string(),
            }),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self.outcome {
            Outcome::DryRun(_) => "dry-run",
            Outcome::Applied(_) => "applied",
            Outcome::GeneratedJson(_) => "generated-json",
            Outcome::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Outcome {
    DryRun(DryRunReport),
    Applied(AppliedReport),
    GeneratedJson(GeneratedReport),
    Error(ErrorReport),
}

/// The project document a report refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRef {
    pub id: String,
    pub uid: String,
}

/// A mention that matched an existing (or just created) person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedMention {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub id: String,
    pub uid: String,
    pub matched_by: MatchKind,
}

impl LinkedMention {
    pub fn new(mention: &CreditMention, resolution: &Resolution<'_>) -> Self {
        Self {
            name: mention.name.clone(),
            url: mention.url.clone(),
            id: resolution.person.id.clone(),
            uid: resolution.person.uid.clone(),
            matched_by: resolution.matched_by,
        }
    }
}

/// A mention whose person document could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedMention {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunReport {
    pub document: ProjectRef,
    pub parsed: Vec<CreditRow>,
    pub will_create: Vec<CreditMention>,
    pub will_link: Vec<LinkedMention>,
    pub merged_credits_preview: CreditsDocument,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedReport {
    pub document: ProjectRef,
    pub linked: Vec<LinkedMention>,
    pub created_people: Vec<PersonRecord>,
    pub failed_to_create: Vec<FailedMention>,
    pub unresolved: Vec<CreditMention>,
    pub credits_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    pub out: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error_kind: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_tag_is_flattened() {
        let report = RunReport {
            file: Some("credits/the-final.html".into()),
            project: "the-final".into(),
            outcome: Outcome::GeneratedJson(GeneratedReport {
                out: "credits/the-final.json".into(),
                rows: 3,
            }),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "file": "credits/the-final.html",
                "project": "the-final",
                "mode": "generated-json",
                "out": "credits/the-final.json",
                "rows": 3
            })
        );
        assert_eq!(report.mode(), "generated-json");
    }

    #[test]
    fn test_error_report() {
        let err = ImportError::ProjectNotFound("ghost".into());
        let report = RunReport::error(None, "ghost".into(), &err);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["mode"], "error");
        assert_eq!(value["errorKind"], "not-found");
        assert!(value.get("file").is_none());
    }

    #[test]
    fn test_dry_run_field_names() {
        let report = RunReport {
            file: None,
            project: "p".into(),
            outcome: Outcome::DryRun(DryRunReport {
                document: ProjectRef {
                    id: "ID".into(),
                    uid: "p".into(),
                },
                parsed: vec![],
                will_create: vec![CreditMention::new("Unknown Person", None)],
                will_link: vec![],
                merged_credits_preview: vec![],
            }),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["mode"], "dry-run");
        assert_eq!(value["willCreate"][0]["name"], "Unknown Person");
        assert!(value["willLink"].as_array().unwrap().is_empty());
        assert!(value.get("mergedCreditsPreview").is_some());
    }
}
