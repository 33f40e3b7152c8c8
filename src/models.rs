//! Core data models used throughout the credits importer.
//!
//! Mentions and rows are produced by the parser and live for a single run.
//! Person records, credit entries, and project documents mirror what the
//! CMS stores and are round-tripped through JSON without losing fields the
//! importer does not understand.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Label used for rows where no role label could be inferred.
pub const DEFAULT_LABEL: &str = "Credits";

/// One named contributor extracted from a credits line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMention {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CreditMention {
    pub fn new(name: impl Into<String>, url: Option<String>) -> Self {
        Self {
            name: name.into(),
            url,
        }
    }

    /// Uniqueness key within a line or a flattened batch.
    ///
    /// Mentions carrying a URL are keyed by the lowercased URL alone, so two
    /// anchors to the same profile collapse regardless of their link text.
    /// Mentions without a URL are keyed by `"|" + lowercased name`.
    pub fn dedup_key(&self) -> String {
        match self.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => url.to_lowercase(),
            None => format!("|{}", self.name.trim().to_lowercase()),
        }
    }
}

/// One parsed credits line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRow {
    pub label: String,
    pub people: Vec<CreditMention>,
}

/// Intermediate JSON format written by `--gen-json` and accepted as input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default)]
    pub rows: Vec<CreditRow>,
}

/// A directory entry as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: String,
    pub uid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Payload for creating a person document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub uid: String,
    pub lang: String,
    pub name: String,
    pub url: Option<String>,
}

/// Link from a credits row to a person document.
///
/// Kept as the JSON the CMS returned. Existing links may carry extra fields
/// (`type`, `slug`, `isBroken`, ...) or use the legacy `documentId` key, and
/// are written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonLink(Value);

impl PersonLink {
    pub fn document(id: impl Into<String>, doc_type: &str) -> Self {
        let mut link = Map::new();
        link.insert("link_type".to_string(), Value::String("Document".to_string()));
        link.insert("id".to_string(), Value::String(id.into()));
        if !doc_type.is_empty() {
            link.insert("type".to_string(), Value::String(doc_type.to_string()));
        }
        Self(Value::Object(link))
    }

    /// Document id this link points at, falling back to `documentId`.
    pub fn target_id(&self) -> Option<&str> {
        ["id", "documentId"]
            .iter()
            .filter_map(|key| self.get(key).and_then(Value::as_str))
            .find(|id| !id.is_empty())
    }

    pub fn link_type(&self) -> Option<&str> {
        self.get("link_type").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// One row of a project's credits group field.
///
/// `label` and `person` are decoded views of the stored row. A `null` or
/// missing `person` reads as empty. On write the stored row is emitted as
/// it came in; `person` is replaced only when the links changed, and `label`
/// only when it was set to something new.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditEntry {
    pub label: Option<String>,
    pub person: Vec<PersonLink>,
    source: Map<String, Value>,
}

impl CreditEntry {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let mut source = Map::new();
        source.insert("label".to_string(), Value::String(label.clone()));
        source.insert("person".to_string(), Value::Array(Vec::new()));
        Self {
            label: Some(label),
            person: Vec::new(),
            source,
        }
    }

    /// A stored field, as read from the CMS.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.source.get(key)
    }

    fn stored_label(source: &Map<String, Value>) -> Option<String> {
        source.get("label").and_then(Value::as_str).map(str::to_string)
    }

    fn stored_people(source: &Map<String, Value>) -> Vec<PersonLink> {
        match source.get("person") {
            Some(Value::Array(items)) => items.iter().cloned().map(PersonLink).collect(),
            _ => Vec::new(),
        }
    }
}

impl<'de> Deserialize<'de> for CreditEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = Map::deserialize(deserializer)?;
        Ok(Self {
            label: Self::stored_label(&source),
            person: Self::stored_people(&source),
            source,
        })
    }
}

impl Serialize for CreditEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut row = self.source.clone();
        match &self.label {
            Some(label) if self.label != Self::stored_label(&self.source) => {
                row.insert("label".to_string(), Value::String(label.clone()));
            }
            _ => {}
        }
        if self.person != Self::stored_people(&self.source) {
            let links = self.person.iter().map(|p| p.0.clone()).collect();
            row.insert("person".to_string(), Value::Array(links));
        }
        row.serialize(serializer)
    }
}

/// The credits structure of a project, in display order.
pub type CreditsDocument = Vec<CreditEntry>;

/// A project document as returned by the CMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub id: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ProjectDocument {
    /// Decode the `credits` field. A missing or `null` field is empty.
    pub fn credits(&self) -> Result<CreditsDocument, serde_json::Error> {
        match self.data.get("credits") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()),
        }
    }

    /// Copy of `data` with the `credits` field replaced.
    pub fn data_with_credits(
        &self,
        credits: &CreditsDocument,
    ) -> Result<Map<String, Value>, serde_json::Error> {
        let mut data = self.data.clone();
        data.insert("credits".to_string(), serde_json::to_value(credits)?);
        Ok(data)
    }
}

/// Update payload for a project document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectUpdate {
    pub lang: String,
    pub data: Map<String, Value>,
}
