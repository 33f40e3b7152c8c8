//! Person resolution and creation.
//!
//! A [`CreditMention`] is matched against the [`DirectoryIndex`] in tiers,
//! first hit wins:
//!
//! 1. **url**: the mention's normalized profile URL
//! 2. **override**: the manual misspelling table maps the name to another
//! 3. **name**: exact, case-insensitive name
//! 4. **substring**: first directory name containing the mention's name,
//!    or contained in it, in directory listing order
//!
//! The substring tier depends on the order the CMS lists people in, which
//! is not guaranteed to be stable between runs.
//!
//! Mentions that match nothing can be turned into new person documents with
//! [`create_person`], which derives a uid from the name and walks a bounded
//! set of `-2`, `-3`, ... suffixes on conflicts.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cms::{CmsClient, CmsError};
use crate::config::{CreateConfig, ResolverConfig};
use crate::directory::{name_key, DirectoryIndex};
use crate::error::ImportError;
use crate::models::{CreditMention, NewPerson, PersonRecord};
use crate::parse::slugify;

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Url,
    Override,
    Name,
    Substring,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchKind::Url => "url",
            MatchKind::Override => "override",
            MatchKind::Name => "name",
            MatchKind::Substring => "substring",
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub person: &'a PersonRecord,
    pub matched_by: MatchKind,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    overrides: HashMap<String, String>,
    substring_match: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
            substring_match: true,
        }
    }
}

impl Resolver {
    /// Build a resolver from a misspelling table (`written name -> directory name`).
    pub fn new<I, K, V>(overrides: I, substring_match: bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            overrides: overrides
                .into_iter()
                .map(|(k, v)| (name_key(k.as_ref()), v.into()))
                .collect(),
            substring_match,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.overrides.iter(), config.substring_match)
    }

    pub fn resolve<'a>(
        &self,
        mention: &CreditMention,
        index: &'a DirectoryIndex,
    ) -> Option<Resolution<'a>> {
        let hit = |person: &'a PersonRecord, matched_by| Some(Resolution { person, matched_by });

        if let Some(person) = mention.url.as_deref().and_then(|u| index.by_url(u)) {
            return hit(person, MatchKind::Url);
        }

        if let Some(alternate) = self.overrides.get(&name_key(&mention.name)) {
            if let Some(person) = index.by_name(alternate) {
                return hit(person, MatchKind::Override);
            }
        }

        if let Some(person) = index.by_name(&mention.name) {
            return hit(person, MatchKind::Name);
        }

        if self.substring_match {
            if let Some(person) = substring_match(&mention.name, index) {
                return hit(person, MatchKind::Substring);
            }
        }

        None
    }
}

fn substring_match<'a>(name: &str, index: &'a DirectoryIndex) -> Option<&'a PersonRecord> {
    let needle = name_key(name);
    if needle.is_empty() {
        return None;
    }
    index.people().iter().find(|p| {
        let candidate = name_key(&p.name);
        !candidate.is_empty() && (candidate.contains(&needle) || needle.contains(&candidate))
    })
}

/// Bounded uid-suffix retry for person creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidRetryPolicy {
    pub max_attempts: u32,
}

impl Default for UidRetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

impl UidRetryPolicy {
    pub fn from_config(config: &CreateConfig) -> Self {
        Self {
            max_attempts: config.max_uid_attempts.max(1),
        }
    }

    /// Uid to try on a 1-based attempt: `base`, `base-2`, `base-3`, ...
    pub fn candidate(&self, base: &str, attempt: u32) -> String {
        if attempt <= 1 {
            base.to_string()
        } else {
            format!("{}-{}", base, attempt)
        }
    }
}

/// Slug a new person document starts from.
///
/// Uses the name, or the last path segment of the profile URL when the name
/// is blank, and falls back to `person`.
pub fn base_uid(mention: &CreditMention) -> String {
    let source = if mention.name.trim().is_empty() {
        mention
            .url
            .as_deref()
            .and_then(last_path_segment)
            .unwrap_or_default()
    } else {
        mention.name.clone()
    };

    let slug = slugify(&source);
    if slug.is_empty() {
        "person".to_string()
    } else {
        slug
    }
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

/// Create a person document for an unresolved mention.
pub async fn create_person(
    cms: &dyn CmsClient,
    mention: &CreditMention,
    lang: &str,
    policy: &UidRetryPolicy,
) -> Result<PersonRecord, ImportError> {
    let base = base_uid(mention);
    let mut uid = base.clone();

    for attempt in 1..=policy.max_attempts {
        uid = policy.candidate(&base, attempt);
        let request = NewPerson {
            uid: uid.clone(),
            lang: lang.to_string(),
            name: mention.name.trim().to_string(),
            url: mention.url.clone(),
        };

        match cms.create_person(&request).await {
            Ok(person) => {
                debug!(name = %person.name, uid = %person.uid, id = %person.id, "created person");
                return Ok(person);
            }
            Err(CmsError::Conflict(_)) => {
                warn!(%uid, attempt, "person uid already in use");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ImportError::CreationConflict {
        name: mention.name.clone(),
        attempts: policy.max_attempts,
        last_uid: uid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: &str, name: &str, url: Option<&str>) -> PersonRecord {
        PersonRecord {
            id: id.into(),
            uid: id.to_lowercase(),
            name: name.into(),
            url: url.map(str::to_string),
        }
    }

    fn mention(name: &str, url: Option<&str>) -> CreditMention {
        CreditMention::new(name, url.map(str::to_string))
    }

    #[test]
    fn test_url_match_beats_name_match() {
        let index = DirectoryIndex::new(vec![
            person("BYNAME", "Jane Doe", None),
            person("BYURL", "J. Doe", Some("https://instagram.com/jd")),
        ]);
        let hit = Resolver::default()
            .resolve(&mention("Jane Doe", Some("https://instagram.com/jd")), &index)
            .unwrap();
        assert_eq!(hit.person.id, "BYURL");
        assert_eq!(hit.matched_by, MatchKind::Url);
    }

    #[test]
    fn test_trailing_hash_matches_stored_url() {
        let index = DirectoryIndex::new(vec![person(
            "A",
            "Someone",
            Some("https://instagram.com/jd"),
        )]);
        let hit = Resolver::default()
            .resolve(&mention("jd", Some("https://instagram.com/jd#")), &index)
            .unwrap();
        assert_eq!(hit.person.id, "A");
    }

    #[test]
    fn test_override_table() {
        let index = DirectoryIndex::new(vec![person("S", "Santiago Carrasquila", None)]);
        let resolver = Resolver::new(
            [("santiago carrasquilla", "Santiago Carrasquila")],
            false,
        );
        let hit = resolver
            .resolve(&mention("Santiago Carrasquilla", None), &index)
            .unwrap();
        assert_eq!(hit.person.id, "S");
        assert_eq!(hit.matched_by, MatchKind::Override);
    }

    #[test]
    fn test_override_to_unknown_name_falls_through() {
        let index = DirectoryIndex::new(vec![person("J", "Jorge Velandia", None)]);
        let resolver = Resolver::new([("Jorge Velandia", "Jorge Valandia")], false);
        let hit = resolver
            .resolve(&mention("Jorge Velandia", None), &index)
            .unwrap();
        assert_eq!(hit.matched_by, MatchKind::Name);
    }

    #[test]
    fn test_substring_match_both_directions() {
        let index = DirectoryIndex::new(vec![
            person("F", "Fabian Palacios V", None),
            person("O", "Oro", None),
        ]);
        let resolver = Resolver::default();

        let hit = resolver.resolve(&mention("Fabian Palacios", None), &index).unwrap();
        assert_eq!((hit.person.id.as_str(), hit.matched_by), ("F", MatchKind::Substring));

        let hit = resolver.resolve(&mention("Oro Studio", None), &index).unwrap();
        assert_eq!(hit.person.id, "O");
    }

    #[test]
    fn test_substring_takes_first_in_listing_order() {
        let index = DirectoryIndex::new(vec![
            person("FIRST", "Ana Maria Lopez", None),
            person("SECOND", "Ana Maria", None),
        ]);
        let hit = Resolver::default()
            .resolve(&mention("Maria", None), &index)
            .unwrap();
        assert_eq!(hit.person.id, "FIRST");
    }

    #[test]
    fn test_substring_can_be_disabled() {
        let index = DirectoryIndex::new(vec![person("F", "Fabian Palacios V", None)]);
        let resolver = Resolver::new(Vec::<(String, String)>::new(), false);
        assert!(resolver.resolve(&mention("Fabian Palacios", None), &index).is_none());
    }

    #[test]
    fn test_unresolved_against_empty_directory() {
        let index = DirectoryIndex::new(vec![]);
        assert!(Resolver::default()
            .resolve(&mention("Unknown Person", None), &index)
            .is_none());
    }

    #[test]
    fn test_base_uid() {
        assert_eq!(base_uid(&mention("Jane Doe", None)), "jane-doe");
        assert_eq!(
            base_uid(&mention("  ", Some("https://instagram.com/jane.doe/"))),
            "jane-doe"
        );
        assert_eq!(base_uid(&mention("", None)), "person");
    }

    #[test]
    fn test_retry_candidates() {
        let policy = UidRetryPolicy::default();
        let uids: Vec<String> = (1..=policy.max_attempts)
            .map(|a| policy.candidate("jane-doe", a))
            .collect();
        assert_eq!(
            uids,
            vec!["jane-doe", "jane-doe-2", "jane-doe-3", "jane-doe-4", "jane-doe-5"]
        );
    }
}
