//! Prismic-compatible HTTP client.
//!
//! Reads go to the content API (`{api_endpoint}/documents/search`) against
//! the master ref; writes go to the migration API
//! (`{migration_endpoint}/documents`) with a bearer write token and the
//! `repository` header.
//!
//! No retry or backoff happens here: a failed request surfaces as a
//! [`CmsError`] and the request timeout comes from `cms.timeout_secs`.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::CmsConfig;
use crate::models::{NewPerson, PersonRecord, ProjectDocument, ProjectUpdate};

use super::{CmsClient, CmsError};

static UID_TAKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)uid.*already.*used|conflict").expect("valid regex"));

pub struct PrismicClient {
    client: reqwest::Client,
    repository: String,
    api_endpoint: String,
    migration_endpoint: String,
    person_type: String,
    project_type: String,
    page_size: u32,
    access_token: Option<String>,
    write_token: Option<String>,
}

impl PrismicClient {
    /// Build a client from configuration and explicitly supplied tokens.
    pub fn new(
        config: &CmsConfig,
        access_token: Option<String>,
        write_token: Option<String>,
    ) -> Result<Self, CmsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            repository: config.repository.clone(),
            api_endpoint: config.api_endpoint(),
            migration_endpoint: config.migration_endpoint.trim_end_matches('/').to_string(),
            person_type: config.person_type.clone(),
            project_type: config.project_type.clone(),
            page_size: config.page_size,
            access_token,
            write_token,
        })
    }

    /// Build a client reading both tokens from the environment variables
    /// named in the config.
    pub fn from_env(config: &CmsConfig) -> Result<Self, CmsError> {
        Self::new(config, config.access_token(), config.write_token())
    }

    async fn master_ref(&self) -> Result<String, CmsError> {
        let mut req = self.client.get(&self.api_endpoint);
        if let Some(token) = &self.access_token {
            req = req.query(&[("access_token", token)]);
        }
        let body = read_json(req.send().await?).await?;
        master_ref(&body)
            .ok_or_else(|| CmsError::Decode("repository response has no master ref".into()))
    }

    async fn search_page(
        &self,
        reference: &str,
        predicate: &str,
        page: u32,
    ) -> Result<Value, CmsError> {
        let url = format!("{}/documents/search", self.api_endpoint);
        let page_size = self.page_size.to_string();
        let page = page.to_string();
        let mut query = vec![
            ("ref", reference),
            ("q", predicate),
            ("pageSize", page_size.as_str()),
            ("page", page.as_str()),
        ];
        if let Some(token) = &self.access_token {
            query.push(("access_token", token.as_str()));
        }
        read_json(self.client.get(&url).query(&query).send().await?).await
    }

    fn write_token(&self) -> Result<&str, CmsError> {
        self.write_token.as_deref().ok_or(CmsError::ReadOnly)
    }

    fn migration_request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, CmsError> {
        let token = self.write_token()?;
        Ok(self
            .client
            .request(method, format!("{}{}", self.migration_endpoint, path))
            .header("Authorization", format!("Bearer {}", token))
            .header("repository", &self.repository))
    }
}

#[async_trait]
impl CmsClient for PrismicClient {
    async fn get_all_persons(&self) -> Result<Vec<PersonRecord>, CmsError> {
        let reference = self.master_ref().await?;
        let predicate = format!("[[at(document.type,\"{}\")]]", self.person_type);

        let mut persons = Vec::new();
        let mut page = 1;
        loop {
            let body = self.search_page(&reference, &predicate, page).await?;
            let results = body
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| CmsError::Decode("search response has no results".into()))?;
            persons.extend(results.iter().filter_map(person_from_document));

            let total_pages = body.get("total_pages").and_then(Value::as_u64).unwrap_or(1);
            if u64::from(page) >= total_pages || results.is_empty() {
                break;
            }
            page += 1;
        }

        debug!(count = persons.len(), "fetched person directory");
        Ok(persons)
    }

    async fn get_project(&self, uid: &str) -> Result<ProjectDocument, CmsError> {
        let predicate = project_predicate(&self.project_type, uid)?;
        let reference = self.master_ref().await?;
        let body = self.search_page(&reference, &predicate, 1).await?;

        let doc = body
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .ok_or_else(|| CmsError::NotFound(format!("project \"{}\"", uid)))?;
        serde_json::from_value(doc.clone()).map_err(|e| CmsError::Decode(e.to_string()))
    }

    async fn create_person(&self, person: &NewPerson) -> Result<PersonRecord, CmsError> {
        let body = person_payload(person, &self.person_type);
        let resp = self
            .migration_request(reqwest::Method::POST, "/documents")?
            .json(&body)
            .send()
            .await?;
        let created = read_json(resp).await?;

        let id = created
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| CmsError::Decode("create response has no id".into()))?;
        Ok(PersonRecord {
            id: id.to_string(),
            uid: created
                .get("uid")
                .and_then(Value::as_str)
                .unwrap_or(&person.uid)
                .to_string(),
            name: person.name.clone(),
            url: person.url.clone(),
        })
    }

    async fn update_project(
        &self,
        id: &str,
        update: &ProjectUpdate,
    ) -> Result<ProjectDocument, CmsError> {
        let resp = self
            .migration_request(reqwest::Method::PUT, &format!("/documents/{}", id))?
            .json(update)
            .send()
            .await?;
        let body = read_json(resp).await?;

        let data = match body.get("data") {
            Some(Value::Object(map)) => map.clone(),
            _ => update.data.clone(),
        };
        Ok(ProjectDocument {
            id: id.to_string(),
            uid: body
                .get("uid")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            data,
        })
    }

    fn can_write(&self) -> bool {
        self.write_token.is_some()
    }
}

async fn read_json(resp: reqwest::Response) -> Result<Value, CmsError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json()
            .await
            .map_err(|e| CmsError::Decode(e.to_string()));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify_error(status.as_u16(), body))
}

/// Map a non-success response to a [`CmsError`].
pub fn classify_error(status: u16, body: String) -> CmsError {
    match status {
        404 => CmsError::NotFound(body),
        409 => CmsError::Conflict(body),
        400 | 422 if UID_TAKEN_RE.is_match(&body) => CmsError::Conflict(body),
        _ => CmsError::Http { status, body },
    }
}

/// The master ref from a repository (`GET /api/v2`) response.
/// Search predicate for a project by uid.
///
/// A uid that could break out of the quoted predicate can never name a real
/// document, so it is reported as not found without a request.
pub fn project_predicate(project_type: &str, uid: &str) -> Result<String, CmsError> {
    if uid.is_empty() || uid.contains(['"', '\\', '[', ']']) {
        return Err(CmsError::NotFound(format!("project \"{}\"", uid)));
    }
    Ok(format!("[[at(my.{}.uid,\"{}\")]]", project_type, uid))
}

pub fn master_ref(body: &Value) -> Option<String> {
    body.get("refs")?
        .as_array()?
        .iter()
        .find(|r| r.get("isMasterRef").and_then(Value::as_bool) == Some(true))?
        .get("ref")?
        .as_str()
        .map(str::to_string)
}

/// Read a person document from the content API.
///
/// The display name is `data.name`, falling back to `data.title`.
pub fn person_from_document(doc: &Value) -> Option<PersonRecord> {
    let id = doc.get("id")?.as_str()?;
    let data = doc.get("data");

    Some(PersonRecord {
        id: id.to_string(),
        uid: doc
            .get("uid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        name: data_text(data, "name")
            .or_else(|| data_text(data, "title"))
            .unwrap_or_default()
            .to_string(),
        url: data
            .and_then(|d| d.pointer("/link/url"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
    })
}

fn data_text<'a>(data: Option<&'a Value>, field: &str) -> Option<&'a str> {
    data.and_then(|d| d.get(field))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Migration API body for a new person.
pub fn person_payload(person: &NewPerson, person_type: &str) -> Value {
    let link = match &person.url {
        Some(url) => json!({ "link_type": "Web", "url": url }),
        None => json!({ "link_type": "Any" }),
    };
    json!({
        "type": person_type,
        "uid": person.uid,
        "lang": person.lang,
        "title": person.name,
        "data": {
            "name": person.name,
            "link": link,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_ref() {
        let body = json!({
            "refs": [
                { "id": "release", "ref": "R1", "isMasterRef": false },
                { "id": "master", "ref": "MASTER", "isMasterRef": true }
            ]
        });
        assert_eq!(master_ref(&body).as_deref(), Some("MASTER"));
        assert_eq!(master_ref(&json!({})), None);
    }

    #[test]
    fn test_project_predicate_rejects_quote_breaking_uids() {
        assert_eq!(
            project_predicate("projects", "the-final").unwrap(),
            "[[at(my.projects.uid,\"the-final\")]]"
        );
        for uid in ["x\")]][[at(document.type,\"people", "a\\b", "a]b", ""] {
            match project_predicate("projects", uid) {
                Err(CmsError::NotFound(_)) => {}
                other => panic!("expected not found for {:?}, got {:?}", uid, other),
            }
        }
    }

    #[test]
    fn test_person_from_document() {
        let doc = json!({
            "id": "ZX1",
            "uid": "jane-doe",
            "data": {
                "name": " Jane Doe ",
                "link": { "link_type": "Web", "url": "https://instagram.com/jd" }
            }
        });
        let person = person_from_document(&doc).unwrap();
        assert_eq!(person.name, "Jane Doe");
        assert_eq!(person.url.as_deref(), Some("https://instagram.com/jd"));

        let titled = json!({
            "id": "ZX2",
            "data": { "title": "Oro Studio", "link": { "link_type": "Any" } }
        });
        let person = person_from_document(&titled).unwrap();
        assert_eq!(person.name, "Oro Studio");
        assert_eq!(person.uid, "");
        assert!(person.url.is_none());

        assert!(person_from_document(&json!({ "uid": "no-id" })).is_none());
    }

    #[test]
    fn test_classify_error() {
        assert!(matches!(classify_error(404, String::new()), CmsError::NotFound(_)));
        assert!(matches!(classify_error(409, String::new()), CmsError::Conflict(_)));
        assert!(matches!(
            classify_error(400, "The UID jane-doe is already used".into()),
            CmsError::Conflict(_)
        ));
        assert!(matches!(
            classify_error(400, "title is required".into()),
            CmsError::Http { status: 400, .. }
        ));
        assert!(matches!(
            classify_error(500, "boom".into()),
            CmsError::Http { status: 500, .. }
        ));
    }

    #[test]
    fn test_person_payload() {
        let person = NewPerson {
            uid: "jane-doe".into(),
            lang: "en-us".into(),
            name: "Jane Doe".into(),
            url: Some("https://instagram.com/jd".into()),
        };
        let body = person_payload(&person, "people");
        assert_eq!(body["type"], "people");
        assert_eq!(body["data"]["link"]["url"], "https://instagram.com/jd");

        let bare = NewPerson { url: None, ..person };
        assert_eq!(person_payload(&bare, "people")["data"]["link"]["link_type"], "Any");
    }

    #[test]
    fn test_client_without_write_token_is_read_only() {
        let config = CmsConfig {
            repository: "studio-site".into(),
            ..Default::default()
        };
        let client = PrismicClient::new(&config, Some("read".into()), None).unwrap();
        assert!(!client.can_write());
        assert!(matches!(client.write_token(), Err(CmsError::ReadOnly)));
    }
}
