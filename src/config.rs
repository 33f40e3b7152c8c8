use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub create: CreateConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CmsConfig {
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default = "default_migration_endpoint")]
    pub migration_endpoint: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_person_type")]
    pub person_type: String,
    #[serde(default = "default_project_type")]
    pub project_type: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,
    #[serde(default = "default_write_token_env")]
    pub write_token_env: String,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            api_endpoint: None,
            migration_endpoint: default_migration_endpoint(),
            lang: default_lang(),
            person_type: default_person_type(),
            project_type: default_project_type(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            access_token_env: default_access_token_env(),
            write_token_env: default_write_token_env(),
        }
    }
}

fn default_migration_endpoint() -> String {
    "https://migration.prismic.io".to_string()
}
fn default_lang() -> String {
    "en-us".to_string()
}
fn default_person_type() -> String {
    "people".to_string()
}
fn default_project_type() -> String {
    "projects".to_string()
}
fn default_page_size() -> u32 {
    100
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_access_token_env() -> String {
    "CMS_ACCESS_TOKEN".to_string()
}
fn default_write_token_env() -> String {
    "CMS_WRITE_TOKEN".to_string()
}

impl CmsConfig {
    /// Read API root, derived from the repository name unless set explicitly.
    pub fn api_endpoint(&self) -> String {
        match &self.api_endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.cdn.prismic.io/api/v2", self.repository),
        }
    }

    /// Read token from the configured environment variable.
    pub fn access_token(&self) -> Option<String> {
        read_env(&self.access_token_env)
    }

    /// Write token, falling back to the read token.
    pub fn write_token(&self) -> Option<String> {
        read_env(&self.write_token_env).or_else(|| self.access_token())
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    #[serde(default = "default_true")]
    pub substring_match: bool,
    /// Written name -> name as stored in the directory.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            substring_match: true,
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_uid_attempts")]
    pub max_uid_attempts: u32,
}

impl Default for CreateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_uid_attempts: default_max_uid_attempts(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_max_uid_attempts() -> u32 {
    5
}

impl Config {
    /// Defaults only; enough for commands that never reach the CMS.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.cms.repository.trim().is_empty() && config.cms.api_endpoint.is_none() {
        anyhow::bail!("cms.repository must be set (or cms.api_endpoint given explicitly)");
    }

    if !(1..=100).contains(&config.cms.page_size) {
        anyhow::bail!("cms.page_size must be in [1, 100]");
    }

    if config.cms.lang.trim().is_empty() {
        anyhow::bail!("cms.lang must not be empty");
    }

    if config.create.max_uid_attempts == 0 {
        anyhow::bail!("create.max_uid_attempts must be >= 1");
    }

    for (from, to) in &config.resolver.overrides {
        if from.trim().is_empty() || to.trim().is_empty() {
            anyhow::bail!("resolver.overrides entries must have non-empty names");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_applied() {
        let file = write_config("[cms]\nrepository = \"studio-site\"\n");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.cms.lang, "en-us");
        assert_eq!(cfg.cms.page_size, 100);
        assert_eq!(cfg.create.max_uid_attempts, 5);
        assert!(cfg.create.enabled);
        assert!(cfg.resolver.substring_match);
        assert_eq!(
            cfg.cms.api_endpoint(),
            "https://studio-site.cdn.prismic.io/api/v2"
        );
    }

    #[test]
    fn test_overrides_table() {
        let file = write_config(
            r#"
[cms]
repository = "studio-site"
api_endpoint = "http://localhost:9000/api/v2/"

[resolver]
substring_match = false

[resolver.overrides]
"Santiago Carrasquilla" = "Santiago Carrasquila"
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert!(!cfg.resolver.substring_match);
        assert_eq!(
            cfg.resolver.overrides.get("Santiago Carrasquilla").map(String::as_str),
            Some("Santiago Carrasquila")
        );
        assert_eq!(cfg.cms.api_endpoint(), "http://localhost:9000/api/v2");
    }

    #[test]
    fn test_missing_repository_rejected() {
        let file = write_config("[cms]\nlang = \"en-us\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("cms.repository"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let file = write_config("[cms]\nrepository = \"r\"\n\n[create]\nmax_uid_attempts = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        let file = write_config("[cms]\nrepository = \"r\"\npage_size = 500\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/credits.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
