//! Import orchestration.
//!
//! Drives each input through the pipeline and produces one [`RunReport`]
//! per input:
//!
//! ```text
//! loading → parsing → resolving ─┬─ dry run → reporting ─────────────────────→ done
//!                                └─ write → creating-missing → merging → writing → done
//! ```
//!
//! Any failure moves that input to `error`; the batch continues with the
//! next input. The person directory is fetched once per [`Importer`] and
//! people created along the way are added to it, so later inputs in the
//! same batch link to them instead of creating them again.
//!
//! Dry runs never call [`CmsClient::update_project`] or
//! [`CmsClient::create_person`]. Link-only runs are dry runs. A write run
//! makes exactly one `update_project` call per input.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cms::{CmsClient, CmsError};
use crate::config::Config;
use crate::directory::DirectoryIndex;
use crate::error::ImportError;
use crate::inputs::{self, InputFile, InputKind};
use crate::merge::{count_links, merge_credits, CreditAddition};
use crate::models::{
    CreditMention, CreditRow, CreditsFile, PersonLink, ProjectDocument, ProjectUpdate,
};
use crate::parse::flatten_mentions;
use crate::report::{
    AppliedReport, DryRunReport, FailedMention, GeneratedReport, LinkedMention, Outcome,
    ProjectRef, RunReport,
};
use crate::resolve::{create_person, Resolver, UidRetryPolicy};

/// What to import and how.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub file: Option<PathBuf>,
    pub dir: Option<PathBuf>,
    /// Project uid for a single `--file`; ignored for directories.
    pub project: Option<String>,
    pub dry_run: bool,
    pub link_only: bool,
    pub gen_json: bool,
    /// Output path for `--gen-json` with a single `--file`.
    pub out: Option<PathBuf>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            file: None,
            dir: None,
            project: None,
            dry_run: true,
            link_only: false,
            gen_json: false,
            out: None,
        }
    }
}

/// Pipeline stage, as logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    Parsing,
    Resolving,
    Reporting,
    CreatingMissing,
    Merging,
    Writing,
    Done,
    Error,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::Parsing => "parsing",
            Stage::Resolving => "resolving",
            Stage::Reporting => "reporting",
            Stage::CreatingMissing => "creating-missing",
            Stage::Merging => "merging",
            Stage::Writing => "writing",
            Stage::Done => "done",
            Stage::Error => "error",
        };
        f.write_str(name)
    }
}

pub struct Importer<'a> {
    config: &'a Config,
    cms: &'a dyn CmsClient,
    resolver: Resolver,
    retry: UidRetryPolicy,
    directory: Option<DirectoryIndex>,
}

impl<'a> Importer<'a> {
    pub fn new(config: &'a Config, cms: &'a dyn CmsClient) -> Self {
        Self {
            config,
            cms,
            resolver: Resolver::from_config(&config.resolver),
            retry: UidRetryPolicy::from_config(&config.create),
            directory: None,
        }
    }

    /// Process every input named by `options`, in order.
    ///
    /// Fails only when no input was named or the input directory can't be
    /// listed; everything else is recorded in the returned reports.
    pub async fn run(&mut self, options: &ImportOptions) -> Result<Vec<RunReport>, ImportError> {
        if options.file.is_none() && options.dir.is_none() {
            return Err(ImportError::input(
                "provide either --file <path.(html|json)> or --dir <directory>",
            ));
        }

        let mut reports = Vec::new();

        if let Some(path) = &options.file {
            let report = match inputs::single_file(path) {
                Ok(input) => {
                    let project = options.project.as_deref();
                    self.process(&input, project, options.out.as_deref(), options)
                        .await
                }
                Err(err) => {
                    let project = options.project.clone().unwrap_or_else(|| {
                        InputFile::from_path(path).stem
                    });
                    failed(Some(path.display().to_string()), project, &err)
                }
            };
            reports.push(report);
        }

        if let Some(dir) = &options.dir {
            let found = inputs::scan_dir(dir)?;
            info!(
                stage = %Stage::Loading,
                dir = %dir.display(),
                inputs = found.len(),
                "scanned input directory"
            );
            for input in &found {
                reports.push(self.process(input, None, None, options).await);
            }
        }

        Ok(reports)
    }

    async fn process(
        &mut self,
        input: &InputFile,
        explicit_project: Option<&str>,
        out: Option<&Path>,
        options: &ImportOptions,
    ) -> RunReport {
        let file = input.path.display().to_string();
        let mut project = explicit_project
            .map(str::to_string)
            .unwrap_or_else(|| input.stem.clone());

        info!(stage = %Stage::Loading, %file, "loading input");
        match self
            .process_input(input, explicit_project.is_some(), &mut project, out, options)
            .await
        {
            Ok(outcome) => {
                let report = RunReport {
                    file: Some(file),
                    project,
                    outcome,
                };
                info!(
                    stage = %Stage::Done,
                    project = %report.project,
                    mode = report.mode(),
                    "input finished"
                );
                report
            }
            Err(err) => failed(Some(file), project, &err),
        }
    }

    async fn process_input(
        &mut self,
        input: &InputFile,
        explicit_project: bool,
        project: &mut String,
        out: Option<&Path>,
        options: &ImportOptions,
    ) -> Result<Outcome, ImportError> {
        if options.gen_json && input.kind == InputKind::Json {
            return Err(ImportError::input(format!(
                "{} is already JSON; --gen-json needs an HTML input",
                input.path.display()
            )));
        }

        info!(stage = %Stage::Parsing, file = %input.path.display(), "parsing credits");
        let loaded = inputs::load_rows(input)?;
        if !explicit_project {
            if let Some(named) = loaded.project {
                *project = named;
            }
        }

        if options.gen_json {
            let path = out
                .map(Path::to_path_buf)
                .unwrap_or_else(|| input.default_json_path());
            let rows = loaded.rows.len();
            inputs::write_credits_file(
                &path,
                &CreditsFile {
                    project: Some(project.clone()),
                    rows: loaded.rows,
                },
            )?;
            info!(out = %path.display(), rows, "wrote credits JSON");
            return Ok(Outcome::GeneratedJson(GeneratedReport {
                out: path.display().to_string(),
                rows,
            }));
        }

        self.import_rows(project, loaded.rows, options).await
    }

    async fn import_rows(
        &mut self,
        project: &str,
        rows: Vec<CreditRow>,
        options: &ImportOptions,
    ) -> Result<Outcome, ImportError> {
        if rows.is_empty() {
            return Err(ImportError::input("no credit mentions found in input"));
        }

        info!(stage = %Stage::Resolving, %project, rows = rows.len(), "resolving mentions");
        let doc = match self.cms.get_project(project).await {
            Ok(doc) => doc,
            Err(CmsError::NotFound(_)) => {
                return Err(ImportError::ProjectNotFound(project.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut directory = self.load_directory().await?;
        let result = self.apply(&mut directory, &doc, rows, options).await;
        self.directory = Some(directory);
        result
    }

    async fn load_directory(&mut self) -> Result<DirectoryIndex, ImportError> {
        if let Some(directory) = self.directory.take() {
            return Ok(directory);
        }
        let people = self.cms.get_all_persons().await?;
        info!(people = people.len(), "loaded person directory");
        Ok(DirectoryIndex::new(people))
    }

    async fn apply(
        &self,
        directory: &mut DirectoryIndex,
        doc: &ProjectDocument,
        rows: Vec<CreditRow>,
        options: &ImportOptions,
    ) -> Result<Outcome, ImportError> {
        let existing = doc.credits().map_err(|e| {
            ImportError::input(format!("project \"{}\" has malformed credits: {}", doc.uid, e))
        })?;
        let document = ProjectRef {
            id: doc.id.clone(),
            uid: doc.uid.clone(),
        };

        let mut linked = Vec::new();
        let mut unresolved = Vec::new();
        for mention in flatten_mentions(&rows) {
            match self.resolver.resolve(&mention, directory) {
                Some(hit) => linked.push(LinkedMention::new(&mention, &hit)),
                None => unresolved.push(mention),
            }
        }

        // Link-only never writes; it previews what existing people would link.
        let dry_run = options.dry_run || options.link_only || !self.cms.can_write();
        if !options.dry_run && !options.link_only && dry_run {
            warn!(project = %doc.uid, "no write token available; running as dry run");
        }

        if dry_run {
            info!(
                stage = %Stage::Reporting,
                project = %doc.uid,
                will_link = linked.len(),
                will_create = unresolved.len(),
                "dry run"
            );
            let preview = merge_credits(&existing, &self.additions(&rows, directory));
            return Ok(Outcome::DryRun(DryRunReport {
                document,
                parsed: rows,
                will_create: unresolved,
                will_link: linked,
                merged_credits_preview: preview,
            }));
        }

        let mut created_people = Vec::new();
        let mut failed_to_create = Vec::new();
        if self.config.create.enabled && !unresolved.is_empty() {
            info!(
                stage = %Stage::CreatingMissing,
                count = unresolved.len(),
                "creating missing people"
            );
            for mention in std::mem::take(&mut unresolved) {
                // An earlier creation in this loop may already cover this mention.
                if let Some(hit) = self.resolver.resolve(&mention, directory) {
                    linked.push(LinkedMention::new(&mention, &hit));
                    continue;
                }
                match create_person(self.cms, &mention, &self.config.cms.lang, &self.retry).await {
                    Ok(person) => {
                        directory.register(person.clone());
                        created_people.push(person);
                    }
                    Err(err @ ImportError::CreationConflict { .. }) => {
                        warn!(name = %mention.name, error = %err, "giving up on person");
                        failed_to_create.push(FailedMention {
                            name: mention.name,
                            url: mention.url,
                            error: err.to_string(),
                        });
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        info!(stage = %Stage::Merging, project = %doc.uid, "merging credits");
        let merged = merge_credits(&existing, &self.additions(&rows, directory));
        let added = count_links(&merged).saturating_sub(count_links(&existing));
        let data = doc.data_with_credits(&merged).map_err(|e| {
            ImportError::input(format!("could not encode credits for \"{}\": {}", doc.uid, e))
        })?;

        info!(
            stage = %Stage::Writing,
            project = %doc.uid,
            rows = merged.len(),
            added_links = added,
            "writing project"
        );
        let updated = self
            .cms
            .update_project(
                &doc.id,
                &ProjectUpdate {
                    lang: self.config.cms.lang.clone(),
                    data,
                },
            )
            .await?;
        let credits_count = updated
            .credits()
            .ok()
            .filter(|c| !c.is_empty())
            .map_or(merged.len(), |c| c.len());

        Ok(Outcome::Applied(AppliedReport {
            document,
            linked,
            created_people,
            failed_to_create,
            unresolved,
            credits_count,
        }))
    }

    /// Resolved people per row. Rows where nobody resolved add nothing.
    fn additions(&self, rows: &[CreditRow], directory: &DirectoryIndex) -> Vec<CreditAddition> {
        rows.iter()
            .filter_map(|row| {
                let person: Vec<PersonLink> = row
                    .people
                    .iter()
                    .filter_map(|m: &CreditMention| self.resolver.resolve(m, directory))
                    .map(|hit| PersonLink::document(&hit.person.id, &self.config.cms.person_type))
                    .collect();
                if person.is_empty() {
                    None
                } else {
                    Some(CreditAddition {
                        label: row.label.clone(),
                        person,
                    })
                }
            })
            .collect()
    }
}

fn failed(file: Option<String>, project: String, err: &ImportError) -> RunReport {
    warn!(stage = %Stage::Error, %project, kind = err.kind(), error = %err, "input failed");
    RunReport::error(file, project, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::MemoryCms;
    use crate::models::PersonRecord;
    use serde_json::{json, Map};
    use std::fs;
    use tempfile::TempDir;

    fn project(uid: &str, credits: serde_json::Value) -> ProjectDocument {
        let mut data = Map::new();
        data.insert("title".into(), json!("Film"));
        data.insert("credits".into(), credits);
        ProjectDocument {
            id: format!("ID-{}", uid),
            uid: uid.into(),
            data,
        }
    }

    fn write_html(dir: &TempDir, name: &str, html: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, html).unwrap();
        path
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::CreatingMissing.to_string(), "creating-missing");
        assert_eq!(Stage::Done.to_string(), "done");
    }

    #[tokio::test]
    async fn test_requires_an_input() {
        let config = Config::minimal();
        let cms = MemoryCms::new();
        let mut importer = Importer::new(&config, &cms);
        let err = importer.run(&ImportOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "input");
    }

    #[tokio::test]
    async fn test_empty_html_is_an_input_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_html(&tmp, "film.html", "<p>Nothing to see</p>");
        let config = Config::minimal();
        let cms = MemoryCms::new().with_project(project("film", json!([])));
        let mut importer = Importer::new(&config, &cms);

        let reports = importer
            .run(&ImportOptions {
                file: Some(path),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);
        match &reports[0].outcome {
            Outcome::Error(e) => assert_eq!(e.error_kind, "input"),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_project_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let html = r#"Director: <a href="https://x.com/jd">Jane Doe</a>"#;
        let path = write_html(&tmp, "ghost.html", html);
        let config = Config::minimal();
        let cms = MemoryCms::new();
        let mut importer = Importer::new(&config, &cms);

        let reports = importer
            .run(&ImportOptions {
                file: Some(path),
                ..Default::default()
            })
            .await
            .unwrap();
        match &reports[0].outcome {
            Outcome::Error(e) => assert_eq!(e.error_kind, "not-found"),
            other => panic!("expected error, got {:?}", other),
        }
        assert_eq!(reports[0].project, "ghost");
    }

    #[tokio::test]
    async fn test_link_only_never_writes() {
        let tmp = TempDir::new().unwrap();
        let path = write_html(
            &tmp,
            "film.html",
            "Director: <a href=\"https://x.com/jd\">Jane Doe</a> &amp; \
             <a href=\"https://x.com/new\">New Person</a>",
        );
        let config = Config::minimal();
        let cms = MemoryCms::new()
            .with_persons(vec![PersonRecord {
                id: "JD".into(),
                uid: "jane-doe".into(),
                name: "Jane Doe".into(),
                url: None,
            }])
            .with_project(project("film", json!([])));
        let mut importer = Importer::new(&config, &cms);

        let reports = importer
            .run(&ImportOptions {
                file: Some(path),
                dry_run: false,
                link_only: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let Outcome::DryRun(preview) = &reports[0].outcome else {
            panic!("expected dry run, got {:?}", reports[0].outcome);
        };
        assert_eq!(preview.will_link.len(), 1);
        assert_eq!(preview.will_create.len(), 1);
        assert_eq!(preview.will_create[0].name, "New Person");
        assert_eq!(preview.merged_credits_preview[0].person[0].target_id(), Some("JD"));
        assert!(cms.create_attempts().is_empty());
        assert!(cms.updates().is_empty());
        assert!(cms.project("film").unwrap().credits().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_disabled_links_known_people_only() {
        let tmp = TempDir::new().unwrap();
        let path = write_html(&tmp, "film.html", "Director: Jane Doe &amp; New Person");
        let mut config = Config::minimal();
        config.create.enabled = false;
        let cms = MemoryCms::new()
            .with_persons(vec![PersonRecord {
                id: "JD".into(),
                uid: "jane-doe".into(),
                name: "Jane Doe".into(),
                url: None,
            }])
            .with_project(project("film", json!([])));
        let mut importer = Importer::new(&config, &cms);

        let reports = importer
            .run(&ImportOptions {
                file: Some(path),
                dry_run: false,
                ..Default::default()
            })
            .await
            .unwrap();

        let Outcome::Applied(applied) = &reports[0].outcome else {
            panic!("expected applied, got {:?}", reports[0].outcome);
        };
        assert_eq!(applied.unresolved[0].name, "New Person");
        assert!(cms.create_attempts().is_empty());
        let credits = cms.project("film").unwrap().credits().unwrap();
        assert_eq!(credits[0].person[0].target_id(), Some("JD"));
    }
}
