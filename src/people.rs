//! Person directory commands.
//!
//! `credits people list` prints the directory as the resolver sees it.
//! `credits people missing` resolves the mentions in a set of inputs
//! without touching any project, to check who would be created before an
//! import runs.

use std::path::Path;

use anyhow::Result;

use crate::cms::CmsClient;
use crate::config::Config;
use crate::directory::DirectoryIndex;
use crate::inputs::{self, InputFile};
use crate::models::CreditMention;
use crate::parse::flatten_mentions;
use crate::report::LinkedMention;
use crate::resolve::Resolver;

/// Resolution of one input's mentions against the directory.
#[derive(Debug, Clone)]
pub struct MissingReport {
    pub file: String,
    pub found: Vec<LinkedMention>,
    pub missing: Vec<CreditMention>,
    /// Set when the input could not be read or parsed.
    pub error: Option<String>,
}

pub async fn list_people(cms: &dyn CmsClient) -> Result<()> {
    let directory = DirectoryIndex::new(cms.get_all_persons().await?);

    println!("{:<32} {:<32} {:<20} URL", "NAME", "UID", "ID");
    for person in directory.people() {
        println!(
            "{:<32} {:<32} {:<20} {}",
            person.name,
            person.uid,
            person.id,
            person.url.as_deref().unwrap_or("-")
        );
    }
    println!();
    println!("{} people", directory.len());

    Ok(())
}

/// Resolve every mention in `targets` with the configured resolver.
pub async fn find_missing(
    config: &Config,
    cms: &dyn CmsClient,
    targets: &[InputFile],
) -> Result<Vec<MissingReport>> {
    let directory = DirectoryIndex::new(cms.get_all_persons().await?);
    let resolver = Resolver::from_config(&config.resolver);

    let mut reports = Vec::new();
    for input in targets {
        let file = input.path.display().to_string();
        let loaded = match inputs::load_rows(input) {
            Ok(loaded) => loaded,
            Err(e) => {
                reports.push(MissingReport {
                    file,
                    found: Vec::new(),
                    missing: Vec::new(),
                    error: Some(e.to_string()),
                });
                continue;
            }
        };

        let mut found = Vec::new();
        let mut missing = Vec::new();
        for mention in flatten_mentions(&loaded.rows) {
            match resolver.resolve(&mention, &directory) {
                Some(hit) => found.push(LinkedMention::new(&mention, &hit)),
                None => missing.push(mention),
            }
        }
        reports.push(MissingReport {
            file,
            found,
            missing,
            error: None,
        });
    }

    Ok(reports)
}

pub async fn run_missing(
    config: &Config,
    cms: &dyn CmsClient,
    file: Option<&Path>,
    dir: Option<&Path>,
) -> Result<()> {
    let mut targets = Vec::new();
    if let Some(path) = file {
        targets.push(inputs::single_file(path)?);
    }
    if let Some(path) = dir {
        targets.extend(inputs::scan_dir(path)?);
    }
    if targets.is_empty() {
        anyhow::bail!("Provide either --file <path.(html|json)> or --dir <directory>");
    }

    let reports = find_missing(config, cms, &targets).await?;
    let mut total_missing = 0;
    for report in &reports {
        println!("{}", report.file);
        if let Some(error) = &report.error {
            println!("  error    {}", error);
            continue;
        }
        for hit in &report.found {
            println!("  found    {} -> {} ({})", hit.name, hit.uid, hit.matched_by);
        }
        for mention in &report.missing {
            match &mention.url {
                Some(url) => println!("  missing  {} <{}>", mention.name, url),
                None => println!("  missing  {}", mention.name),
            }
        }
        total_missing += report.missing.len();
    }
    println!();
    println!("{} missing across {} inputs", total_missing, reports.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::MemoryCms;
    use crate::models::PersonRecord;
    use crate::resolve::MatchKind;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_find_missing_splits_found_and_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("film.html");
        fs::write(
            &path,
            "Director: <a href=\"https://instagram.com/sc\">Santiago</a><br>Music: Nick Apple",
        )
        .unwrap();
        let bad = tmp.path().join("broken.json");
        fs::write(&bad, "{").unwrap();

        let cms = MemoryCms::new().with_persons(vec![PersonRecord {
            id: "SC".into(),
            uid: "santiago-carrasquilla".into(),
            name: "Santiago Carrasquilla".into(),
            url: Some("https://instagram.com/sc".into()),
        }]);
        let inputs = vec![InputFile::from_path(&bad), InputFile::from_path(&path)];
        let reports = find_missing(&Config::minimal(), &cms, &inputs).await.unwrap();

        assert!(reports[0].error.is_some());
        let film = &reports[1];
        assert_eq!(film.found.len(), 1);
        assert_eq!(film.found[0].matched_by, MatchKind::Url);
        assert_eq!(film.missing, vec![CreditMention::new("Nick Apple", None)]);
    }
}
