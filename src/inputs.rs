//! Input discovery and loading.
//!
//! An input is an HTML credits fragment or a [`CreditsFile`] JSON document.
//! A directory contributes every `*.html`, `*.htm`, and `*.json` file
//! directly inside it, sorted by file name. The file stem is the default
//! project uid.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::ImportError;
use crate::models::{CreditRow, CreditsFile};
use crate::parse::{normalize_rows, parse_credits_html};

const INPUT_GLOBS: &[&str] = &["*.html", "*.htm", "*.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Html,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub kind: InputKind,
    /// File name without extension; the default project uid.
    pub stem: String,
}

impl InputFile {
    /// Classify a path. Anything that isn't `.json` is read as HTML.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let kind = if ext == "json" {
            InputKind::Json
        } else {
            InputKind::Html
        };
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            kind,
            stem,
        }
    }

    /// Sibling path `<stem>.json`, used when generating JSON without `--out`.
    pub fn default_json_path(&self) -> PathBuf {
        self.path.with_file_name(format!("{}.json", self.stem))
    }
}

/// A single input named on the command line.
pub fn single_file(path: &Path) -> Result<InputFile, ImportError> {
    if !path.is_file() {
        return Err(ImportError::input(format!(
            "input file does not exist: {}",
            path.display()
        )));
    }
    Ok(InputFile::from_path(path))
}

/// Every input file directly inside `dir`, in file-name order.
pub fn scan_dir(dir: &Path) -> Result<Vec<InputFile>, ImportError> {
    if !dir.is_dir() {
        return Err(ImportError::input(format!(
            "input directory does not exist: {}",
            dir.display()
        )));
    }

    let include = build_globset(INPUT_GLOBS)?;
    let mut inputs = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| ImportError::input(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !include.is_match(&name) {
            continue;
        }
        inputs.push(InputFile::from_path(entry.path()));
    }

    Ok(inputs)
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet, ImportError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ImportError::input(e.to_string()))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ImportError::input(e.to_string()))
}

pub fn read_html(path: &Path) -> Result<String, ImportError> {
    std::fs::read_to_string(path)
        .map_err(|e| ImportError::input(format!("failed to read {}: {}", path.display(), e)))
}

pub fn read_credits_file(path: &Path) -> Result<CreditsFile, ImportError> {
    let content = read_html(path)?;
    serde_json::from_str(&content)
        .map_err(|e| ImportError::input(format!("malformed JSON in {}: {}", path.display(), e)))
}

/// Rows read from one input, plus the project named inside a JSON input.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub rows: Vec<CreditRow>,
    pub project: Option<String>,
}

/// Read and parse an input into credit rows.
pub fn load_rows(input: &InputFile) -> Result<LoadedInput, ImportError> {
    match input.kind {
        InputKind::Html => {
            let html = read_html(&input.path)?;
            Ok(LoadedInput {
                rows: parse_credits_html(&html),
                project: None,
            })
        }
        InputKind::Json => {
            let file = read_credits_file(&input.path)?;
            Ok(LoadedInput {
                rows: normalize_rows(file.rows),
                project: file
                    .project
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty()),
            })
        }
    }
}

/// Write pretty-printed JSON with a trailing newline.
pub fn write_credits_file(path: &Path, file: &CreditsFile) -> Result<(), ImportError> {
    let mut json = serde_json::to_string_pretty(file)
        .map_err(|e| ImportError::input(e.to_string()))?;
    json.push('\n');
    std::fs::write(path, json)
        .map_err(|e| ImportError::input(format!("failed to write {}: {}", path.display(), e)))
}
