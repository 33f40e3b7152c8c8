//! # Credits CLI (`credits`)
//!
//! Imports credits blocks into the CMS and inspects the person directory.
//!
//! ## Usage
//!
//! ```bash
//! credits --config ./config/credits.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `credits import --file <path>` | Import one HTML or JSON credits file |
//! | `credits import --dir <dir>` | Import every `.html`/`.json` file in a directory |
//! | `credits people list` | Print the person directory |
//! | `credits people missing` | Show which mentions don't resolve |
//!
//! `import` is a dry run unless `--dry-run=false` is given, and prints a
//! JSON report per input to stdout. Logs go to stderr; set `RUST_LOG` to
//! change verbosity.
//!
//! ## Examples
//!
//! ```bash
//! # Preview what would change
//! credits import --file credits/the-final.html
//!
//! # Convert HTML to the editable JSON format, no CMS access needed
//! credits import --file credits/the-final.html --gen-json --out /tmp/the-final.json
//!
//! # Preview a batch, linking only people who already exist
//! credits import --dir credits --link-only
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use credits_import::cms::http::PrismicClient;
use credits_import::config::{self, Config};
use credits_import::import::{ImportOptions, Importer};
use credits_import::people;
use credits_import::report::ImportResults;

/// Credits importer: migrate free-form credits into structured CMS credits.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/credits.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "credits",
    about = "Migrate free-form credits blocks into structured CMS credits",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/credits.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import credits into project documents.
    ///
    /// Parses each input, resolves every mentioned person against the CMS
    /// directory, and merges the result into the project's credits.
    /// Prints `{"results": [...]}` with one report per input.
    Import(ImportArgs),

    /// Inspect the person directory.
    People {
        #[command(subcommand)]
        action: PeopleAction,
    },
}

#[derive(Args)]
struct ImportArgs {
    /// A single `.html` or `.json` credits file.
    #[arg(long)]
    file: Option<PathBuf>,

    /// A directory of `.html`/`.json` credits files.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Project uid. Only applies to `--file`; defaults to the file name.
    #[arg(long, visible_alias = "slug")]
    project: Option<String>,

    /// Report what would change without writing. Pass `--dry-run=false` to apply.
    #[arg(
        long,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set
    )]
    dry_run: bool,

    /// Preview links to people who already exist. Never writes.
    #[arg(
        long,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set
    )]
    link_only: bool,

    /// Write the parsed rows as JSON instead of importing. No CMS access.
    #[arg(
        long = "gen-json",
        visible_alias = "to-json",
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        require_equals = true,
        action = ArgAction::Set
    )]
    gen_json: bool,

    /// Output path for `--gen-json` with `--file`. Defaults to `<stem>.json`
    /// next to the input.
    #[arg(long)]
    out: Option<PathBuf>,
}

impl ImportArgs {
    fn into_options(self) -> ImportOptions {
        ImportOptions {
            file: self.file,
            dir: self.dir,
            project: self.project,
            dry_run: self.dry_run,
            link_only: self.link_only,
            gen_json: self.gen_json,
            out: self.out,
        }
    }
}

#[derive(Subcommand)]
enum PeopleAction {
    /// List every person document.
    List,

    /// Resolve the mentions in some inputs and list who is missing.
    Missing {
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("credits_import=info".parse()?)
                .add_directive("credits=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import(args) => {
            let options = args.into_options();
            if options.file.is_none() && options.dir.is_none() {
                anyhow::bail!("Provide either --file <path.(html|json)> or --dir <directory>");
            }

            // Generating JSON never reaches the CMS
            let cfg = if options.gen_json {
                config::load_config(&cli.config).unwrap_or_else(|_| Config::minimal())
            } else {
                config::load_config(&cli.config)?
            };
            let cms = PrismicClient::from_env(&cfg.cms).context("Failed to build CMS client")?;

            let mut importer = Importer::new(&cfg, &cms);
            let results = importer.run(&options).await?;
            println!("{}", serde_json::to_string_pretty(&ImportResults { results })?);
        }
        Commands::People { action } => {
            let cfg = config::load_config(&cli.config)?;
            let cms = PrismicClient::from_env(&cfg.cms).context("Failed to build CMS client")?;
            match action {
                PeopleAction::List => people::list_people(&cms).await?,
                PeopleAction::Missing { file, dir } => {
                    people::run_missing(&cfg, &cms, file.as_deref(), dir.as_deref()).await?
                }
            }
        }
    }

    Ok(())
}
