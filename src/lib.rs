//! # Credits Import
//!
//! Migrates free-form credits blocks (rich-text HTML written by editors) into
//! a headless CMS's structured credits field.
//!
//! Each credits line becomes a labelled row of people. Every person is
//! matched against the CMS's person directory, missing people can be created
//! on the fly, and the result is merged into the project's existing credits
//! without duplicating links.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌──────────┐   ┌─────────┐
//! │ HTML / JSON  │──▶│  Parser  │──▶│ Resolver │──▶│  Merge  │
//! │   inputs     │   │  (rows)  │   │(directory)│  │ (rows)  │
//! └──────────────┘   └──────────┘   └────┬─────┘   └────┬────┘
//!                                        │              │
//!                                        ▼              ▼
//!                                  ┌──────────────────────────┐
//!                                  │   CmsClient (HTTP/mem)   │
//!                                  └──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! credits import --file credits/the-final.html                 # dry run
//! credits import --file credits/the-final.html --gen-json      # write the-final.json
//! credits import --dir credits --dry-run=false                 # apply a batch
//! credits people missing --dir credits                         # who would be created
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`parse`] | HTML credits parser |
//! | [`directory`] | Person directory index |
//! | [`resolve`] | Mention resolution and person creation |
//! | [`merge`] | Credits merge engine |
//! | [`cms`] | CMS client trait, HTTP and in-memory clients |
//! | [`inputs`] | Input discovery and loading |
//! | [`import`] | Per-input pipeline orchestration |
//! | [`report`] | Run reports |
//! | [`people`] | Directory inspection commands |
//! | [`error`] | Import error types |

pub mod cms;
pub mod config;
pub mod directory;
pub mod error;
pub mod import;
pub mod inputs;
pub mod merge;
pub mod models;
pub mod parse;
pub mod people;
pub mod report;
pub mod resolve;
