#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

//! Administrative CLI for bots, teams, and webhooks on a team-collaboration server.
//!
//! Layout:
//! - `cli.rs`: argument parsing, command dispatch, and exit codes
//! - `commands/`: command handlers grouped by entity
//! - `client.rs`: shared HTTP client, errors, and the typed API surface
//! - `resolve.rs`: turning user-supplied names, emails, and ids into entities
//! - `bulk.rs`: per-item fan-out with partial failure reporting
//! - `collate.rs`: de-duplication and ordering of merged result sets
//! - `confirm.rs`: interactive confirmation for destructive operations
//! - `output.rs`: buffered text and JSON rendering
//! - `telemetry.rs`: logging setup and optional command telemetry
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod bulk;
pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod collate;
pub(crate) mod commands;
pub(crate) mod confirm;
pub(crate) mod output;
pub(crate) mod resolve;
pub(crate) mod telemetry;

pub use cli::{run, run_with};
