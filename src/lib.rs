//! `ideal-match` library crate.
//!
//! The binary (`ideal`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the matching core can be driven from in-memory tables as well as CSV files
//!
//! Data flow: `io::ingest` -> `fit::selection` -> `fit::threshold` ->
//! `fit::assign` -> `report` / `io::export` / `plot` / `tui`.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod plot;
pub mod report;
pub mod tui;
