//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - samples and named series (`Sample`, `Series`)
//! - selection / threshold / assignment outputs (`FitResult`, `Threshold`, `AssignmentRecord`)
//! - run configuration (`RunConfig`, `DomainPolicy`) and the saved summary schema

pub mod types;

pub use types::*;
