//! In-memory tables and synthetic dataset generation.

pub mod sample;
pub mod table;

pub use sample::*;
pub use table::*;
