//! Reporting: the ordered result set and formatted terminal output.

pub mod format;
pub mod result_set;

pub use format::*;
pub use result_set::*;
