//! Matching core.
//!
//! Responsibilities:
//!
//! - score training series against references (SSD, max residual)
//! - select the best reference per training series (parallel over references)
//! - derive per-reference acceptance thresholds
//! - assign test points (parallel over points)

pub mod assign;
pub mod scorer;
pub mod selection;
pub mod threshold;

pub use assign::*;
pub use scorer::*;
pub use selection::*;
pub use threshold::*;
