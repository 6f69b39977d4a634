//! Output of a run.
//!
//! - [`notice`]: the notice template and writing the final document.
//! - [`terminal`]: colored per-dependency progress and the failure list.

pub mod notice;
pub mod terminal;
