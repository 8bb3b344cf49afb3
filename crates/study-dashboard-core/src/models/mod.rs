//! Domain models for the study dashboard.

mod notes;
mod patient;

pub use notes::*;
pub use patient::*;
