//! Patient reports: the render-ready payload for one patient.

mod patient;

pub use patient::*;
