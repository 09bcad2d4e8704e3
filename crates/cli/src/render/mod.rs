//! Output renderers.
//!
//! Two interchangeable sinks share one contract: render one record per
//! outcome and one summary per run, without mutating inputs or keeping
//! state between calls, preserving the insertion order of info entries.
//! The human-readable renderer writes annotated lines to stderr (the
//! diagnostic stream); the machine-readable renderer writes structured
//! objects to stdout (the primary output stream).

mod basic;
mod json;

pub use basic::BasicRenderer;
pub use json::JsonRenderer;

use std::str::FromStr;

use crate::runner::{CheckDef, ResultRecord, RunStats};

/// Sink for classified check results.
pub trait Renderer {
    /// Render one record. The originating check definition is passed
    /// along for renderers that want documentation context.
    fn result(&self, record: &ResultRecord, check: &CheckDef);

    /// Render the final run counters.
    fn summary(&self, stats: &RunStats);
}

/// Selectable output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Basic,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown output format '{other}' (expected 'basic' or 'json')"
            )),
        }
    }
}

/// Get the renderer for a format.
pub fn renderer_for(format: OutputFormat) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Basic => Box::new(BasicRenderer),
        OutputFormat::Json => Box::new(JsonRenderer),
    }
}
