//! Human-readable renderer: one annotated line per record.

use console::style;
use serde_json::Value;

use crate::render::Renderer;
use crate::runner::{CheckDef, CheckStatus, ResultRecord, RunStats};

/// Renders records as colored lines on stderr.
pub struct BasicRenderer;

impl Renderer for BasicRenderer {
    fn result(&self, record: &ResultRecord, _check: &CheckDef) {
        let (glyph, tag) = match record.status {
            CheckStatus::Succeeded => (
                style("[+]").green().to_string(),
                style("[SUCCEEDED]").green().to_string(),
            ),
            CheckStatus::Failed => (
                style("[-]").red().to_string(),
                style("[FAILED]").red().to_string(),
            ),
            CheckStatus::NoResult => (
                style("[~]").yellow().to_string(),
                style("[NO RESULT]").yellow().to_string(),
            ),
            CheckStatus::Skipped => ("[ ]".to_string(), "[SKIPPED]".to_string()),
            CheckStatus::Errored => (
                style("[*]").magenta().to_string(),
                style("[ERROR]").magenta().to_string(),
            ),
        };

        let info = record
            .info
            .iter()
            .map(|(key, value)| format!("{key}: {}", display_value(value)))
            .collect::<Vec<_>>()
            .join(", ");

        match &record.remedy {
            Some(remedy) => eprintln!(
                "{glyph} {} {tag} {info} {} {remedy}",
                record.description,
                style("Remedy:").cyan()
            ),
            None => eprintln!("{glyph} {} {tag} {info}", record.description),
        }
    }

    fn summary(&self, stats: &RunStats) {
        eprintln!();
        eprintln!("total checks run: {}", stats.total());
        eprintln!("- {}: {}", style("succeeded").green(), stats.succeeded);
        eprintln!("- {}: {}", style("no result").yellow(), stats.no_result);
        eprintln!("- {}: {}", style("failed").red(), stats.failed);
        eprintln!("- {}: {}", style("errors").magenta(), stats.errors);
        eprintln!("- skipped: {}", stats.skipped);
    }
}

/// Strings print bare; everything else keeps its JSON form.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
