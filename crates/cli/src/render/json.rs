//! Machine-readable renderer: one JSON object per line on stdout.

use serde_json::{Value, json};

use crate::render::Renderer;
use crate::runner::{CheckDef, InfoMap, ResultRecord, RunStats};

/// Renders records as line-delimited JSON.
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn result(&self, record: &ResultRecord, _check: &CheckDef) {
        println!("{}", render_record(record));
    }

    fn summary(&self, stats: &RunStats) {
        println!("{}", render_stats(stats));
    }
}

/// Key order is part of the wire contract: desc, status, optional
/// remedy, info.
fn render_record(record: &ResultRecord) -> String {
    let mut out = InfoMap::new();
    out.insert("desc".to_string(), Value::String(record.description.clone()));
    out.insert(
        "status".to_string(),
        Value::String(record.status.label().to_string()),
    );
    if let Some(remedy) = &record.remedy {
        out.insert("remedy".to_string(), Value::String(remedy.clone()));
    }
    out.insert("info".to_string(), Value::Object(record.info.clone()));
    Value::Object(out).to_string()
}

fn render_stats(stats: &RunStats) -> String {
    json!({
        "succeeded": stats.succeeded,
        "no_result": stats.no_result,
        "failed": stats.failed,
        "errors": stats.errors,
        "skipped": stats.skipped,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CheckStatus;
    use serde_json::json;

    #[test]
    fn skipped_record_with_no_info_omits_remedy() {
        let record = ResultRecord {
            status: CheckStatus::Skipped,
            info: InfoMap::new(),
            description: "check CRDT sources".to_string(),
            remedy: None,
        };
        assert_eq!(
            render_record(&record),
            r#"{"desc":"check CRDT sources","status":"SKIPPED","info":{}}"#
        );
    }

    #[test]
    fn failed_record_carries_remedy_before_info() {
        let mut info = InfoMap::new();
        info.insert("shard:5".to_string(), json!("27.31 Kops"));
        let record = ResultRecord {
            status: CheckStatus::Failed,
            info,
            description: "check throughput".to_string(),
            remedy: Some("add shards".to_string()),
        };
        assert_eq!(
            render_record(&record),
            r#"{"desc":"check throughput","status":"FAILED","remedy":"add shards","info":{"shard:5":"27.31 Kops"}}"#
        );
    }

    #[test]
    fn info_preserves_insertion_order() {
        let mut info = InfoMap::new();
        info.insert("node:3".to_string(), json!("ok"));
        info.insert("node:1".to_string(), json!("ok"));
        info.insert("node:2".to_string(), json!("ok"));
        let record = ResultRecord {
            status: CheckStatus::Succeeded,
            info,
            description: "d".to_string(),
            remedy: None,
        };
        let rendered = render_record(&record);
        let n3 = rendered.find("node:3").unwrap();
        let n1 = rendered.find("node:1").unwrap();
        let n2 = rendered.find("node:2").unwrap();
        assert!(n3 < n1 && n1 < n2);
    }

    #[test]
    fn stats_use_the_five_counter_wire_shape() {
        let stats = RunStats {
            succeeded: 12,
            no_result: 3,
            failed: 1,
            errors: 0,
            skipped: 2,
        };
        assert_eq!(
            render_stats(&stats),
            r#"{"succeeded":12,"no_result":3,"failed":1,"errors":0,"skipped":2}"#
        );
    }
}
