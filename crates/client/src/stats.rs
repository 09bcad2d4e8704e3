//! Statistical summary over noisy interval telemetry.
//!
//! Nearly every usage and throughput check reduces a window of interval
//! records to the same four numbers; this module is that one primitive.

use serde_json::Value;

use crate::error::{ClientError, Result};

/// Min/avg/max/population-stddev over a filtered sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub std_dev: f64,
}

/// Summarize one numeric field across a window of interval records.
///
/// Records are filtered on explicit presence of the field as a number;
/// a recorded zero is a real sample and participates fully. Fails with
/// [`ClientError::InsufficientData`] when no record carries the field —
/// callers must treat that as "could not measure", never as zero.
pub fn summarize(intervals: &[Value], field: &str) -> Result<Summary> {
    summarize_by(intervals, field, |sample| sample)
}

/// Like [`summarize`], but maps each sample through `f` first.
///
/// Used for derived series such as CPU usage (`1 - cpu_idle`).
pub fn summarize_by(
    intervals: &[Value],
    field: &str,
    f: impl Fn(f64) -> f64,
) -> Result<Summary> {
    let samples: Vec<f64> = intervals
        .iter()
        .filter_map(|record| record.get(field).and_then(Value::as_f64))
        .map(f)
        .collect();

    if samples.is_empty() {
        return Err(ClientError::InsufficientData(format!(
            "no '{field}' samples in interval data"
        )));
    }

    let n = samples.len() as f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &sample in &samples {
        min = min.min(sample);
        max = max.max(sample);
        sum += sample;
    }
    let avg = sum / n;

    // Population standard deviation: divide by n, not n-1. The window is
    // the whole population of interest, not a sample from it.
    let variance = samples
        .iter()
        .map(|sample| (sample - avg).powi(2))
        .sum::<f64>()
        / n;

    Ok(Summary {
        min,
        avg,
        max,
        std_dev: variance.sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summarizes_simple_window() {
        let intervals = vec![
            json!({"total_req": 10.0}),
            json!({"total_req": 20.0}),
            json!({"total_req": 30.0}),
        ];
        let summary = summarize(&intervals, "total_req").unwrap();
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.avg, 20.0);
        assert_eq!(summary.max, 30.0);
        assert!((summary.std_dev - 8.16496580927726).abs() < 1e-9);
    }

    #[test]
    fn empty_window_is_an_explicit_error() {
        let err = summarize(&[], "total_req").unwrap_err();
        assert!(matches!(err, ClientError::InsufficientData(_)));
    }

    #[test]
    fn records_without_the_field_are_filtered_not_zeroed() {
        let intervals = vec![
            json!({"other": 1.0}),
            json!({"total_req": 4.0}),
            json!({"other": 2.0}),
        ];
        let summary = summarize(&intervals, "total_req").unwrap();
        assert_eq!(summary.min, 4.0);
        assert_eq!(summary.max, 4.0);
        assert_eq!(summary.std_dev, 0.0);
    }

    #[test]
    fn zero_samples_participate() {
        let intervals = vec![json!({"used_memory": 0.0}), json!({"used_memory": 8.0})];
        let summary = summarize(&intervals, "used_memory").unwrap();
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.avg, 4.0);
    }

    #[test]
    fn all_fields_missing_is_insufficient_data() {
        let intervals = vec![json!({"other": 1.0}), json!({"other": 2.0})];
        assert!(summarize(&intervals, "total_req").is_err());
    }

    #[test]
    fn summarize_by_maps_samples() {
        let intervals = vec![json!({"cpu_idle": 0.75}), json!({"cpu_idle": 0.25})];
        let summary = summarize_by(&intervals, "cpu_idle", |idle| 1.0 - idle).unwrap();
        assert!((summary.min - 0.25).abs() < 1e-12);
        assert!((summary.max - 0.75).abs() < 1e-12);
        assert!((summary.avg - 0.5).abs() < 1e-12);
    }
}
