//! Unit formatting helpers for check info values.

/// One gigabyte in bytes.
pub const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Format a byte count as gigabytes with two decimals.
pub fn to_gb(bytes: f64) -> String {
    format!("{:.2}", bytes / GB)
}

/// Format a 0..1 fraction as a percentage with one decimal.
pub fn to_percent(fraction: f64) -> String {
    format!("{:.1}", fraction * 100.0)
}

/// Format a millisecond quantity with two decimals.
pub fn to_ms(millis: f64) -> String {
    format!("{millis:.2}")
}

/// Format an operations-per-second count as Kops with two decimals.
pub fn to_kops(ops: f64) -> String {
    format!("{:.2}", ops / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_gigabytes() {
        assert_eq!(to_gb(GB), "1.00");
        assert_eq!(to_gb(1.5 * GB), "1.50");
        assert_eq!(to_gb(0.0), "0.00");
    }

    #[test]
    fn formats_percent() {
        assert_eq!(to_percent(0.851), "85.1");
        assert_eq!(to_percent(1.0), "100.0");
    }

    #[test]
    fn formats_kops() {
        assert_eq!(to_kops(25_000.0), "25.00");
        assert_eq!(to_kops(1_234.0), "1.23");
    }
}
