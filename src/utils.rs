use std::time::{Duration, Instant};

/// Render a duration for log fields, e.g. `1.94ms` or `2.34s`.
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Warn when the time since `start` exceeds `threshold`.
pub fn log_if_slow(start: Instant, threshold: Duration, label: &str) {
    let elapsed = start.elapsed();
    if elapsed > threshold {
        tracing::warn!(
            duration = fmt_duration(elapsed),
            threshold = fmt_duration(threshold),
            "slow operation: {label}"
        );
    }
}
