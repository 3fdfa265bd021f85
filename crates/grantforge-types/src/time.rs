//! Human-readable elapsed-time buckets for dashboard stats.

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: u64 = 7 * MS_PER_DAY;
const MS_PER_MONTH: u64 = 30 * MS_PER_DAY;
const MS_PER_YEAR: u64 = 365 * MS_PER_DAY;

fn round_div(value: u64, unit: u64) -> u64 {
    (value + unit / 2) / unit
}

/// Elapsed time between two millisecond timestamps as a compact label:
/// `"42s"`, `"5min"`, `"3h"`, `"4d"`, `"2w"`, `"6m"`, `"1y"`.
pub fn relative_time(later_ms: u64, earlier_ms: u64) -> String {
    let elapsed = later_ms.saturating_sub(earlier_ms);
    if elapsed < MS_PER_MINUTE {
        format!("{}s", round_div(elapsed, MS_PER_SECOND))
    } else if elapsed < MS_PER_HOUR {
        format!("{}min", round_div(elapsed, MS_PER_MINUTE))
    } else if elapsed < MS_PER_DAY {
        format!("{}h", round_div(elapsed, MS_PER_HOUR))
    } else if elapsed < MS_PER_WEEK {
        format!("{}d", round_div(elapsed, MS_PER_DAY))
    } else if elapsed < MS_PER_MONTH {
        format!("{}w", round_div(elapsed, MS_PER_WEEK))
    } else if elapsed < MS_PER_YEAR {
        format!("{}m", round_div(elapsed, MS_PER_MONTH))
    } else {
        format!("{}y", round_div(elapsed, MS_PER_YEAR))
    }
}

/// Average turnaround between two timestamp populations (e.g. grant creation
/// and first disbursal), as a compact label. `None` when there is nothing to
/// show: no data, a sub-second average, or two weeks and beyond, where the
/// stat stops being meaningful on a dashboard tile.
pub fn average_turnaround(completed_ms: &[u64], started_ms: &[u64]) -> Option<String> {
    if completed_ms.is_empty() || started_ms.is_empty() {
        return None;
    }
    let mean = |xs: &[u64]| xs.iter().map(|&x| x as f64).sum::<f64>() / xs.len() as f64;
    let average = mean(completed_ms) - mean(started_ms);
    if average < MS_PER_SECOND as f64 {
        return None;
    }
    let label = if average < MS_PER_MINUTE as f64 {
        format!("{}s", (average / MS_PER_SECOND as f64).round())
    } else if average < MS_PER_HOUR as f64 {
        format!("{}min", (average / MS_PER_MINUTE as f64).round())
    } else if average < MS_PER_DAY as f64 {
        format!("{}h", (average / MS_PER_HOUR as f64).round())
    } else if average < MS_PER_WEEK as f64 {
        format!("{}d", (average / MS_PER_DAY as f64).round())
    } else if average < 2.0 * MS_PER_WEEK as f64 {
        format!("{}w", (average / MS_PER_WEEK as f64).round())
    } else {
        return None;
    };
    Some(label)
}
