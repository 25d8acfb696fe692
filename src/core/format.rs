use chrono::{DateTime, Utc};

use super::engine::{DAYS_PER_MONTH, MS_PER_DAY};

/// "2 years, 3 months" until `date`; "Never" without a date, "Paid off" once
/// it is not in the future. Partial months round up.
pub fn format_time_to_payoff(date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(date) = date else {
        return "Never".to_string();
    };
    let days = (date - now).num_milliseconds() as f64 / MS_PER_DAY;
    let months = (days / DAYS_PER_MONTH).ceil();
    if months <= 0.0 {
        return "Paid off".to_string();
    }
    describe_months(months as u32)
}

/// Human-readable form of a time-saved figure in milliseconds, rounded to
/// the nearest month.
pub fn format_time_saved(time_saved_ms: Option<i64>) -> String {
    let Some(ms) = time_saved_ms.filter(|ms| *ms > 0) else {
        return "0 months".to_string();
    };
    let months = (ms as f64 / (MS_PER_DAY * DAYS_PER_MONTH)).round();
    if months < 1.0 {
        return "<1 month".to_string();
    }
    describe_months(months as u32)
}

pub fn describe_months(months: u32) -> String {
    let years = months / 12;
    let rem = months % 12;
    match (years, rem) {
        (0, _) => plural(rem, "month"),
        (_, 0) => plural(years, "year"),
        _ => format!("{}, {}", plural(years, "year"), plural(rem, "month")),
    }
}

fn plural(count: u32, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}
