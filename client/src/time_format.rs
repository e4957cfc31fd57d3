use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse a backend timestamp into local wall-clock time. Offset-less values are taken as
/// already local; a bare date is midnight.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// `2025-12-29T15:00:00` -> `2025/12/29 15:00`, `20251229` -> `2025/12/29`.
/// Anything else comes back unchanged.
pub fn format_date(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    if raw.contains('-') {
        return parse_timestamp(raw)
            .map(|dt| dt.format("%Y/%m/%d %H:%M").to_string())
            .unwrap_or_else(|| raw.to_string());
    }
    if raw.len() == 8 && raw.is_ascii() {
        return format!("{}/{}/{}", &raw[0..4], &raw[4..6], &raw[6..8]);
    }
    raw.to_string()
}

/// `1530` -> `15:30`. Shorter input is returned as-is.
pub fn format_time(raw: &str) -> String {
    match (raw.get(0..2), raw.get(2..4)) {
        (Some(hours), Some(minutes)) => format!("{hours}:{minutes}"),
        _ => raw.to_string(),
    }
}

/// `2025-12-29T15:04:00` -> `12/29 15:04`, used for API call records.
pub fn format_date_time(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    parse_timestamp(raw)
        .map(|dt| dt.format("%m/%d %H:%M").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Rank cell: `-` when unranked, `*` suffix for estimated ranks.
pub fn format_rank(rank: Option<i64>, is_estimate: bool) -> String {
    match rank {
        None | Some(0) => "-".to_string(),
        Some(rank) if is_estimate => format!("{rank}*"),
        Some(rank) => rank.to_string(),
    }
}

/// Thousands-separated integer, `-` for zero or missing.
pub fn format_number(value: Option<i64>) -> String {
    let Some(value) = value.filter(|v| *v != 0) else {
        return "-".to_string();
    };
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
