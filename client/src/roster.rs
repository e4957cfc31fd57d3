//! Client-side sorting for roster tables (clan member profiles and friends).
//!
//! Rows are passed through from the backend as JSON objects. Columns are either text
//! (player or clan names) or numeric; numeric cells may arrive as strings, including
//! capped values such as `"251+"`.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use crate::config::CAPPED_VALUE_SENTINEL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Numeric,
}

/// Which field identifies a row and which columns sort as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterSchema {
    pub id_field: String,
    pub text_columns: Vec<String>,
}

impl RosterSchema {
    pub fn new(id_field: &str, text_columns: &[&str]) -> Self {
        Self {
            id_field: id_field.to_string(),
            text_columns: text_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// `/api/clan/profiles` player rows.
    pub fn profiles() -> Self {
        Self::new("viewer_id", &["user_name", "join_clan_name"])
    }

    pub fn kind(&self, column: &str) -> ColumnKind {
        if self.text_columns.iter().any(|c| c == column) {
            ColumnKind::Text
        } else {
            ColumnKind::Numeric
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    pub active_column: Option<String>,
    pub ascending: bool,
}

impl SortState {
    /// Pick the direction for a sort request on `column` and record it.
    pub fn apply(&mut self, column: &str, force_descending: bool) {
        if force_descending {
            self.ascending = false;
        } else if self.active_column.as_deref() == Some(column) {
            self.ascending = !self.ascending;
        } else {
            self.ascending = false;
        }
        if self.active_column.as_deref() != Some(column) {
            self.active_column = Some(column.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortOutcome {
    pub entries: Vec<Value>,
    /// Rows whose identifier was already seen earlier in the input.
    pub duplicate_count: usize,
}

/// Sort a copy of `entries` by `column`, updating `state` with the chosen direction.
///
/// The sort is stable. Duplicate identifiers are counted and logged but every row is
/// kept, since views keyed by identifier misrender when ids repeat.
pub fn sort_roster(
    entries: &[Value],
    column: &str,
    force_descending: bool,
    state: &mut SortState,
    schema: &RosterSchema,
) -> SortOutcome {
    state.apply(column, force_descending);
    let ascending = state.ascending;

    let duplicate_count = count_duplicate_ids(entries, &schema.id_field);
    if duplicate_count > 0 {
        tracing::warn!(
            duplicate_count,
            id_field = %schema.id_field,
            "roster contains duplicate identifiers"
        );
    }

    let mut sorted = entries.to_vec();
    match schema.kind(column) {
        ColumnKind::Text => sorted.sort_by(|a, b| {
            compare_text(text_cell(a.get(column)), text_cell(b.get(column)), ascending)
        }),
        ColumnKind::Numeric => sorted.sort_by(|a, b| {
            let (a, b) = (numeric_cell(a.get(column)), numeric_cell(b.get(column)));
            if ascending { a.total_cmp(&b) } else { b.total_cmp(&a) }
        }),
    }

    SortOutcome {
        entries: sorted,
        duplicate_count,
    }
}

pub fn count_duplicate_ids(entries: &[Value], id_field: &str) -> usize {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        let Some(id) = entry.get(id_field).and_then(id_key) else {
            continue;
        };
        *seen.entry(id).or_default() += 1;
    }
    seen.values().map(|count| count - 1).sum()
}

fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Empty and missing cells always sort last, whichever the direction.
fn compare_text(a: Option<String>, b: Option<String>, ascending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = collate(&a, &b);
            if ascending { ord } else { ord.reverse() }
        }
    }
}

// Case-folded comparison stands in for locale collation; raw order breaks case-only ties.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn text_cell(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric cell value. A string ending in `+` is a capped value and maps to the
/// sentinel; strings without a leading integer count as 0.
pub fn numeric_cell(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) if s.trim_end().ends_with('+') => CAPPED_VALUE_SENTINEL as f64,
        Some(Value::String(s)) => parse_leading_int(s).map_or(0.0, |n| n as f64),
        _ => 0.0,
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// A fetched roster plus its current sort, as bound by a table view.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterTable {
    pub schema: RosterSchema,
    pub entries: Vec<Value>,
    pub sort: SortState,
    pub duplicate_count: usize,
}

impl RosterTable {
    pub fn new(schema: RosterSchema) -> Self {
        Self {
            schema,
            entries: Vec::new(),
            sort: SortState::default(),
            duplicate_count: 0,
        }
    }

    /// Replace the rows and sort them descending by `column`.
    pub fn load(&mut self, entries: Vec<Value>, column: &str) {
        self.entries = entries;
        self.sort_by(column, true);
    }

    pub fn sort_by(&mut self, column: &str, force_descending: bool) {
        let outcome = sort_roster(
            &self.entries,
            column,
            force_descending,
            &mut self.sort,
            &self.schema,
        );
        self.entries = outcome.entries;
        self.duplicate_count = outcome.duplicate_count;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.duplicate_count = 0;
    }
}
