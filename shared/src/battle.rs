use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const STATE_SUCCESS: &str = "success";

/// Envelope used by every clan-battle proxy endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct BattleEnvelope<T> {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl<T> BattleEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.state == STATE_SUCCESS
    }
}

/// `current/getalltime/qd` payload: server id → date → snapshot times, oldest first.
pub type CurrentTimes = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// `history/getalltime/qd` payload: server id → archived periods, oldest first.
pub type HistoryPeriods = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSearchRequest {
    pub filename: String,
    pub search: String,
    pub page: u32,
    pub page_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorelineRequest {
    pub filename: String,
    pub search: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_defaults_missing_fields() {
        let env: BattleEnvelope<serde_json::Value> =
            serde_json::from_value(json!({ "state": "fail", "error_message": "no file" })).unwrap();
        assert!(!env.is_success());
        assert_eq!(env.total, 0);
        assert_eq!(env.error_message.as_deref(), Some("no file"));
    }

    #[derive(Debug, Deserialize)]
    struct Row {
        rank: u32,
    }

    #[test]
    fn envelope_decodes_payload_without_default() {
        let env: BattleEnvelope<Vec<Row>> =
            serde_json::from_value(json!({ "state": "success", "data": [{ "rank": 3 }] })).unwrap();
        assert_eq!(env.data.unwrap()[0].rank, 3);

        let empty: BattleEnvelope<Row> =
            serde_json::from_value(json!({ "state": "fail" })).unwrap();
        assert!(empty.data.is_none());
        assert!(empty.error_message.is_none());
    }

    #[test]
    fn current_times_keep_date_order() {
        let env: BattleEnvelope<CurrentTimes> = serde_json::from_value(json!({
            "state": "success",
            "data": { "1": { "20251229": ["0500", "1200"], "20251228": ["2300"] } }
        }))
        .unwrap();
        let data = env.data.unwrap();
        let dates: Vec<&String> = data["1"].keys().collect();
        assert_eq!(dates, vec!["20251228", "20251229"]);
    }
}
