use serde_json::Value;

use crate::config::{ClientConfig, TOP_CLANS_DEFAULT_LIMIT};
use crate::http::{HttpRequest, Query};
use crate::query::{QueryState, fetch_authorized, run_query, string_list};
use crate::roster::{RosterSchema, RosterTable};
use crate::session::SessionStore;
use crate::store::{Generation, Store};

const MSG_CLAN_REQUIRED: &str = "Enter a clan name or clan ID";
const PROFILES_DEFAULT_COLUMN: &str = "total_power";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClanMode {
    #[default]
    History,
    Members,
    TopClans,
    Profiles,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClanState {
    pub mode: ClanMode,
    pub loading: bool,
    pub error: String,
    pub history: Option<Value>,
    pub members: Option<Value>,
    pub top_clans: Option<Value>,
    pub profile_dates: Vec<String>,
    /// Profiles response without its `players` array, which lives in `profiles`.
    pub profile_meta: Option<Value>,
    pub profiles: RosterTable,
}

impl Default for ClanState {
    fn default() -> Self {
        Self {
            mode: ClanMode::default(),
            loading: false,
            error: String::new(),
            history: None,
            members: None,
            top_clans: None,
            profile_dates: Vec::new(),
            profile_meta: None,
            profiles: RosterTable::new(RosterSchema::profiles()),
        }
    }
}

impl QueryState for ClanState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_error(&mut self, error: String) {
        self.error = error;
    }
}

/// Clan lookups against the authenticated backend.
#[derive(Clone)]
pub struct ClanQuery {
    state: Store<ClanState>,
    session: SessionStore,
    config: ClientConfig,
    generation: Generation,
}

impl ClanQuery {
    pub fn new(config: ClientConfig, session: SessionStore) -> Self {
        Self {
            state: Store::default(),
            session,
            config,
            generation: Generation::default(),
        }
    }

    pub fn state(&self) -> &Store<ClanState> {
        &self.state
    }

    pub fn set_mode(&self, mode: ClanMode) {
        self.state.update(|s| s.mode = mode);
    }

    /// Rejects a request with neither identifier before anything is sent.
    fn clan_selector(&self, clan_id: &str, clan_name: &str) -> Option<Query> {
        let (clan_id, clan_name) = (clan_id.trim(), clan_name.trim());
        if !clan_id.is_empty() {
            Some(Query::new().param("clan_id", clan_id))
        } else if !clan_name.is_empty() {
            Some(Query::new().param("clan_name", clan_name))
        } else {
            self.state.update(|s| s.error = MSG_CLAN_REQUIRED.to_string());
            None
        }
    }

    /// Ranking history for one clan. The id wins when both are given.
    pub async fn search_history(&self, clan_id: &str, clan_name: &str) {
        let Some(query) = self.clan_selector(clan_id, clan_name) else {
            return;
        };
        let url = query.apply(&self.config.api_url("/api/clan/history"));
        run_query(
            &self.state,
            &self.generation,
            |s| s.history = None,
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, body| s.history = Some(body),
        )
        .await;
    }

    /// Member list for a month (`YYYY-MM`, latest when omitted).
    pub async fn load_members(&self, clan_id: &str, clan_name: &str, period: Option<&str>) {
        let Some(query) = self.clan_selector(clan_id, clan_name) else {
            return;
        };
        let url = query
            .param_opt("period", period.filter(|p| !p.is_empty()))
            .apply(&self.config.api_url("/api/clan/members"));
        run_query(
            &self.state,
            &self.generation,
            |s| s.members = None,
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, body| s.members = Some(body),
        )
        .await;
    }

    pub async fn load_top_clans(&self, period: Option<&str>, limit: Option<u32>) {
        let url = Query::new()
            .param_opt("period", period.filter(|p| !p.is_empty()))
            .param("limit", limit.unwrap_or(TOP_CLANS_DEFAULT_LIMIT))
            .apply(&self.config.api_url("/api/clan/top_clans"));
        run_query(
            &self.state,
            &self.generation,
            |s| s.top_clans = None,
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, body| s.top_clans = Some(body),
        )
        .await;
    }

    /// Days with profile snapshots, newest first. Accepts a bare array or `{dates: [...]}`.
    pub async fn load_profile_dates(&self) {
        let url = self.config.api_url("/api/clan/profile_dates");
        run_query(
            &self.state,
            &self.generation,
            |_| {},
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, body| {
                s.profile_dates = match body.get("dates") {
                    Some(dates) => string_list(dates),
                    None => string_list(&body),
                };
            },
        )
        .await;
    }

    /// Player profiles for a day, optionally narrowed to one clan. Rows land in the
    /// profiles table sorted by total power, descending.
    pub async fn load_profiles(&self, date: Option<&str>, clan_id: Option<&str>) {
        let url = Query::new()
            .param_opt("date", date.filter(|d| !d.is_empty()))
            .param_opt("clan_id", clan_id.filter(|c| !c.is_empty()))
            .apply(&self.config.api_url("/api/clan/profiles"));
        run_query(
            &self.state,
            &self.generation,
            |s| {
                s.profile_meta = None;
                s.profiles.clear();
            },
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, mut body| {
                let players = body
                    .as_object_mut()
                    .and_then(|obj| obj.remove("players"))
                    .and_then(|players| match players {
                        Value::Array(rows) => Some(rows),
                        _ => None,
                    })
                    .unwrap_or_default();
                s.profiles.load(players, PROFILES_DEFAULT_COLUMN);
                s.profile_meta = Some(body);
            },
        )
        .await;
    }

    pub fn sort_profiles(&self, column: &str, force_descending: bool) {
        self.state
            .update(|s| s.profiles.sort_by(column, force_descending));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MSG_SESSION_EXPIRED;
    use crate::test_support::{signed_in_harness, test_config};
    use serde_json::json;

    fn clan_query() -> (std::rc::Rc<crate::test_support::MockTransport>, SessionStore, ClanQuery) {
        let (transport, _storage, session) = signed_in_harness("user");
        let clan = ClanQuery::new(test_config(), session.clone());
        (transport, session, clan)
    }

    #[tokio::test]
    async fn history_requires_id_or_name() {
        let (transport, _session, clan) = clan_query();
        clan.search_history("  ", "").await;
        assert!(transport.requests().is_empty());
        clan.state().with(|s| {
            assert_eq!(s.error, MSG_CLAN_REQUIRED);
            assert!(!s.loading);
        });
    }

    #[tokio::test]
    async fn history_prefers_id_and_stores_result() {
        let (transport, _session, clan) = clan_query();
        transport.push_json(200, json!({ "clan_id": 42877, "history": [] }));

        clan.search_history("42877", "Bunny").await;

        assert_eq!(
            transport.urls(),
            vec!["http://api.test/api/clan/history?clan_id=42877"]
        );
        let sent = transport.requests();
        assert_eq!(sent[0].header_value("Authorization"), Some("Bearer tok"));
        clan.state().with(|s| {
            assert_eq!(s.history.as_ref().unwrap()["clan_id"], 42877);
            assert!(s.error.is_empty());
        });
    }

    #[tokio::test]
    async fn history_by_name_is_encoded() {
        let (transport, _session, clan) = clan_query();
        transport.push_json(200, json!({ "history": [] }));
        clan.search_history("", "美食殿").await;
        assert_eq!(
            transport.urls(),
            vec!["http://api.test/api/clan/history?clan_name=%E7%BE%8E%E9%A3%9F%E6%AE%BF"]
        );
    }

    #[tokio::test]
    async fn server_error_field_becomes_local_error() {
        let (transport, _session, clan) = clan_query();
        transport.push_json(200, json!({ "history": [] }));
        clan.search_history("1", "").await;
        transport.push_json(200, json!({ "error": "clan not found" }));

        clan.search_history("2", "").await;

        clan.state().with(|s| {
            assert_eq!(s.error, "clan not found");
            assert!(s.history.is_none());
        });
    }

    #[tokio::test]
    async fn unauthorized_signs_out() {
        let (transport, session, clan) = clan_query();
        transport.push_json(401, json!({}));

        clan.search_history("1", "").await;

        assert!(!session.is_logged_in());
        clan.state().with(|s| assert_eq!(s.error, MSG_SESSION_EXPIRED));
    }

    #[tokio::test]
    async fn members_and_top_clans_build_query() {
        let (transport, _session, clan) = clan_query();
        transport.push_json(200, json!({ "members": [] }));
        transport.push_json(200, json!({ "clans": [] }));

        clan.load_members("", "Bunny", Some("2025-12")).await;
        clan.load_top_clans(None, None).await;

        assert_eq!(
            transport.urls(),
            vec![
                "http://api.test/api/clan/members?clan_name=Bunny&period=2025-12",
                "http://api.test/api/clan/top_clans?limit=30",
            ]
        );
        clan.state().with(|s| {
            assert!(s.members.is_some());
            assert!(s.top_clans.is_some());
        });
    }

    #[tokio::test]
    async fn profile_dates_accept_both_shapes() {
        let (transport, _session, clan) = clan_query();
        transport.push_json(200, json!(["2025-12-30", "2025-12-29"]));
        clan.load_profile_dates().await;
        clan.state()
            .with(|s| assert_eq!(s.profile_dates, vec!["2025-12-30", "2025-12-29"]));

        transport.push_json(200, json!({ "dates": ["2025-12-31"] }));
        clan.load_profile_dates().await;
        clan.state()
            .with(|s| assert_eq!(s.profile_dates, vec!["2025-12-31"]));
    }

    #[tokio::test]
    async fn profiles_fill_sorted_table() {
        let (transport, _session, clan) = clan_query();
        transport.push_json(
            200,
            json!({
                "date": "2025-12-30",
                "talent_total": 250,
                "players": [
                    { "viewer_id": 1, "user_name": "a", "total_power": 100, "knight_level": "200" },
                    {
                        "viewer_id": 2,
                        "user_name": "b",
                        "total_power": 300,
                        "knight_level": "251+"
                    },
                    { "viewer_id": 3, "user_name": "c", "total_power": 200, "knight_level": "210" }
                ]
            }),
        );

        clan.load_profiles(Some("2025-12-30"), Some("42877")).await;

        assert_eq!(
            transport.urls(),
            vec!["http://api.test/api/clan/profiles?date=2025-12-30&clan_id=42877"]
        );
        let order = |clan: &ClanQuery| -> Vec<i64> {
            clan.state().with(|s| {
                s.profiles
                    .entries
                    .iter()
                    .map(|e| e["viewer_id"].as_i64().unwrap())
                    .collect()
            })
        };
        assert_eq!(order(&clan), vec![2, 3, 1]);
        clan.state().with(|s| {
            let meta = s.profile_meta.as_ref().unwrap();
            assert_eq!(meta["talent_total"], 250);
            assert!(meta.get("players").is_none());
        });

        clan.sort_profiles("knight_level", false);
        assert_eq!(order(&clan), vec![2, 3, 1]);
        clan.sort_profiles("knight_level", false);
        assert_eq!(order(&clan), vec![1, 3, 2]);
        clan.sort_profiles("user_name", false);
        assert_eq!(order(&clan), vec![3, 2, 1]);
    }
}
