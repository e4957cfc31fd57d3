//! Clan battle rankings via the external battle-data proxy. No auth involved.

use std::collections::BTreeMap;
use std::rc::Rc;

use pcrdb_shared::{
    BattleEnvelope, BattleSearchRequest, CurrentTimes, HistoryPeriods, ScorelineRequest,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{
    CLAN_BATTLE_ERROR_DISPLAY_MS, CLAN_BATTLE_PAGE_LIMIT, CLAN_BATTLE_SERVER_ID, ClientConfig,
};
use crate::error::{ClientError, ClientResult, MSG_QUERY_FAILED};
use crate::http::{HttpRequest, Transport};
use crate::runtime;
use crate::store::{Generation, Store};

const MSG_SEARCH_FAILED: &str = "Query failed";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BattleMode {
    /// The running battle, addressed by snapshot date and time.
    #[default]
    Current,
    /// An archived battle month.
    History,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClanBattleState {
    pub mode: BattleMode,
    pub loading: bool,
    /// Snapshot date (`YYYYMMDD`) -> snapshot times (`HHMM`), oldest first.
    pub time_data: BTreeMap<String, Vec<String>>,
    pub history_periods: Vec<String>,
    pub selected_date: String,
    pub selected_time: String,
    pub selected_history: String,
    pub search_text: String,
    pub results: Vec<Value>,
    pub page: u32,
    pub max_page: u32,
    pub limit: u32,
    pub error_visible: bool,
    pub error: String,
}

impl Default for ClanBattleState {
    fn default() -> Self {
        Self {
            mode: BattleMode::default(),
            loading: false,
            time_data: BTreeMap::new(),
            history_periods: Vec::new(),
            selected_date: String::new(),
            selected_time: String::new(),
            selected_history: String::new(),
            search_text: String::new(),
            results: Vec::new(),
            page: 0,
            max_page: 0,
            limit: CLAN_BATTLE_PAGE_LIMIT,
            error_visible: false,
            error: String::new(),
        }
    }
}

impl ClanBattleState {
    fn begin_search(&mut self) {
        self.loading = true;
        self.error_visible = false;
        self.error.clear();
        self.results.clear();
    }

    /// Proxy data file for the current selection.
    pub fn filename(&self) -> String {
        match self.mode {
            BattleMode::Current => format!(
                "qd/{CLAN_BATTLE_SERVER_ID}/{}{}",
                self.selected_date, self.selected_time
            ),
            BattleMode::History => {
                format!("qd/history/{CLAN_BATTLE_SERVER_ID}/{}", self.selected_history)
            }
        }
    }
}

pub fn page_count(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
}

#[derive(Clone)]
pub struct ClanBattleQuery {
    state: Store<ClanBattleState>,
    transport: Rc<dyn Transport>,
    config: ClientConfig,
    generation: Generation,
    error_generation: Generation,
}

impl ClanBattleQuery {
    pub fn new(config: ClientConfig, transport: Rc<dyn Transport>) -> Self {
        Self {
            state: Store::default(),
            transport,
            config,
            generation: Generation::default(),
            error_generation: Generation::default(),
        }
    }

    pub fn state(&self) -> &Store<ClanBattleState> {
        &self.state
    }

    pub fn set_mode(&self, mode: BattleMode) {
        self.state.update(|s| s.mode = mode);
    }

    pub fn set_search_text(&self, text: &str) {
        self.state.update(|s| s.search_text = text.to_string());
    }

    pub fn select_history(&self, period: &str) {
        self.state.update(|s| s.selected_history = period.to_string());
    }

    /// Pick a snapshot date and move the time to that date's latest snapshot.
    pub fn select_date(&self, date: &str) {
        self.state.update(|s| s.selected_date = date.to_string());
        self.update_time_options();
    }

    pub fn select_time(&self, time: &str) {
        self.state.update(|s| s.selected_time = time.to_string());
    }

    pub fn update_time_options(&self) {
        self.state.update(|s| {
            if let Some(latest) = s
                .time_data
                .get(&s.selected_date)
                .and_then(|times| times.last())
            {
                s.selected_time = latest.clone();
            }
        });
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> ClientResult<BattleEnvelope<T>> {
        let resp = self
            .transport
            .send(HttpRequest::get(self.config.battle_url(path)))
            .await?;
        resp.json()
    }

    async fn post_envelope<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<BattleEnvelope<Vec<Value>>> {
        let request = HttpRequest::post_json(self.config.battle_url(path), body)?;
        self.transport.send(request).await?.json()
    }

    /// Load the current battle's snapshot calendar and select the newest snapshot.
    pub async fn load_current_times(&self) {
        match self.get_envelope::<CurrentTimes>("/current/getalltime/qd").await {
            Ok(envelope) => {
                let times = envelope
                    .data
                    .and_then(|mut servers| servers.remove(CLAN_BATTLE_SERVER_ID))
                    .unwrap_or_default();
                self.state.update(|s| {
                    if let Some((date, slots)) = times.iter().next_back() {
                        s.selected_date = date.clone();
                        if let Some(time) = slots.last() {
                            s.selected_time = time.clone();
                        }
                    }
                    s.time_data = times;
                });
            }
            Err(e) => tracing::warn!(error = %e, "failed to load clan battle times"),
        }
    }

    /// Load archived battle months and select the newest one.
    pub async fn load_history_periods(&self) {
        match self
            .get_envelope::<HistoryPeriods>("/history/getalltime/qd")
            .await
        {
            Ok(envelope) => {
                let periods = envelope
                    .data
                    .and_then(|mut servers| servers.remove(CLAN_BATTLE_SERVER_ID))
                    .unwrap_or_default();
                self.state.update(|s| {
                    if let Some(latest) = periods.last() {
                        s.selected_history = latest.clone();
                    }
                    s.history_periods = periods;
                });
            }
            Err(e) => tracing::warn!(error = %e, "failed to load clan battle history"),
        }
    }

    /// Ranking search for one page of the current selection.
    pub async fn search(&self, page: u32) {
        let ticket = self.generation.next();
        self.error_generation.next();
        let request = self.state.update(|s| {
            s.begin_search();
            s.page = page;
            BattleSearchRequest {
                filename: s.filename(),
                search: s.search_text.clone(),
                page,
                page_limit: s.limit,
            }
        });

        let result = self.post_envelope("/search", &request).await;
        if !self.generation.is_current(ticket) {
            tracing::debug!(ticket, page, "discarding superseded clan battle page");
            return;
        }

        match result {
            Ok(envelope) if envelope.is_success() => self.state.update(|s| {
                s.max_page = page_count(envelope.total, s.limit);
                s.results = envelope.data.unwrap_or_default();
                s.loading = false;
            }),
            Ok(envelope) => self.fail(envelope.error_message),
            Err(e) => self.fail_transport(e),
        }
    }

    /// Score-line (threshold) lookup. Results always fit on one page.
    pub async fn search_scoreline(&self) {
        let ticket = self.generation.next();
        self.error_generation.next();
        let request = self.state.update(|s| {
            s.begin_search();
            ScorelineRequest {
                filename: s.filename(),
                search: s.search_text.clone(),
            }
        });

        let result = self.post_envelope("/search/scoreline", &request).await;
        if !self.generation.is_current(ticket) {
            return;
        }

        match result {
            Ok(envelope) if envelope.is_success() => self.state.update(|s| {
                s.results = envelope.data.unwrap_or_default();
                s.max_page = 1;
                s.page = 0;
                s.loading = false;
            }),
            Ok(envelope) => self.fail(envelope.error_message),
            Err(e) => self.fail_transport(e),
        }
    }

    /// Move `delta` pages and refetch. Returns false, without a request, when the target
    /// page falls outside `[0, max_page)`.
    pub async fn page_by(&self, delta: i64) -> bool {
        let (page, max_page) = self.state.with(|s| (s.page, s.max_page));
        let target = i64::from(page) + delta;
        if target < 0 || target >= i64::from(max_page) {
            return false;
        }
        // In range of a u32 max_page, so the cast is lossless.
        self.search(target as u32).await;
        true
    }

    fn fail(&self, message: Option<String>) {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| MSG_SEARCH_FAILED.to_string());
        self.show_error(message);
    }

    fn fail_transport(&self, error: ClientError) {
        tracing::warn!(error = %error, "clan battle search failed");
        self.show_error(MSG_QUERY_FAILED.to_string());
    }

    /// Show `message` and hide it again after a few seconds, unless a newer error
    /// replaced it in the meantime.
    fn show_error(&self, message: String) {
        let ticket = self.error_generation.next();
        self.state.update(|s| {
            s.loading = false;
            s.error_visible = true;
            s.error = message;
        });

        let state = self.state.clone();
        let error_generation = self.error_generation.clone();
        runtime::spawn_local(async move {
            runtime::sleep_ms(CLAN_BATTLE_ERROR_DISPLAY_MS).await;
            if error_generation.is_current(ticket) {
                state.update(|s| s.error_visible = false);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockTransport, test_config};
    use serde_json::json;
    use tokio::task::LocalSet;

    fn battle() -> (Rc<MockTransport>, ClanBattleQuery) {
        let transport = Rc::new(MockTransport::new());
        let query = ClanBattleQuery::new(test_config(), transport.clone());
        (transport, query)
    }

    fn sent_body(transport: &MockTransport, index: usize) -> Value {
        serde_json::from_str(transport.requests()[index].body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(21, 10), 3);
        assert_eq!(page_count(5, 0), 0);
    }

    #[test]
    fn filename_follows_mode() {
        let mut state = ClanBattleState {
            selected_date: "20251229".into(),
            selected_time: "1200".into(),
            selected_history: "202511".into(),
            ..Default::default()
        };
        assert_eq!(state.filename(), "qd/1/202512291200");
        state.mode = BattleMode::History;
        assert_eq!(state.filename(), "qd/history/1/202511");
    }

    #[tokio::test]
    async fn current_times_select_latest_snapshot() {
        let (transport, query) = battle();
        transport.push_json(
            200,
            json!({
                "state": "success",
                "data": { "1": { "20251228": ["2300"], "20251229": ["0500", "1200"] } }
            }),
        );

        query.load_current_times().await;

        assert_eq!(transport.urls(), vec!["http://battle.test/current/getalltime/qd"]);
        query.state().with(|s| {
            assert_eq!(s.selected_date, "20251229");
            assert_eq!(s.selected_time, "1200");
        });

        query.select_date("20251228");
        query.state().with(|s| assert_eq!(s.selected_time, "2300"));
    }

    #[tokio::test]
    async fn history_periods_select_latest() {
        let (transport, query) = battle();
        transport.push_json(
            200,
            json!({ "state": "success", "data": { "1": ["202510", "202511"] } }),
        );
        query.load_history_periods().await;
        query.state().with(|s| {
            assert_eq!(s.history_periods, vec!["202510", "202511"]);
            assert_eq!(s.selected_history, "202511");
        });
    }

    #[tokio::test]
    async fn time_load_failure_is_swallowed() {
        let (transport, query) = battle();
        transport.push_transport_error("offline");
        query.load_current_times().await;
        query.state().with(|s| {
            assert!(s.time_data.is_empty());
            assert!(s.error.is_empty());
        });
    }

    #[tokio::test]
    async fn search_posts_page_and_derives_max_page() {
        let (transport, query) = battle();
        query.select_history("202511");
        query.set_mode(BattleMode::History);
        query.set_search_text("Bunny");
        transport.push_json(
            200,
            json!({ "state": "success", "data": [{ "rank": 1 }], "total": 25 }),
        );

        query.search(0).await;

        assert_eq!(transport.urls(), vec!["http://battle.test/search"]);
        assert_eq!(
            sent_body(&transport, 0),
            json!({
                "filename": "qd/history/1/202511",
                "search": "Bunny",
                "page": 0,
                "page_limit": 10
            })
        );
        query.state().with(|s| {
            assert_eq!(s.max_page, 3);
            assert_eq!(s.results.len(), 1);
            assert!(!s.loading);
            assert!(!s.error_visible);
        });
    }

    #[tokio::test]
    async fn page_navigation_is_clamped() {
        let (transport, query) = battle();
        query.state().update(|s| {
            s.page = 2;
            s.max_page = 3;
        });

        assert!(!query.page_by(1).await);
        assert!(transport.requests().is_empty());
        query.state().with(|s| assert_eq!(s.page, 2));

        transport.push_json(200, json!({ "state": "success", "data": [], "total": 30 }));
        assert!(query.page_by(-1).await);
        assert_eq!(sent_body(&transport, 0)["page"], 1);
        query.state().with(|s| assert_eq!(s.page, 1));
    }

    #[tokio::test]
    async fn page_navigation_rejects_negative() {
        let (transport, query) = battle();
        query.state().update(|s| s.max_page = 3);
        assert!(!query.page_by(-1).await);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn failed_search_shows_proxy_message() {
        LocalSet::new()
            .run_until(async {
                let (transport, query) = battle();
                transport.push_json(
                    200,
                    json!({ "state": "fail", "error_message": "file not found" }),
                );

                query.search(0).await;

                query.state().with(|s| {
                    assert!(s.error_visible);
                    assert_eq!(s.error, "file not found");
                    assert!(!s.loading);
                });
            })
            .await;
    }

    #[tokio::test]
    async fn transport_failure_shows_generic_message() {
        LocalSet::new()
            .run_until(async {
                let (transport, query) = battle();
                transport.push_transport_error("offline");
                query.search_scoreline().await;
                query.state().with(|s| {
                    assert_eq!(s.error, MSG_QUERY_FAILED);
                    assert!(!s.loading);
                });
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn error_hides_after_display_window() {
        LocalSet::new()
            .run_until(async {
                let (transport, query) = battle();
                transport.push_json(200, json!({ "state": "fail" }));
                query.search(0).await;
                query.state().with(|s| {
                    assert!(s.error_visible);
                    assert_eq!(s.error, MSG_SEARCH_FAILED);
                });

                tokio::time::sleep(std::time::Duration::from_millis(
                    u64::from(CLAN_BATTLE_ERROR_DISPLAY_MS) + 10,
                ))
                .await;

                query.state().with(|s| assert!(!s.error_visible));
            })
            .await;
    }

    #[tokio::test]
    async fn successful_search_clears_previous_error() {
        LocalSet::new()
            .run_until(async {
                let (transport, query) = battle();
                transport.push_json(
                    200,
                    json!({ "state": "success", "data": [{ "rank": 1 }], "total": 1 }),
                );
                transport.push_json(
                    200,
                    json!({ "state": "fail", "error_message": "file not found" }),
                );
                transport.push_json(
                    200,
                    json!({ "state": "success", "data": [{ "rank": 2 }], "total": 1 }),
                );

                query.search(0).await;
                query.search(0).await;
                query.state().with(|s| {
                    assert!(s.error_visible);
                    assert!(s.results.is_empty());
                });

                query.search(0).await;
                query.state().with(|s| {
                    assert!(!s.error_visible);
                    assert!(s.error.is_empty());
                    assert_eq!(s.results, vec![json!({ "rank": 2 })]);
                });
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn pending_hide_does_not_touch_a_newer_error() {
        LocalSet::new()
            .run_until(async {
                let (transport, query) = battle();
                transport.push_json(200, json!({ "state": "fail", "error_message": "first" }));
                query.search(0).await;

                tokio::time::sleep(std::time::Duration::from_millis(2000)).await;
                transport.push_json(200, json!({ "state": "fail", "error_message": "second" }));
                query.search(0).await;

                tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
                query.state().with(|s| {
                    assert!(s.error_visible);
                    assert_eq!(s.error, "second");
                });

                tokio::time::sleep(std::time::Duration::from_millis(1600)).await;
                query.state().with(|s| assert!(!s.error_visible));
            })
            .await;
    }

    #[tokio::test]
    async fn scoreline_resets_paging() {
        let (transport, query) = battle();
        query.state().update(|s| {
            s.page = 4;
            s.max_page = 9;
        });
        transport.push_json(200, json!({ "state": "success", "data": [{ "rank": 100 }] }));

        query.search_scoreline().await;

        assert_eq!(transport.urls(), vec!["http://battle.test/search/scoreline"]);
        assert!(sent_body(&transport, 0).get("page").is_none());
        query.state().with(|s| {
            assert_eq!(s.page, 0);
            assert_eq!(s.max_page, 1);
            assert_eq!(s.results.len(), 1);
        });
    }

    #[tokio::test]
    async fn stale_page_response_is_dropped() {
        let (transport, query) = battle();
        let slow = transport.push_pending();
        transport.push_json(
            200,
            json!({ "state": "success", "data": [{ "page": 1 }], "total": 20 }),
        );

        let first = query.search(0);
        let second = async {
            query.search(1).await;
            let _ = slow.send(Ok(crate::http::HttpResponse::new(
                200,
                json!({ "state": "success", "data": [{ "page": 0 }], "total": 20 }).to_string(),
            )));
        };
        futures::join!(first, second);

        query.state().with(|s| {
            assert_eq!(s.page, 1);
            assert_eq!(s.results, vec![json!({ "page": 1 })]);
        });
    }
}
