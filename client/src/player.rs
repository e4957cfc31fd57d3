use serde_json::Value;

use crate::config::{ClientConfig, PLAYER_SEARCH_LIMIT};
use crate::error::ClientError;
use crate::http::{HttpRequest, Query};
use crate::query::{QueryState, fetch_authorized, run_query, string_list};
use crate::session::SessionStore;
use crate::store::{Generation, Store};

const MSG_NAME_REQUIRED: &str = "Enter a player name";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerMode {
    #[default]
    ClanHistory,
    Search,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    pub mode: PlayerMode,
    pub loading: bool,
    pub error: String,
    pub history: Option<Value>,
    pub search_results: Vec<Value>,
    pub search_period: String,
    pub period_options: Vec<String>,
}

impl QueryState for PlayerState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_error(&mut self, error: String) {
        self.error = error;
    }
}

#[derive(Clone)]
pub struct PlayerQuery {
    state: Store<PlayerState>,
    session: SessionStore,
    config: ClientConfig,
    generation: Generation,
}

impl PlayerQuery {
    pub fn new(config: ClientConfig, session: SessionStore) -> Self {
        Self {
            state: Store::default(),
            session,
            config,
            generation: Generation::default(),
        }
    }

    pub fn state(&self) -> &Store<PlayerState> {
        &self.state
    }

    pub fn set_mode(&self, mode: PlayerMode) {
        self.state.update(|s| s.mode = mode);
    }

    pub fn select_period(&self, period: &str) {
        self.state.update(|s| s.search_period = period.to_string());
    }

    /// Months that have player data. Selects the first one if none is chosen yet.
    /// Does not touch `loading`; failures other than an expired session are only logged.
    pub async fn load_periods(&self) {
        let url = self.config.api_url("/api/player/periods");
        match fetch_authorized(&self.session, HttpRequest::get(url)).await {
            Ok(body) if body.is_array() => {
                let periods = string_list(&body);
                self.state.update(|s| {
                    if s.search_period.is_empty()
                        && let Some(first) = periods.first()
                    {
                        s.search_period = first.clone();
                    }
                    s.period_options = periods;
                });
            }
            Ok(_) => tracing::warn!("unexpected period list shape"),
            Err(ClientError::Unauthorized) => {
                self.state
                    .update(|s| s.error = ClientError::Unauthorized.user_message());
            }
            Err(e) => tracing::warn!(error = %e, "failed to load player periods"),
        }
    }

    /// Clan membership history for one player. Blank ids are ignored.
    pub async fn search_history(&self, viewer_id: &str) {
        let viewer_id = viewer_id.trim();
        if viewer_id.is_empty() {
            return;
        }
        let url = Query::new()
            .param("viewer_id", viewer_id)
            .apply(&self.config.api_url("/api/player/history"));
        run_query(
            &self.state,
            &self.generation,
            |s| s.history = None,
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, body| s.history = Some(body),
        )
        .await;
    }

    /// Name search, scoped to the selected period when there is one.
    pub async fn search(&self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            self.state.update(|s| s.error = MSG_NAME_REQUIRED.to_string());
            return;
        }
        let period = self.state.with(|s| s.search_period.clone());
        let url = Query::new()
            .param("name", name)
            .param("limit", PLAYER_SEARCH_LIMIT)
            .param_opt("period", Some(period).filter(|p| !p.is_empty()))
            .apply(&self.config.api_url("/api/player/search"));
        run_query(
            &self.state,
            &self.generation,
            |s| s.search_results.clear(),
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, body| {
                if let Value::Array(rows) = body {
                    s.search_results = rows;
                }
            },
        )
        .await;
    }
}
