use serde_json::Value;

use crate::config::{ClientConfig, GRAND_DEFAULT_LIMIT};
use crate::http::{HttpRequest, Query};
use crate::query::{QueryState, fetch_authorized, run_query};
use crate::session::SessionStore;
use crate::store::{Generation, Store};

#[derive(Debug, Clone, PartialEq)]
pub struct GrandState {
    pub loading: bool,
    pub error: String,
    pub group: u32,
    pub limit: u32,
    pub results: Vec<Value>,
}

impl Default for GrandState {
    fn default() -> Self {
        Self {
            loading: false,
            error: String::new(),
            group: 0,
            limit: GRAND_DEFAULT_LIMIT,
            results: Vec::new(),
        }
    }
}

impl QueryState for GrandState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_error(&mut self, error: String) {
        self.error = error;
    }
}

/// Grand arena winning-count ranking.
#[derive(Clone)]
pub struct GrandQuery {
    state: Store<GrandState>,
    session: SessionStore,
    config: ClientConfig,
    generation: Generation,
}

impl GrandQuery {
    pub fn new(config: ClientConfig, session: SessionStore) -> Self {
        Self {
            state: Store::default(),
            session,
            config,
            generation: Generation::default(),
        }
    }

    pub fn state(&self) -> &Store<GrandState> {
        &self.state
    }

    pub fn set_filter(&self, group: u32, limit: u32) {
        self.state.update(|s| {
            s.group = group;
            s.limit = limit;
        });
    }

    /// Results are emptied on any failure.
    pub async fn search_winning(&self) {
        let (group, limit) = self.state.with(|s| (s.group, s.limit));
        let url = Query::new()
            .param("group", group)
            .param("limit", limit)
            .apply(&self.config.api_url("/api/grand/winning"));
        run_query(
            &self.state,
            &self.generation,
            |s| s.results.clear(),
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, body| {
                s.results = match body {
                    Value::Array(rows) => rows,
                    _ => Vec::new(),
                };
            },
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MSG_QUERY_FAILED, MSG_SESSION_EXPIRED};
    use crate::test_support::{signed_in_harness, test_config};
    use serde_json::json;

    #[tokio::test]
    async fn winning_uses_filter_and_stores_rows() {
        let (transport, _storage, session) = signed_in_harness("user");
        let grand = GrandQuery::new(test_config(), session);
        grand.set_filter(3, 50);
        transport.push_json(200, json!([{ "rank": 1, "viewer_id": 9 }]));

        grand.search_winning().await;

        assert_eq!(
            transport.urls(),
            vec!["http://api.test/api/grand/winning?group=3&limit=50"]
        );
        grand.state().with(|s| {
            assert_eq!(s.results.len(), 1);
            assert!(!s.loading);
        });
    }

    #[tokio::test]
    async fn failure_empties_results() {
        let (transport, _storage, session) = signed_in_harness("user");
        let grand = GrandQuery::new(test_config(), session);
        transport.push_json(200, json!([{ "rank": 1 }]));
        grand.search_winning().await;
        transport.push_transport_error("offline");

        grand.search_winning().await;

        grand.state().with(|s| {
            assert!(s.results.is_empty());
            assert_eq!(s.error, MSG_QUERY_FAILED);
        });
    }

    #[tokio::test]
    async fn unauthorized_signs_out() {
        let (transport, _storage, session) = signed_in_harness("user");
        let grand = GrandQuery::new(test_config(), session.clone());
        transport.push_json(401, json!({}));

        grand.search_winning().await;

        assert!(!session.is_logged_in());
        grand
            .state()
            .with(|s| assert_eq!(s.error, MSG_SESSION_EXPIRED));
    }
}
