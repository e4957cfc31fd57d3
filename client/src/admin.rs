//! Account administration.
//!
//! Every call checks for the admin role before sending. That check only keeps the UI from
//! issuing requests that are bound to fail; the backend enforces authorization itself.

use pcrdb_shared::ActionResponse;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::HttpRequest;
use crate::query::{QueryState, fetch_authorized, run_query};
use crate::session::SessionStore;
use crate::store::{Generation, Store};
use crate::time_format::format_date_time;

const MSG_ADMIN_ONLY: &str = "Administrator role required";
const MSG_ACTION_FAILED: &str = "Operation failed";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminState {
    pub loading: bool,
    pub error: String,
    pub users: Vec<Value>,
    pub api_stats: Vec<Value>,
    pub api_detail: Option<Value>,
}

impl QueryState for AdminState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_error(&mut self, error: String) {
        self.error = error;
    }
}

#[derive(Clone)]
pub struct AdminPanel {
    state: Store<AdminState>,
    session: SessionStore,
    config: ClientConfig,
    generation: Generation,
}

impl AdminPanel {
    pub fn new(config: ClientConfig, session: SessionStore) -> Self {
        Self {
            state: Store::default(),
            session,
            config,
            generation: Generation::default(),
        }
    }

    pub fn state(&self) -> &Store<AdminState> {
        &self.state
    }

    fn ensure_admin(&self) -> ClientResult<()> {
        if self.session.is_admin() {
            Ok(())
        } else {
            Err(ClientError::Validation(MSG_ADMIN_ONLY.into()))
        }
    }

    pub async fn load_users(&self) {
        if self.ensure_admin().is_err() {
            return;
        }
        let url = self.config.api_url("/api/admin/users");
        run_query(
            &self.state,
            &self.generation,
            |_| {},
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, body| {
                if let Some(Value::Array(users)) = body.get("users") {
                    s.users = users.clone();
                }
            },
        )
        .await;
    }

    /// Approve a pending account, then reload the user list.
    pub async fn approve_user(&self, user_id: i64) -> ClientResult<()> {
        self.ensure_admin()?;
        let url = self.config.api_url(&format!("/api/admin/approve/{user_id}"));

        self.state.update(|s| {
            s.loading = true;
            s.error.clear();
        });
        let outcome = async {
            let body = fetch_authorized(&self.session, HttpRequest::post(url)).await?;
            let action: ActionResponse =
                serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
            if action.success {
                Ok(())
            } else {
                Err(ClientError::Server(
                    action.error.unwrap_or_else(|| MSG_ACTION_FAILED.to_string()),
                ))
            }
        }
        .await;

        self.state.update(|s| {
            s.loading = false;
            if let Err(e) = &outcome {
                s.error = match e {
                    ClientError::Server(message) => message.clone(),
                    ClientError::Unauthorized => e.user_message(),
                    _ => MSG_ACTION_FAILED.to_string(),
                };
            }
        });

        if outcome.is_ok() {
            tracing::info!(user_id, "account approved");
            self.load_users().await;
        }
        outcome
    }

    /// Per-user call totals. Accepts a bare array or `{stats: [...]}`.
    pub async fn load_api_stats(&self) {
        if self.ensure_admin().is_err() {
            return;
        }
        let url = self.config.api_url("/api/admin/api_stats");
        run_query(
            &self.state,
            &self.generation,
            |_| {},
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, body| {
                s.api_stats = match body {
                    Value::Array(rows) => rows,
                    Value::Object(mut obj) => match obj.remove("stats") {
                        Some(Value::Array(rows)) => rows,
                        _ => Vec::new(),
                    },
                    _ => Vec::new(),
                };
            },
        )
        .await;
    }

    /// Call log for one user.
    pub async fn load_api_stats_for(&self, user_id: i64) {
        if self.ensure_admin().is_err() {
            return;
        }
        let url = self.config.api_url(&format!("/api/admin/api_stats/{user_id}"));
        run_query(
            &self.state,
            &self.generation,
            |s| s.api_detail = None,
            fetch_authorized(&self.session, HttpRequest::get(url)),
            |s, body| s.api_detail = Some(body),
        )
        .await;
    }

    pub fn api_call_count(&self, user_id: i64) -> i64 {
        self.state.with(|s| {
            find_stat(&s.api_stats, user_id)
                .and_then(|stat| stat.get("total_calls"))
                .and_then(Value::as_i64)
                .unwrap_or(0)
        })
    }

    pub fn last_call_time(&self, user_id: i64) -> String {
        self.state.with(|s| {
            find_stat(&s.api_stats, user_id)
                .and_then(|stat| stat.get("last_call_at"))
                .and_then(Value::as_str)
                .filter(|raw| !raw.is_empty())
                .map(format_date_time)
                .unwrap_or_else(|| "-".to_string())
        })
    }
}

fn find_stat(stats: &[Value], user_id: i64) -> Option<&Value> {
    stats
        .iter()
        .find(|stat| stat.get("user_id").and_then(Value::as_i64) == Some(user_id))
}
