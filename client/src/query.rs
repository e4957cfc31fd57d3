use std::future::Future;

use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::http::HttpRequest;
use crate::session::SessionStore;
use crate::store::{Generation, Store};

/// Module state that carries the shared `loading` / `error` pair.
pub trait QueryState {
    fn set_loading(&mut self, loading: bool);
    fn set_error(&mut self, error: String);
}

/// Send through the authenticated wrapper. A 401 signs the session out before
/// surfacing as `Unauthorized`.
pub async fn fetch_authorized(session: &SessionStore, request: HttpRequest) -> ClientResult<Value> {
    let resp = session.auth_fetch().send(request).await?;
    if resp.is_unauthorized() {
        tracing::warn!("backend rejected token; signing out");
        session.logout();
        return Err(ClientError::Unauthorized);
    }
    resp.json()
}

/// Turn a body carrying an `error` field into `ClientError::Server`.
pub fn reject_embedded_error(body: Value) -> ClientResult<Value> {
    match body.get("error") {
        None | Some(Value::Null) => Ok(body),
        Some(Value::String(message)) => Err(ClientError::Server(message.clone())),
        Some(other) => Err(ClientError::Server(other.to_string())),
    }
}

/// The uniform search flow: mark loading and reset, await the request, then apply the
/// result or record the error. Returns false when a newer request superseded this one,
/// in which case the state is left to the newer request.
pub async fn run_query<S, R>(
    state: &Store<S>,
    generation: &Generation,
    reset: impl FnOnce(&mut S),
    request: R,
    apply: impl FnOnce(&mut S, Value),
) -> bool
where
    S: QueryState + Clone,
    R: Future<Output = ClientResult<Value>>,
{
    let ticket = generation.next();
    state.update(|s| {
        s.set_loading(true);
        s.set_error(String::new());
        reset(s);
    });

    let result = request.await.and_then(reject_embedded_error);

    if !generation.is_current(ticket) {
        tracing::debug!(ticket, "discarding superseded response");
        return false;
    }

    state.update(|s| {
        match result {
            Ok(body) => apply(s, body),
            Err(e) => {
                if !matches!(e, ClientError::Unauthorized | ClientError::Server(_)) {
                    tracing::warn!(error = %e, "query failed");
                }
                s.set_error(e.user_message());
            }
        }
        s.set_loading(false);
    });
    true
}

pub fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
