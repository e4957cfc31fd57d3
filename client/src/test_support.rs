use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;

use crate::config::{ClientConfig, STORAGE_KEY_ROLE, STORAGE_KEY_TOKEN, STORAGE_KEY_USERNAME};
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::session::SessionStore;
use crate::storage::{KeyValueStore, MemoryStore};

pub fn test_config() -> ClientConfig {
    ClientConfig {
        api_base: "http://api.test".into(),
        battle_api_base: "http://battle.test".into(),
    }
}

pub fn session_harness() -> (Rc<MockTransport>, Rc<MemoryStore>, SessionStore) {
    let transport = Rc::new(MockTransport::new());
    let storage = Rc::new(MemoryStore::new());
    let session = SessionStore::new(test_config(), transport.clone(), storage.clone());
    (transport, storage, session)
}

/// Session restored from storage as `role`, without any request on the transport.
pub fn signed_in_harness(role: &str) -> (Rc<MockTransport>, Rc<MemoryStore>, SessionStore) {
    let (transport, storage, session) = session_harness();
    storage.set(STORAGE_KEY_TOKEN, "tok");
    storage.set(STORAGE_KEY_USERNAME, "kokkoro");
    storage.set(STORAGE_KEY_ROLE, role);
    session.restore_from_storage();
    (transport, storage, session)
}

enum Scripted {
    Ready(ClientResult<HttpResponse>),
    Pending(oneshot::Receiver<ClientResult<HttpResponse>>),
}

/// Replays queued responses in order and records every request it was handed.
#[derive(Default)]
pub struct MockTransport {
    script: RefCell<VecDeque<Scripted>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.script
            .borrow_mut()
            .push_back(Scripted::Ready(Ok(HttpResponse::new(status, body.to_string()))));
    }

    pub fn push_transport_error(&self, message: &str) {
        self.script
            .borrow_mut()
            .push_back(Scripted::Ready(Err(ClientError::Transport(message.into()))));
    }

    /// Queue a response that resolves only once the returned sender fires.
    pub fn push_pending(&self) -> oneshot::Sender<ClientResult<HttpResponse>> {
        let (tx, rx) = oneshot::channel();
        self.script.borrow_mut().push_back(Scripted::Pending(rx));
        tx
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.clone()).collect()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, ClientResult<HttpResponse>> {
        self.requests.borrow_mut().push(request);
        let next = self.script.borrow_mut().pop_front();
        async move {
            match next {
                Some(Scripted::Ready(result)) => result,
                Some(Scripted::Pending(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err(ClientError::Transport("dropped".into()))),
                None => Err(ClientError::Transport("no scripted response".into())),
            }
        }
        .boxed_local()
    }
}
