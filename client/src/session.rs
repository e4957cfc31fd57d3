use std::rc::Rc;

use pcrdb_shared::{AccountStatus, AuthResponse, LoginRequest, MeResponse, RegisterRequest, Role};

use crate::config::{
    ClientConfig, SESSION_STORAGE_KEYS, STORAGE_KEY_ROLE, STORAGE_KEY_STATUS, STORAGE_KEY_TOKEN,
    STORAGE_KEY_USERNAME,
};
use crate::error::{ClientError, ClientResult, MSG_NETWORK};
use crate::http::{AuthFetch, HttpRequest, Transport};
use crate::storage::KeyValueStore;
use crate::store::{Store, SubscriptionId};

const MSG_LOGIN_FAILED: &str = "Login failed";
const MSG_REGISTER_FAILED: &str = "Registration failed";

/// Client-held identity. `loading` and `error` belong to the login/register form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub is_logged_in: bool,
    pub username: String,
    pub token: String,
    pub role: Role,
    pub status: AccountStatus,
    pub loading: bool,
    pub error: String,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.is_logged_in && self.role == Role::Admin
    }
}

/// Single session for the running client, mirrored field by field into local storage.
///
/// `login` and `register` set `loading` while in flight. There is no internal lock: the
/// caller keeps the trigger disabled while `loading` is true.
#[derive(Clone)]
pub struct SessionStore {
    state: Store<Session>,
    storage: Rc<dyn KeyValueStore>,
    transport: Rc<dyn Transport>,
    auth_fetch: AuthFetch,
    config: ClientConfig,
}

impl SessionStore {
    pub fn new(
        config: ClientConfig,
        transport: Rc<dyn Transport>,
        storage: Rc<dyn KeyValueStore>,
    ) -> Self {
        let state: Store<Session> = Store::default();
        let token_source = state.clone();
        let auth_fetch = AuthFetch::new(Rc::clone(&transport), move || {
            token_source.with(|session| session.token.clone())
        });
        Self {
            state,
            storage,
            transport,
            auth_fetch,
            config,
        }
    }

    pub fn state(&self) -> &Store<Session> {
        &self.state
    }

    pub fn snapshot(&self) -> Session {
        self.state.get()
    }

    pub fn subscribe(&self, listener: impl Fn(&Session) + 'static) -> SubscriptionId {
        self.state.subscribe(listener)
    }

    pub fn auth_fetch(&self) -> AuthFetch {
        self.auth_fetch.clone()
    }

    pub fn token(&self) -> String {
        self.state.with(|session| session.token.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.with(|session| session.is_logged_in)
    }

    pub fn is_admin(&self) -> bool {
        self.state.with(Session::is_admin)
    }

    pub async fn login(&self, login_id: &str, password: &str) -> ClientResult<()> {
        let body = LoginRequest {
            login_id: login_id.to_string(),
            password: password.to_string(),
        };
        let request = HttpRequest::post_json(self.config.api_url("/api/auth/login"), &body)?;
        self.authenticate(request, MSG_LOGIN_FAILED).await
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        contact_id: &str,
    ) -> ClientResult<()> {
        let body = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            qq_number: contact_id.to_string(),
        };
        let request = HttpRequest::post_json(self.config.api_url("/api/auth/register"), &body)?;
        self.authenticate(request, MSG_REGISTER_FAILED).await
    }

    async fn authenticate(&self, request: HttpRequest, fallback: &str) -> ClientResult<()> {
        self.state.update(|session| {
            session.loading = true;
            session.error.clear();
        });

        let outcome = self.exchange(request, fallback).await;

        match outcome {
            Ok(granted) => {
                self.persist(&granted);
                tracing::info!(
                    username = %granted.username,
                    role = granted.role.as_str(),
                    "signed in"
                );
                self.state.update(|session| {
                    session.is_logged_in = true;
                    session.username = granted.username;
                    session.token = granted.token;
                    session.role = granted.role;
                    session.status = granted.status;
                    session.loading = false;
                });
                Ok(())
            }
            Err(e) => {
                let message = match &e {
                    ClientError::Server(message) => message.clone(),
                    _ => MSG_NETWORK.to_string(),
                };
                self.state.update(|session| {
                    session.error = message;
                    session.loading = false;
                });
                Err(e)
            }
        }
    }

    async fn exchange(&self, request: HttpRequest, fallback: &str) -> ClientResult<Grant> {
        let resp = self.transport.send(request).await?;
        let body: AuthResponse = resp.json()?;
        if !body.success {
            return Err(ClientError::Server(
                body.error.unwrap_or_else(|| fallback.to_string()),
            ));
        }
        let (Some(token), Some(username)) = (body.token, body.username) else {
            return Err(ClientError::Decode("auth response missing token or username".into()));
        };
        Ok(Grant {
            token,
            username,
            role: body.role.unwrap_or_default(),
            status: body.status.unwrap_or(AccountStatus::Active),
        })
    }

    fn persist(&self, grant: &Grant) {
        self.storage.set(STORAGE_KEY_TOKEN, &grant.token);
        self.storage.set(STORAGE_KEY_USERNAME, &grant.username);
        self.storage.set(STORAGE_KEY_ROLE, grant.role.as_str());
        self.storage.set(STORAGE_KEY_STATUS, grant.status.as_str());
    }

    /// Drop the session locally. Never touches the network.
    pub fn logout(&self) {
        for key in SESSION_STORAGE_KEYS {
            self.storage.remove(key);
        }
        self.state.update(|session| *session = Session::default());
        tracing::info!("signed out");
    }

    /// Restore a persisted session. Returns true when the client is now logged in.
    ///
    /// This never touches the network. Callers must follow a `true` result with
    /// `refresh_status`, in the background at startup (`App::init` spawns it) or awaited
    /// in one-shot tools, so a revoked token or changed role is picked up.
    pub fn restore_from_storage(&self) -> bool {
        let token = self.storage.get(STORAGE_KEY_TOKEN).filter(|v| !v.is_empty());
        let username = self.storage.get(STORAGE_KEY_USERNAME).filter(|v| !v.is_empty());
        let (Some(token), Some(username)) = (token, username) else {
            return false;
        };
        let role = self
            .storage
            .get(STORAGE_KEY_ROLE)
            .map(|value| Role::parse(&value))
            .unwrap_or_default();
        let status = self
            .storage
            .get(STORAGE_KEY_STATUS)
            .map(|value| AccountStatus::parse(&value))
            .unwrap_or(AccountStatus::Active);

        self.state.update(|session| {
            session.is_logged_in = true;
            session.token = token;
            session.username = username;
            session.role = role;
            session.status = status;
        });
        true
    }

    /// Re-read role and status from `/api/auth/me`. Failures are logged, never returned.
    pub async fn refresh_status(&self) {
        let token = self.token();
        if token.is_empty() {
            return;
        }

        let result = async {
            let resp = self
                .auth_fetch
                .send(HttpRequest::get(self.config.api_url("/api/auth/me")))
                .await?;
            resp.authorized_json::<MeResponse>()
        }
        .await;

        // A login or logout while the request was in flight wins.
        if self.token() != token {
            tracing::debug!("discarding status refresh for a replaced session");
            return;
        }

        match result {
            Ok(me) => {
                if me.username.is_none() {
                    return;
                }
                let (role, status) = self.state.update(|session| {
                    session.role = me.role.unwrap_or(session.role);
                    session.status = me.status.unwrap_or(session.status);
                    (session.role, session.status)
                });
                self.storage.set(STORAGE_KEY_ROLE, role.as_str());
                self.storage.set(STORAGE_KEY_STATUS, status.as_str());
            }
            Err(ClientError::Unauthorized) => {
                tracing::warn!("stored token rejected; signing out");
                self.logout();
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to refresh account status");
            }
        }
    }
}

struct Grant {
    token: String,
    username: String,
    role: Role,
    status: AccountStatus,
}
