use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};

pub const STATUS_UNAUTHORIZED: u16 = 401;
const AUTHORIZATION: &str = "Authorization";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    pub fn post_json<T: Serialize>(url: impl Into<String>, body: &T) -> ClientResult<Self> {
        let body = serde_json::to_string(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(Self::post(url)
            .header("Content-Type", "application/json")
            .with_body(body))
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == STATUS_UNAUTHORIZED
    }

    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| ClientError::Decode(format!("HTTP {}: {e}", self.status)))
    }

    /// Map 401 to `Unauthorized`, otherwise decode the body.
    pub fn authorized_json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        if self.is_unauthorized() {
            return Err(ClientError::Unauthorized);
        }
        self.json()
    }
}

/// One HTTP round trip. Implementations make a single attempt and report failures to
/// reach the server as `ClientError::Transport`; every HTTP status is a response.
pub trait Transport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, ClientResult<HttpResponse>>;
}

/// Decorates a transport with `Authorization: Bearer <token>`.
///
/// The token is read through the accessor on every call, so a login or logout between
/// calls is picked up without rebuilding the wrapper. A caller-supplied `Authorization`
/// header is dropped; the injected one is always last. 401s are returned as ordinary
/// responses for the call site to act on.
#[derive(Clone)]
pub struct AuthFetch {
    transport: Rc<dyn Transport>,
    token: Rc<dyn Fn() -> String>,
}

impl AuthFetch {
    pub fn new(transport: Rc<dyn Transport>, token: impl Fn() -> String + 'static) -> Self {
        Self {
            transport,
            token: Rc::new(token),
        }
    }

    pub fn authorize(&self, mut request: HttpRequest) -> HttpRequest {
        request
            .headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION));
        request
            .headers
            .push((AUTHORIZATION.to_string(), format!("Bearer {}", (self.token)())));
        request
    }

    pub async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        self.transport.send(self.authorize(request)).await
    }
}

/// `?a=1&b=x` builder; values are percent-encoded like `encodeURIComponent`.
#[derive(Debug, Default)]
pub struct Query {
    pairs: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs
            .push(format!("{key}={}", urlencoding::encode(&value.to_string())));
        self
    }

    pub fn param_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn apply(&self, url: &str) -> String {
        if self.pairs.is_empty() {
            url.to_string()
        } else {
            format!("{url}?{}", self.pairs.join("&"))
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::GlooTransport;

#[cfg(target_arch = "wasm32")]
mod browser {
    use futures::FutureExt;
    use futures::future::LocalBoxFuture;
    use gloo_net::http::Request;

    use super::{HttpRequest, HttpResponse, Method, Transport};
    use crate::error::{ClientError, ClientResult};

    /// `fetch` via gloo-net.
    #[derive(Clone, Copy, Default)]
    pub struct GlooTransport;

    impl Transport for GlooTransport {
        fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, ClientResult<HttpResponse>> {
            async move {
                let mut builder = match request.method {
                    Method::Get => Request::get(&request.url),
                    Method::Post => Request::post(&request.url),
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                let prepared = match request.body {
                    Some(body) => builder.body(body),
                    None => builder.build(),
                }
                .map_err(|e| ClientError::Transport(format!("request build error: {e}")))?;

                let resp = prepared
                    .send()
                    .await
                    .map_err(|e| ClientError::Transport(format!("fetch error: {e}")))?;
                let status = resp.status();
                let body = resp
                    .text()
                    .await
                    .map_err(|e| ClientError::Transport(format!("body read error: {e}")))?;
                Ok(HttpResponse { status, body })
            }
            .boxed_local()
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::ReqwestTransport;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use futures::FutureExt;
    use futures::future::LocalBoxFuture;

    use super::{HttpRequest, HttpResponse, Method, Transport};
    use crate::error::{ClientError, ClientResult};

    #[derive(Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl Transport for ReqwestTransport {
        fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, ClientResult<HttpResponse>> {
            async move {
                let method = match request.method {
                    Method::Get => reqwest::Method::GET,
                    Method::Post => reqwest::Method::POST,
                };
                let mut builder = self.client.request(method, &request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                if let Some(body) = request.body {
                    builder = builder.body(body);
                }

                let resp = builder
                    .send()
                    .await
                    .map_err(|e| ClientError::Transport(format!("fetch error: {e}")))?;
                let status = resp.status().as_u16();
                let body = resp
                    .text()
                    .await
                    .map_err(|e| ClientError::Transport(format!("body read error: {e}")))?;
                Ok(HttpResponse { status, body })
            }
            .boxed_local()
        }
    }
}
