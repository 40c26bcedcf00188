//! Typed JSON client for the wallet API.
//!
//! # Design
//! `OrcaFetcher` carries no mutable state between calls. Each call is split
//! into `build_request`, which shapes an `HttpRequest`, one
//! `Transport::execute`, and `parse_response`, which decodes the body. The
//! two halves are public so request shaping can be checked without a server.
//!
//! Shaping rules applied to every request:
//! - credentials are always included;
//! - a body is serialized only when one is given (`Some`), whatever its
//!   JSON value;
//! - `Content-Type: application/json` is the default, and a caller header
//!   with the same name (any case) replaces it.
//!
//! Responses are always parsed as JSON. The `unwrap` flag decides whether
//! the body is decoded as a `ResponseBody<R>` envelope or as a bare `R`.
//! Neither the HTTP status nor the envelope's `success` flag is inspected:
//! there is no retry, no timeout, and no error mapping beyond transport and
//! decode failures.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::SharedConfig;
use crate::error::{FetchError, TransportError};
use crate::http::{Credentials, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::ResponseBody;

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";
const COOKIE: &str = "Cookie";

/// Full per-call request descriptor for `OrcaFetcher::fetch`.
///
/// `body: None` sends no body at all. `Some(value)` is always serialized,
/// even when `value` is JSON `null`, `0`, `""` or `false`. A caller `Cookie`
/// header is dropped. Redirects follow the transport's default policy.
#[derive(Debug, Clone)]
pub struct FetchOptions<B = serde_json::Value> {
    pub method: HttpMethod,
    pub body: Option<B>,
    pub headers: Vec<(String, String)>,
    /// Decode the response as a `ResponseBody` envelope (default) or as the
    /// bare payload.
    pub unwrap: bool,
    /// Cancels the round trip when triggered.
    pub signal: Option<CancellationToken>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::new(HttpMethod::Get)
    }
}

impl FetchOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
            unwrap: true,
            signal: None,
        }
    }
}

impl<B> FetchOptions<B> {
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Replace the body, changing its type.
    pub fn with_body<C>(self, body: C) -> FetchOptions<C> {
        FetchOptions {
            method: self.method,
            body: Some(body),
            headers: self.headers,
            unwrap: self.unwrap,
            signal: self.signal,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_unwrap(mut self, unwrap: bool) -> Self {
        self.unwrap = unwrap;
        self
    }

    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Overrides accepted by the verb helpers.
///
/// No method, body or credentials field: the verb fixes the method, the
/// body is a separate argument (absent for `get`/`delete`), and credentials
/// are always included.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub signal: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    fn into_fetch<B>(self, method: HttpMethod, body: Option<B>) -> FetchOptions<B> {
        FetchOptions {
            method,
            body,
            headers: self.headers,
            unwrap: true,
            signal: self.signal,
        }
    }
}

/// A decoded response, tagged with the shape it was decoded as.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<R> {
    Wrapped(ResponseBody<R>),
    Raw(R),
}

impl<R> Fetched<R> {
    pub fn is_wrapped(&self) -> bool {
        matches!(self, Fetched::Wrapped(_))
    }

    /// The envelope, or `UnwrapMismatch` if this was fetched raw.
    pub fn into_wrapped(self) -> Result<ResponseBody<R>, FetchError> {
        match self {
            Fetched::Wrapped(body) => Ok(body),
            Fetched::Raw(_) => Err(FetchError::UnwrapMismatch {
                expected: "wrapped",
                actual: "raw",
            }),
        }
    }

    /// The bare payload, or `UnwrapMismatch` if this was fetched wrapped.
    pub fn into_raw(self) -> Result<R, FetchError> {
        match self {
            Fetched::Raw(value) => Ok(value),
            Fetched::Wrapped(_) => Err(FetchError::UnwrapMismatch {
                expected: "raw",
                actual: "wrapped",
            }),
        }
    }
}

/// Stateless typed client.
///
/// Relative URLs are resolved against `base_url`, the way a browser
/// resolves them against the page origin; absolute `http(s)://` URLs are
/// used as given.
#[derive(Debug, Clone)]
pub struct OrcaFetcher<T = ReqwestTransport> {
    base_url: String,
    transport: T,
    config: Arc<SharedConfig>,
}

impl OrcaFetcher<ReqwestTransport> {
    /// Client over a fresh `ReqwestTransport` with the default configuration.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(
            base_url,
            transport,
            Arc::new(SharedConfig::default()),
        ))
    }
}

impl<T: Transport> OrcaFetcher<T> {
    pub fn with_transport(base_url: &str, transport: T, config: Arc<SharedConfig>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            config,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            format!("{}/{url}", self.base_url)
        }
    }

    /// Absolute URL of a versioned API route, e.g. `wallets` becomes
    /// `<base>/api/v1/wallets`.
    pub fn endpoint(&self, path: &str) -> String {
        self.resolve_url(&self.config.api_path(path))
    }

    /// Shape the outgoing request for `url` without sending it.
    pub fn build_request<B>(
        &self,
        url: &str,
        options: &FetchOptions<B>,
    ) -> Result<HttpRequest, FetchError>
    where
        B: Serialize,
    {
        let body = match &options.body {
            Some(body) => Some(serde_json::to_string(body).map_err(FetchError::Serialize)?),
            None => None,
        };

        // Credentials are always included, so the cookie store owns `Cookie`.
        let mut headers = vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())];
        for (name, value) in &options.headers {
            if name.eq_ignore_ascii_case(COOKIE) {
                debug!(header = %name, "dropping caller cookie header");
                continue;
            }
            merge_header(&mut headers, name, value);
        }

        Ok(HttpRequest {
            method: options.method,
            url: self.resolve_url(url),
            headers,
            body,
            credentials: Credentials::Include,
        })
    }

    /// Decode a response body as an envelope (`unwrap`) or as a bare `R`.
    pub fn parse_response<R>(
        &self,
        response: HttpResponse,
        unwrap: bool,
    ) -> Result<Fetched<R>, FetchError>
    where
        R: DeserializeOwned,
    {
        let fetched = if unwrap {
            serde_json::from_str::<ResponseBody<R>>(&response.body).map(Fetched::Wrapped)
        } else {
            serde_json::from_str::<R>(&response.body).map(Fetched::Raw)
        };
        fetched.map_err(FetchError::Decode)
    }

    /// Perform one round trip, decoding according to `options.unwrap`.
    pub async fn fetch<R, B>(
        &self,
        url: &str,
        options: FetchOptions<B>,
    ) -> Result<Fetched<R>, FetchError>
    where
        R: DeserializeOwned,
        B: Serialize,
    {
        let request = self.build_request(url, &options)?;
        let method = request.method;
        let url = request.url.clone();
        debug!(%method, %url, has_body = request.body.is_some(), "sending request");

        let response = match options.signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.cancelled() => {
                    debug!(%method, %url, "request aborted");
                    return Err(TransportError::Aborted.into());
                }
                result = self.transport.execute(request) => result?,
            },
            None => self.transport.execute(request).await?,
        };

        debug!(%method, %url, status = response.status, "received response");
        self.parse_response(response, options.unwrap)
    }

    /// `fetch` with `unwrap` forced on.
    pub async fn fetch_wrapped<R, B>(
        &self,
        url: &str,
        options: FetchOptions<B>,
    ) -> Result<ResponseBody<R>, FetchError>
    where
        R: DeserializeOwned,
        B: Serialize,
    {
        self.fetch(url, options.with_unwrap(true))
            .await?
            .into_wrapped()
    }

    /// `fetch` with `unwrap` forced off.
    pub async fn fetch_raw<R, B>(&self, url: &str, options: FetchOptions<B>) -> Result<R, FetchError>
    where
        R: DeserializeOwned,
        B: Serialize,
    {
        self.fetch(url, options.with_unwrap(false)).await?.into_raw()
    }

    pub async fn get<R>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody<R>, FetchError>
    where
        R: DeserializeOwned,
    {
        self.fetch_wrapped(url, options.into_fetch::<()>(HttpMethod::Get, None))
            .await
    }

    pub async fn post<R, B>(
        &self,
        url: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<ResponseBody<R>, FetchError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.fetch_wrapped(url, options.into_fetch(HttpMethod::Post, body))
            .await
    }

    pub async fn put<R, B>(
        &self,
        url: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<ResponseBody<R>, FetchError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.fetch_wrapped(url, options.into_fetch(HttpMethod::Put, body))
            .await
    }

    pub async fn patch<R, B>(
        &self,
        url: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<ResponseBody<R>, FetchError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.fetch_wrapped(url, options.into_fetch(HttpMethod::Patch, body))
            .await
    }

    pub async fn delete<R>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody<R>, FetchError>
    where
        R: DeserializeOwned,
    {
        self.fetch_wrapped(url, options.into_fetch::<()>(HttpMethod::Delete, None))
            .await
    }
}

/// Set `name` to `value`, replacing an existing header of the same name.
fn merge_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(existing) => *existing = (name.to_string(), value.to_string()),
        None => headers.push((name.to_string(), value.to_string())),
    }
}
