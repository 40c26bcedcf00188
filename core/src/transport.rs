//! The network seam between `OrcaFetcher` and the HTTP stack.
//!
//! # Design
//! `Transport` takes a fully shaped `HttpRequest` and performs exactly one
//! round trip. It never interprets status codes: a 500 with a JSON body is a
//! successful execution as far as the transport is concerned.
//!
//! `ReqwestTransport` always attaches its cookie jar, which is how
//! `Credentials::Include` is honoured outside a browser. Idle connection
//! pooling is switched off so the jar is the only state that outlives a call.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;

use crate::error::TransportError;
use crate::http::{Credentials, HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}

/// `Transport` backed by [`reqwest`] with a persistent cookie jar.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    cookies: Arc<Jar>,
}

impl ReqwestTransport {
    /// Create a transport with an empty cookie jar.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_cookie_jar(Arc::new(Jar::default()))
    }

    /// Create a transport that reads and stores cookies in `cookies`.
    ///
    /// Several transports may share one jar so a session cookie set through
    /// one of them is sent by all of them.
    pub fn with_cookie_jar(cookies: Arc<Jar>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self { client, cookies })
    }

    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.cookies
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        // reqwest skips the jar when a `Cookie` header is already set.
        let jar_owns_cookies = match request.credentials {
            Credentials::Include => true,
        };

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            if jar_owns_cookies && name.eq_ignore_ascii_case(reqwest::header::COOKIE.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
