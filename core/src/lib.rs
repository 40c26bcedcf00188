//! Shared contracts and typed HTTP client for the Orca wallet services.
//!
//! # Overview
//! - [`OrcaFetcher`] sends JSON requests with session cookies attached and
//!   decodes either the standard [`ResponseBody`] envelope or a bare payload.
//! - [`types`] holds the records exchanged with the API (users, wallets,
//!   transactions, balances, auth state, forms).
//! - [`SharedConfig`] carries the process-wide constants: API version,
//!   compatibility header, auth cookie name, networks and token icons.
//! - [`env`] reads required and optional settings at startup.
//!
//! # Design
//! - The client is stateless and split into `build_request` / one
//!   `Transport::execute` / `parse_response`, so request shaping is testable
//!   without a server.
//! - Transport and decode failures are surfaced unchanged. An envelope with
//!   `success: false` is returned as ordinary data.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::{FetchOptions, Fetched, OrcaFetcher, RequestOptions};
pub use config::{Compatibility, Network, SharedConfig, TokenIcon};
pub use error::{ConfigError, FetchError, TransportError};
pub use http::{Credentials, HttpMethod, HttpRequest, HttpResponse};
pub use transport::{ReqwestTransport, Transport};
pub use types::ResponseBody;
