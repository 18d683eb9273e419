//! # httpdriver
//!
//! A Chromium-style HTTP network transaction for Rust.
//!
//! `httpdriver` drives one HTTP(S) or WebSocket request to completion over
//! streams handed out by a pluggable stream factory. It never touches sockets
//! or parses bytes itself; it sequences calls into the collaborators that do.
//!
//! ## Features
//!
//! - **Resumable state machine**: the `DoLoop` of Chromium's `HttpNetworkTransaction`
//! - **Silent retries**: reused-socket races, early-data rejection, HTTP/2 and
//!   QUIC transient errors, bounded by a retry and restart budget
//! - **Authentication**: proxy and origin challenges, draining the body before
//!   reusing the connection for the authenticated retry
//! - **Client certificates**: certificate requests, signature-failure retry
//! - **Response edge cases**: 1xx and Early Hints, 408, 421 and 425 handling,
//!   content-encoding validation
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use httpdriver::base::priority::RequestPriority;
//! use httpdriver::http::{HttpNetworkSession, HttpNetworkTransaction, HttpRequestInfo};
//!
//! let session = HttpNetworkSession::builder(my_stream_factory).build();
//! let mut trans = HttpNetworkTransaction::new(RequestPriority::Medium, session);
//! trans.start(HttpRequestInfo::get("https://example.com/".parse()?)).await?;
//!
//! let mut buf = [0u8; 4096];
//! while trans.read(&mut buf).await? > 0 {}
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error codes, load states and flags, origin identity
//! - [`http`] - The transaction and its collaborator contracts
//! - [`proxy`] - Proxy chain and proxy decision value types
//! - [`ssl`] - TLS value types and the client-certificate store

pub mod base;
pub mod http;
pub mod proxy;
pub mod ssl;
