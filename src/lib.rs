//! # stacknet
//!
//! A pluggable HTTP transport layer with multipart/form-data encoding.
//!
//! `stacknet` separates *what* a request is from *how* it is sent. Callers
//! describe a [`LogicalRequest`](http::LogicalRequest); a
//! [`TransportAdapter`](transport::TransportAdapter) applies the body policy
//! for its method, merges headers and hands it to whichever
//! [`HttpTransport`](transport::HttpTransport) backend it was built with.
//!
//! ## Features
//!
//! - **Multipart**: RFC 7578 form encoding with collision-free boundaries
//! - **Body policy**: empty body for bare POST, PUT/PATCH without a body refused
//! - **Backends**: hyper-util client, or a scripted mock for tests
//! - **Cookies**: domain-keyed jar with JSON file persistence
//! - **Responses**: charset-aware text decoding and cache-header parsing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stacknet::config::TransportConfig;
//! use stacknet::http::{Form, LogicalRequest};
//! use stacknet::transport::TransportAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), stacknet::base::neterror::NetError> {
//!     let adapter = TransportAdapter::with_hyper(TransportConfig::default());
//!
//!     let form = Form::new()
//!         .text("name", "Alice")?
//!         .file("photo.jpg", "image/jpeg", std::fs::read("photo.jpg").unwrap())?
//!         .build()?;
//!
//!     let response = adapter
//!         .execute(LogicalRequest::post("http://example.com/upload")?.multipart(form))
//!         .await?;
//!     println!("Status: {}", response.status_code());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error type and request load states
//! - [`http`] - Requests, bodies, multipart, responses and retry
//! - [`transport`] - Backend trait, adapter, hyper and mock backends
//! - [`cookies`] - Cookie jar and persistence
//! - [`config`] - Timeouts, user agent and charset defaults

pub mod base;
pub mod config;
pub mod cookies;
pub mod http;
pub mod transport;
