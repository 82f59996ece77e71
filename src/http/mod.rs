//! HTTP client module with explicit redirect handling.

mod client;

pub use client::{CONNECT_TIMEOUT_SECS, HttpClient, MAX_REDIRECTS, READ_TIMEOUT_SECS};
