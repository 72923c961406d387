//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestClient, TestServer, AGENT_ID};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_engine_starts() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.start_engine(AGENT_ID, "support-agent").await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod backend;
mod client;
mod constants;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use backend::{message, ticket, FakeBackend};
pub use client::TestClient;
pub use constants::*;
#[allow(unused_imports)]
pub use server::{fast_polling_settings, wait_until, TestServer};
