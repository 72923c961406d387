//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per local API route.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn post(&self, path: &str) -> Response {
        self.client
            .post(self.url(path))
            .send()
            .await
            .expect("POST request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    // ========================================================================
    // Home
    // ========================================================================

    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub async fn get_notifications(&self) -> Response {
        self.get("/v1/notifications").await
    }

    pub async fn get_unread_count(&self) -> Response {
        self.get("/v1/notifications/unread-count").await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Response {
        self.post(&format!("/v1/notifications/{}/read", id)).await
    }

    pub async fn mark_all_notifications_read(&self) -> Response {
        self.post("/v1/notifications/read-all").await
    }

    pub async fn clear_notifications(&self) -> Response {
        self.post("/v1/notifications/clear").await
    }

    // ========================================================================
    // Toasts
    // ========================================================================

    pub async fn get_toasts(&self) -> Response {
        self.get("/v1/toasts").await
    }

    pub async fn remove_toast(&self, id: &str) -> Response {
        self.delete(&format!("/v1/toasts/{}", id)).await
    }

    pub async fn clear_toasts(&self) -> Response {
        self.delete("/v1/toasts").await
    }

    // ========================================================================
    // Engine
    // ========================================================================

    pub async fn get_engine_status(&self) -> Response {
        self.get("/v1/engine").await
    }

    pub async fn start_engine(&self, viewer_id: &str, role: &str) -> Response {
        self.client
            .post(self.url("/v1/engine/start"))
            .json(&json!({ "id": viewer_id, "role": role }))
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn stop_engine(&self) -> Response {
        self.post("/v1/engine/stop").await
    }
}
