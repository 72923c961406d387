//! HTTP client for the ticketing backend.

use async_trait::async_trait;
use anyhow::{bail, Context};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::models::{decode_tickets, Ticket, TicketPatch, TicketQuery};
use super::source::{FetchError, TicketSource};
use crate::user::{User, Viewer};

/// Client for the ticket/user REST API.
#[derive(Clone)]
pub struct TicketApiClient {
    client: Client,
    base_url: String,
    tickets_url: Url,
    api_token: Option<String>,
}

/// Body of `PUT /tickets/:id`: the patch plus the acting user.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTicketBody<'a> {
    #[serde(flatten)]
    patch: &'a TicketPatch,
    user_id: &'a str,
    user_name: &'a str,
}

impl TicketApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the API (e.g., "http://localhost:5000/api")
    /// * `timeout_secs` - Request timeout in seconds
    /// * `api_token` - Optional bearer token sent with every request
    pub fn new(
        base_url: String,
        timeout_secs: u64,
        api_token: Option<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let tickets_url = Url::parse(&format!("{}/tickets", base_url))
            .with_context(|| format!("Invalid ticketing API URL: {}", base_url))?;
        if tickets_url.cannot_be_a_base() {
            bail!("Ticketing API URL cannot hold a path: {}", base_url);
        }

        Ok(Self {
            client,
            base_url,
            tickets_url,
            api_token,
        })
    }

    /// `{base}/tickets/{id}` with `id` encoded as a single path segment.
    fn ticket_url(&self, id: &str) -> Url {
        let mut url = self.tickets_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id);
        }
        url
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Builds the query string parameters for `GET /tickets`.
pub fn ticket_query_params(query: &TicketQuery, viewer: Option<&Viewer>) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(viewer) = viewer {
        params.push(("userId", viewer.id.clone()));
        params.push(("userRole", viewer.role.as_str().to_string()));
    }
    if let Some(status) = query.status {
        params.push(("status", status.as_str().to_string()));
    }
    if let Some(priority) = query.priority {
        params.push(("priority", priority.as_str().to_string()));
    }
    if let Some(category) = &query.category {
        params.push(("category", category.clone()));
    }
    if let Some(search) = &query.search {
        params.push(("search", search.clone()));
    }
    params
}

#[async_trait]
impl TicketSource for TicketApiClient {
    async fn get_tickets(
        &self,
        query: &TicketQuery,
        viewer: Option<&Viewer>,
    ) -> Result<Vec<Ticket>, FetchError> {
        let url = self.tickets_url.clone();
        let params = ticket_query_params(query, viewer);
        debug!("GET {} ({} params)", url, params.len());

        let response = self
            .authorize(self.client.get(url).query(&params))
            .send()
            .await?;
        let values: Vec<Value> = Self::decode(response).await?;
        Ok(decode_tickets(values))
    }

    async fn get_ticket(&self, id: &str) -> Result<Ticket, FetchError> {
        let url = self.ticket_url(id);
        let response = self.authorize(self.client.get(url)).send().await?;
        Self::decode(response).await
    }

    async fn update_ticket(
        &self,
        id: &str,
        patch: &TicketPatch,
        actor_id: &str,
        actor_name: &str,
    ) -> Result<Ticket, FetchError> {
        let url = self.ticket_url(id);
        let body = UpdateTicketBody {
            patch,
            user_id: actor_id,
            user_name: actor_name,
        };
        let response = self
            .authorize(self.client.put(url).json(&body))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn create_ticket(&self, patch: &TicketPatch) -> Result<Ticket, FetchError> {
        let url = self.tickets_url.clone();
        let response = self
            .authorize(self.client.post(url).json(patch))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_users(&self) -> Result<Vec<User>, FetchError> {
        let url = format!("{}/users", self.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::decode(response).await
    }
}
