//! Ticket data models as served by the ticketing backend.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
    #[serde(other)]
    Unknown,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
            TicketStatus::Unknown => "unknown",
        }
    }
}

impl Default for TicketStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }
}

/// A single entry of a ticket's conversation thread.
///
/// Every field is optional on the wire; nulls and values of the wrong type
/// decode as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
    #[serde(default, deserialize_with = "deserialize_customer_ref")]
    pub user_id: String,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub message: String,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub is_internal: bool,
}

/// A support ticket.
///
/// Decoding is lenient: only an id (`id` or `_id`) is required. Every other
/// field that is missing, null or malformed falls back to an empty/absent
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTicket")]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub customer_id: String,
    pub messages: Vec<TicketMessage>,
}

impl Ticket {
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn last_message(&self) -> Option<&TicketMessage> {
        self.messages.last()
    }
}

/// Query filters accepted by `GET /tickets`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl TicketQuery {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.search.is_none()
    }
}

/// Partial ticket body used for create and update calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<TicketMessage>>,
}

// Wire shape of a ticket. Mongo-style bodies may carry both `id` and `_id`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicket {
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<String>,
    #[serde(default, rename = "_id", deserialize_with = "lenient_id")]
    mongo_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    status: Option<TicketStatus>,
    #[serde(default, deserialize_with = "lenient")]
    priority: Option<TicketPriority>,
    #[serde(default, deserialize_with = "lenient")]
    category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_user_ref")]
    assigned_to: Option<String>,
    #[serde(default, deserialize_with = "deserialize_customer_ref")]
    customer_id: String,
    #[serde(default, deserialize_with = "deserialize_messages")]
    messages: Vec<TicketMessage>,
}

impl TryFrom<RawTicket> for Ticket {
    type Error = String;

    fn try_from(raw: RawTicket) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .or(raw.mongo_id)
            .ok_or_else(|| "ticket has no id".to_string())?;
        Ok(Ticket {
            id,
            title: raw.title.unwrap_or_default(),
            status: raw.status.unwrap_or_default(),
            priority: raw.priority,
            category: raw.category,
            assigned_to: raw.assigned_to,
            customer_id: raw.customer_id,
            messages: raw.messages,
        })
    }
}

/// Decode a fetched ticket list entry by entry.
///
/// Entries that cannot be decoded at all (not an object, no id) are logged
/// and skipped.
pub fn decode_tickets(values: Vec<Value>) -> Vec<Ticket> {
    let total = values.len();
    let tickets: Vec<Ticket> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<Ticket>(value) {
            Ok(ticket) => Some(ticket),
            Err(e) => {
                warn!("Skipping undecodable ticket at index {}: {}", index, e);
                None
            }
        })
        .collect();
    if tickets.len() < total {
        debug!("Decoded {} of {} tickets", tickets.len(), total);
    }
    tickets
}

// Decodes `T` if the value has the right shape, otherwise yields `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| scalar_id(&v)).filter(|id| !id.is_empty()))
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Populated references arrive either as a plain id or as `{ "_id": ... }`.
// Anything else is treated as absent.
fn deserialize_user_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    let id = match &value {
        Some(Value::Object(fields)) => fields
            .get("_id")
            .or_else(|| fields.get("id"))
            .and_then(scalar_id),
        Some(other) => scalar_id(other),
        None => None,
    };
    Ok(id.filter(|id| !id.is_empty()))
}

fn deserialize_customer_ref<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_user_ref(deserializer)?.unwrap_or_default())
}

// Entries that are not objects are dropped; fields inside an entry are lenient.
fn deserialize_messages<'de, D>(deserializer: D) -> Result<Vec<TicketMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    let Some(Value::Array(entries)) = value else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}
