use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tickets::Ticket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerRole {
    Administrator,
    SupportAgent,
    Customer,
    #[serde(other)]
    Unknown,
}

impl ViewerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewerRole::Administrator => "administrator",
            ViewerRole::SupportAgent => "support-agent",
            ViewerRole::Customer => "customer",
            ViewerRole::Unknown => "unknown",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "administrator" | "admin" => Some(ViewerRole::Administrator),
            "support-agent" | "support_agent" | "agent" => Some(ViewerRole::SupportAgent),
            "customer" => Some(ViewerRole::Customer),
            _ => None,
        }
    }

    /// Whether this role handles tickets on behalf of customers.
    pub fn is_staff(self) -> bool {
        matches!(self, ViewerRole::Administrator | ViewerRole::SupportAgent)
    }
}

impl fmt::Display for ViewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user on whose behalf tickets are watched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: String,
    pub role: ViewerRole,
}

impl Viewer {
    pub fn new(id: impl Into<String>, role: ViewerRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Whether this viewer is entitled to hear about `ticket`.
    ///
    /// - administrators see everything
    /// - support agents see unassigned tickets and tickets assigned to them
    /// - customers see their own tickets
    pub fn can_see(&self, ticket: &Ticket) -> bool {
        match self.role {
            ViewerRole::Administrator => true,
            ViewerRole::SupportAgent => match &ticket.assigned_to {
                None => true,
                Some(assignee) => *assignee == self.id,
            },
            ViewerRole::Customer => ticket.customer_id == self.id,
            ViewerRole::Unknown => false,
        }
    }
}
