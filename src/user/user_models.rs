//! User data models
use serde::{Deserialize, Serialize};

use super::viewer::{Viewer, ViewerRole};

/// A user record as returned by `GET /users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_role")]
    pub role: ViewerRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

fn default_role() -> ViewerRole {
    ViewerRole::Customer
}

impl User {
    pub fn as_viewer(&self) -> Viewer {
        Viewer::new(self.id.clone(), self.role)
    }
}
