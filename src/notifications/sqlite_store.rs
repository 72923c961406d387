//! SQLite-backed notification store.
//!
//! The whole log lives as one JSON array under a single key of a small
//! key/value table, mirroring the browser-storage layout the web client used.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::models::Notification;
use super::store::NotificationStore;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned, Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

/// Key holding the notification array.
pub const NOTIFICATIONS_KEY: &str = "ticket_notifications";

const KV_STORE_TABLE_V_0: Table = Table {
    name: "kv_store",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[KV_STORE_TABLE_V_0],
    migration: None,
}];

/// Key holding the notifications of one viewer.
pub fn viewer_key(viewer_id: &str) -> String {
    format!("{}:{}", NOTIFICATIONS_KEY, viewer_id)
}

#[derive(Clone)]
pub struct SqliteNotificationStore {
    conn: Arc<Mutex<Connection>>,
    key: String,
}

impl SqliteNotificationStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        Self::with_key(db_path, NOTIFICATIONS_KEY)
    }

    /// Open the store using a custom key, so several viewers can share one file.
    pub fn with_key<T: AsRef<Path>>(db_path: T, key: &str) -> Result<Self> {
        let conn = open_versioned(db_path, VERSIONED_SCHEMAS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            key: key.to_string(),
        })
    }

    /// Open the store under the key reserved for `viewer_id`.
    pub fn for_viewer<T: AsRef<Path>>(db_path: T, viewer_id: &str) -> Result<Self> {
        Self::with_key(db_path, &viewer_key(viewer_id))
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl NotificationStore for SqliteNotificationStore {
    fn load(&self) -> Result<Vec<Notification>> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<String> = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", KV_STORE_TABLE_V_0.name),
                params![self.key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read stored notifications")?;

        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Stored value under {} is not a notification list", self.key)),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, notifications: &[Notification]) -> Result<()> {
        let raw = serde_json::to_string(notifications)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (key, value, updated_at) VALUES (?1, ?2, cast(strftime('%s','now') as int))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                KV_STORE_TABLE_V_0.name
            ),
            params![self.key, raw],
        )
        .context("Failed to store notifications")?;
        debug!("Stored {} notifications under {}", notifications.len(), self.key);
        Ok(())
    }
}
