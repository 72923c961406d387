use anyhow::{bail, Context, Result};
use rusqlite::{params, types::Type, Connection};
use std::path::Path;
use tracing::info;

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

/// Offset added to every schema version stored in `PRAGMA user_version`, so
/// a database created by something else is never mistaken for ours.
pub const BASE_DB_VERSION: usize = 71000;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        }
    }

    fn from_sql(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            "BLOB" => Some(&SqlType::Blob),
            _ => None,
        }
    }
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<S>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let columns_sql = self
            .columns
            .iter()
            .map(|column| {
                let mut sql = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    sql.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    sql.push_str(" NOT NULL");
                }
                if let Some(default_value) = column.default_value {
                    sql.push_str(&format!(" DEFAULT {}", default_value));
                }
                sql
            })
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(
            &format!("CREATE TABLE {} ({});", self.name, columns_sql),
            params![],
        )?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual_columns = stmt
            .query_map(params![], |row| {
                let sql_type = SqlType::from_sql(&row.get::<_, String>(2)?).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(2, "type".to_string(), Type::Text)
                })?;
                Ok(Column {
                    name: row.get::<_, String>(1)?,
                    sql_type,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get::<_, Option<String>>(4)?,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read columns of table {}", self.name))?;

        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}",
                self.name,
                actual_columns.len(),
                self.columns.len()
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if let Some(problem) = column_mismatch(actual, expected) {
                bail!("Table {} column {}: {}", self.name, expected.name, problem);
            }
        }

        for (index_name, _column) in self.indices {
            let index_exists: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !index_exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }
}

fn column_mismatch(
    actual: &Column<'_, String>,
    expected: &Column<'static, &'static str>,
) -> Option<String> {
    if actual.name != expected.name {
        return Some(format!("name mismatch, found {}", actual.name));
    }
    if actual.sql_type != expected.sql_type {
        return Some(format!(
            "type mismatch, expected {:?} found {:?}",
            expected.sql_type, actual.sql_type
        ));
    }
    if (actual.non_null, actual.is_primary_key) != (expected.non_null, expected.is_primary_key) {
        return Some("constraint mismatch".to_string());
    }
    // SQLite reports expression defaults wrapped in parentheses.
    let actual_default = actual.default_value.as_deref().map(unwrap_parentheses);
    let expected_default = expected.default_value.map(unwrap_parentheses);
    if actual_default != expected_default {
        return Some(format!(
            "default mismatch, expected {:?} found {:?}",
            expected.default_value, actual.default_value
        ));
    }
    None
}

fn unwrap_parentheses(s: &str) -> &str {
    s.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(s)
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Open the database at `db_path`, creating it with the latest schema if it
/// does not exist yet, otherwise validating it against its recorded version
/// and running any pending migrations.
pub fn open_versioned<P: AsRef<Path>>(db_path: P, schemas: &[VersionedSchema]) -> Result<Connection> {
    let latest = schemas.last().context("No schema versions defined")?;
    let db_path = db_path.as_ref();

    if !db_path.exists() {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to create database at {:?}", db_path))?;
        latest.create(&conn)?;
        return Ok(conn);
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {:?}", db_path))?;

    let db_version = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
        .context("Failed to read database version")?
        - BASE_DB_VERSION as i64;

    if db_version < 0 {
        bail!(
            "Database version {} is too old, does not contain base db version {}",
            db_version,
            BASE_DB_VERSION
        );
    }
    let version = db_version as usize;
    if version >= schemas.len() {
        bail!("Database version {} is too new", version);
    }
    schemas[version].validate(&conn)?;

    let mut latest_from = version;
    for schema in schemas.iter().skip(version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating db from version {} to {}",
                latest_from, schema.version
            );
            migration_fn(&conn)?;
            latest_from = schema.version;
        }
    }
    conn.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
        [],
    )?;

    Ok(conn)
}
