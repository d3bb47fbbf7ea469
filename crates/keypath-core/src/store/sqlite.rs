use std::path::Path;
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use tracing::debug;

use crate::error::{KeypathError, Result};
use crate::models::{PathOrigin, Record};

use super::Store;

const SCHEMA_SQL: &str = r"
    PRAGMA journal_mode = WAL;
    CREATE TABLE IF NOT EXISTS records (
        name TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        description TEXT NOT NULL,
        tags_json TEXT NOT NULL,
        keyword_path_json TEXT NOT NULL,
        path_origin TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_records_path ON records(keyword_path_json);
";

/// Record collection in a single-file SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

struct RawRecord {
    name: String,
    content: String,
    description: String,
    tags_json: String,
    keyword_path_json: String,
    path_origin: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RawRecord {
    fn into_record(self) -> Result<Record> {
        Ok(Record {
            tags: serde_json::from_str(&self.tags_json)?,
            keyword_path: serde_json::from_str(&self.keyword_path_json)?,
            path_origin: self.path_origin.parse::<PathOrigin>()?,
            name: self.name,
            content: self.content,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl SqliteStore {
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| KeypathError::lock_poisoned("sqlite"))?;
        f(&conn)
    }

    fn with_tx<T>(&self, f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| KeypathError::lock_poisoned("sqlite"))?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        drop(conn);
        Ok(value)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        #[cfg(unix)]
        harden_sqlite_permissions(path)?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(())
        })
    }
}

impl Store for SqliteStore {
    fn load(&self) -> Result<Vec<Record>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT name, content, description, tags_json, keyword_path_json,
                       path_origin, created_at, updated_at
                FROM records
                ORDER BY name ASC
                ",
            )?;
            let rows = stmt.query_map([], |row| {
                let created_at = row.get::<_, String>(6)?;
                let updated_at = row.get::<_, String>(7)?;
                Ok(RawRecord {
                    name: row.get(0)?,
                    content: row.get(1)?,
                    description: row.get(2)?,
                    tags_json: row.get(3)?,
                    keyword_path_json: row.get(4)?,
                    path_origin: row.get(5)?,
                    created_at: parse_required_rfc3339(6, &created_at)?,
                    updated_at: parse_required_rfc3339(7, &updated_at)?,
                })
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })?;
        rows.into_iter().map(RawRecord::into_record).collect()
    }

    fn save(&self, records: &[Record]) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM records", [])?;
            let mut stmt = tx.prepare(
                r"
                INSERT INTO records(
                    name, content, description, tags_json, keyword_path_json,
                    path_origin, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )?;
            for record in records {
                stmt.execute(params![
                    record.name,
                    record.content,
                    record.description,
                    serde_json::to_string(&record.tags)?,
                    serde_json::to_string(&record.keyword_path)?,
                    record.path_origin.as_str(),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ])?;
            }
            Ok(())
        })?;
        debug!(records = records.len(), "saved records to sqlite");
        Ok(())
    }
}

fn parse_required_rfc3339(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|x| x.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

#[cfg(unix)]
fn harden_sqlite_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for suffix in ["", "-wal", "-shm"] {
        let mut os = path.as_os_str().to_os_string();
        os.push(suffix);
        let candidate = PathBuf::from(os);
        if candidate.exists() {
            std::fs::set_permissions(candidate, std::fs::Permissions::from_mode(0o600))?;
        }
    }
    Ok(())
}
