//! SQLite-backed story and asset store.
//!
//! One database holds both tables so stories and asset records survive a
//! restart together. On the next start the orchestrator's reconciliation
//! pass fails any story left in an exclusive status.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::asset::{AssetRecord, AssetStore};
use crate::events::StoryEvents;
use crate::story::{Story, StoryFilter, StoryStatus, StoryStore};

use super::{FaultInjector, StoreError};

const STORY_COLUMNS: &str = "id, title, status, status_changed_at, required_asset_ids";
const ASSET_COLUMNS: &str = "id, started, finished, last_heartbeat_at, created_at";

/// SQLite-backed store implementing both [`StoryStore`] and [`AssetStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
    faults: FaultInjector,
    events: Option<StoryEvents>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_error)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            faults: FaultInjector::disabled(),
            events: None,
        })
    }

    /// Inject transient faults into mutations.
    pub fn with_faults(mut self, faults: FaultInjector) -> Self {
        self.faults = faults;
        self
    }

    /// Publish story status changes on the given channel.
    pub fn with_events(mut self, events: StoryEvents) -> Self {
        self.events = Some(events);
        self
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stories (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                status_changed_at TEXT NOT NULL,
                required_asset_ids TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_stories_status ON stories(status);

            CREATE TABLE IF NOT EXISTS asset_records (
                id TEXT PRIMARY KEY,
                started INTEGER NOT NULL DEFAULT 0,
                finished INTEGER NOT NULL DEFAULT 0,
                last_heartbeat_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(db_error)
    }

    fn row_to_story(row: &rusqlite::Row) -> rusqlite::Result<Story> {
        let id: String = row.get(0)?;
        let title: String = row.get(1)?;
        let status_str: String = row.get(2)?;
        let changed_str: String = row.get(3)?;
        let assets_json: String = row.get(4)?;

        // Unknown statuses can only come from a foreign writer; treat as failed
        let status = StoryStatus::parse(&status_str).unwrap_or(StoryStatus::Error);
        let required_asset_ids: Vec<String> =
            serde_json::from_str(&assets_json).unwrap_or_default();

        Ok(Story {
            id,
            title,
            status,
            status_changed_at: parse_timestamp(&changed_str),
            required_asset_ids,
        })
    }

    fn row_to_asset(row: &rusqlite::Row) -> rusqlite::Result<AssetRecord> {
        let heartbeat_str: String = row.get(3)?;
        let created_str: String = row.get(4)?;
        Ok(AssetRecord {
            id: row.get(0)?,
            started: row.get(1)?,
            finished: row.get(2)?,
            last_heartbeat_at: parse_timestamp(&heartbeat_str),
            created_at: parse_timestamp(&created_str),
        })
    }

    fn query_story(conn: &Connection, id: &str) -> Result<Option<Story>, StoreError> {
        conn.query_row(
            &format!("SELECT {} FROM stories WHERE id = ?", STORY_COLUMNS),
            params![id],
            Self::row_to_story,
        )
        .optional()
        .map_err(db_error)
    }

    fn query_asset(conn: &Connection, id: &str) -> Result<Option<AssetRecord>, StoreError> {
        conn.query_row(
            &format!("SELECT {} FROM asset_records WHERE id = ?", ASSET_COLUMNS),
            params![id],
            Self::row_to_asset,
        )
        .optional()
        .map_err(db_error)
    }

    /// Run `sql` against an existing asset record and return the updated row.
    fn modify_asset(
        &self,
        id: &str,
        operation: &str,
        sql: &str,
        now: Option<DateTime<Utc>>,
    ) -> Result<AssetRecord, StoreError> {
        let conn = self.conn.lock()?;
        if Self::query_asset(&conn, id)?.is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.faults.check(operation)?;

        match now {
            Some(now) => conn.execute(sql, params![now.to_rfc3339(), id]),
            None => conn.execute(sql, params![id]),
        }
        .map_err(db_error)?;

        Self::query_asset(&conn, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl StoryStore for SqliteStore {
    fn insert(&self, story: Story) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        let assets_json = serde_json::to_string(&story.required_asset_ids)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO stories (id, title, status, status_changed_at, required_asset_ids) VALUES (?, ?, ?, ?, ?)",
            params![
                story.id,
                story.title,
                story.status.as_str(),
                story.status_changed_at.to_rfc3339(),
                assets_json,
            ],
        )
        .map_err(db_error)?;

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Story>, StoreError> {
        let conn = self.conn.lock()?;
        Self::query_story(&conn, id)
    }

    fn list(&self, filter: &StoryFilter) -> Result<Vec<Story>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM stories ORDER BY id ASC", STORY_COLUMNS))
            .map_err(db_error)?;

        let rows = stmt.query_map([], Self::row_to_story).map_err(db_error)?;

        let mut stories = Vec::new();
        for row_result in rows {
            let story = row_result.map_err(db_error)?;
            // Asset membership lives in a JSON column, so filter in Rust
            if filter.matches(&story) {
                stories.push(story);
            }
        }
        Ok(stories)
    }

    fn update_status(&self, id: &str, status: StoryStatus) -> Result<Story, StoreError> {
        let updated = {
            let conn = self.conn.lock()?;
            let mut story =
                Self::query_story(&conn, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            self.faults.check("update_status")?;

            let now = Utc::now();
            conn.execute(
                "UPDATE stories SET status = ?, status_changed_at = ? WHERE id = ?",
                params![status.as_str(), now.to_rfc3339(), id],
            )
            .map_err(db_error)?;

            story.status = status;
            story.status_changed_at = now;
            story
        };

        if let Some(ref events) = self.events {
            events.publish(id, status);
        }

        Ok(updated)
    }
}

impl AssetStore for SqliteStore {
    fn get(&self, id: &str) -> Result<Option<AssetRecord>, StoreError> {
        let conn = self.conn.lock()?;
        Self::query_asset(&conn, id)
    }

    fn list(&self) -> Result<Vec<AssetRecord>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM asset_records ORDER BY id ASC",
                ASSET_COLUMNS
            ))
            .map_err(db_error)?;

        let rows = stmt.query_map([], Self::row_to_asset).map_err(db_error)?;

        let mut records = Vec::new();
        for row_result in rows {
            records.push(row_result.map_err(db_error)?);
        }
        Ok(records)
    }

    fn create(&self, id: &str) -> Result<AssetRecord, StoreError> {
        let conn = self.conn.lock()?;
        self.faults.check("create_asset")?;

        let record = AssetRecord::new(id);
        conn.execute(
            "INSERT OR REPLACE INTO asset_records (id, started, finished, last_heartbeat_at, created_at) VALUES (?, 0, 0, ?, ?)",
            params![
                record.id,
                record.last_heartbeat_at.to_rfc3339(),
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_error)?;

        Ok(record)
    }

    fn mark_started(&self, id: &str) -> Result<AssetRecord, StoreError> {
        self.modify_asset(
            id,
            "mark_started",
            "UPDATE asset_records SET started = 1, last_heartbeat_at = ? WHERE id = ?",
            Some(Utc::now()),
        )
    }

    fn record_heartbeat(&self, id: &str) -> Result<AssetRecord, StoreError> {
        self.modify_asset(
            id,
            "record_heartbeat",
            "UPDATE asset_records SET last_heartbeat_at = ? WHERE id = ?",
            Some(Utc::now()),
        )
    }

    fn mark_finished(&self, id: &str) -> Result<AssetRecord, StoreError> {
        self.modify_asset(
            id,
            "mark_finished",
            "UPDATE asset_records SET started = 1, finished = 1 WHERE id = ?",
            None,
        )
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock()?;
        self.faults.check("delete_asset")?;
        let deleted = conn
            .execute("DELETE FROM asset_records WHERE id = ?", params![id])
            .map_err(db_error)?;
        Ok(deleted > 0)
    }
}

fn db_error(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
