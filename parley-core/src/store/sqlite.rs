//! SQLite implementation of [`DocumentStore`].
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS npc_profiles (
//!     npc_id       TEXT PRIMARY KEY,
//!     display_name TEXT NOT NULL,
//!     personality  TEXT NOT NULL
//! );
//! CREATE TABLE IF NOT EXISTS memories (
//!     id        TEXT PRIMARY KEY,
//!     npc_id    TEXT NOT NULL,
//!     ts_us     INTEGER NOT NULL,
//!     content   TEXT NOT NULL,
//!     kind      TEXT NOT NULL,
//!     player_id TEXT
//! );
//! CREATE TABLE IF NOT EXISTS interactions (
//!     id       TEXT PRIMARY KEY,
//!     player   TEXT,
//!     message  TEXT NOT NULL,
//!     response TEXT NOT NULL,
//!     ts_us    INTEGER NOT NULL
//! );
//! ```
//!
//! Timestamps are microseconds since the Unix epoch, assigned here under the
//! connection lock. If the wall clock has not moved since the previous write
//! the new timestamp is bumped by one microsecond, so ordering by `ts_us` is
//! total.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info};
use uuid::Uuid;

use super::DocumentStore;
use crate::config::StoreConfig;
use crate::credentials::ServiceAccount;
use crate::error::{ParleyError, Result};
use crate::types::{
    InteractionId, InteractionLogEntry, MemoryId, MemoryKind, MemoryRecord, NewInteraction,
    NewMemory, NpcId, NpcProfile,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS npc_profiles (
        npc_id       TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        personality  TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS memories (
        id        TEXT PRIMARY KEY,
        npc_id    TEXT NOT NULL,
        ts_us     INTEGER NOT NULL,
        content   TEXT NOT NULL,
        kind      TEXT NOT NULL,
        player_id TEXT
    );
    CREATE INDEX IF NOT EXISTS memories_by_npc_ts ON memories (npc_id, ts_us DESC);
    CREATE TABLE IF NOT EXISTS interactions (
        id       TEXT PRIMARY KEY,
        player   TEXT,
        message  TEXT NOT NULL,
        response TEXT NOT NULL,
        ts_us    INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS interactions_by_ts ON interactions (ts_us DESC);
";

struct Inner {
    conn: Connection,
    last_ts_us: i64,
}

impl Inner {
    /// Next server timestamp, strictly greater than every previous one.
    fn next_timestamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let ts = now.max(self.last_ts_us + 1);
        self.last_ts_us = ts;
        ts
    }
}

/// Handle to an open SQLite database holding profiles, memories, and the
/// legacy interaction log.
///
/// The connection sits behind a mutex that is held for one statement or one
/// transaction at a time.
///
/// # Usage
///
/// ```no_run
/// # use parley_core::store::{DocumentStore, SqliteStore};
/// # use parley_core::config::StoreConfig;
/// # use parley_core::types::{MemoryKind, NewMemory, NpcId};
/// # async fn demo() -> parley_core::error::Result<()> {
/// let store = SqliteStore::open("world.sqlite3", &StoreConfig::default())?;
/// let npc = NpcId::new("goran")?;
/// store.append_memory(&npc, NewMemory::new(MemoryKind::Chat, "Hello")).await?;
/// let recent = store.recent_memories(&npc, Some(10)).await?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteStore {
    inner: Mutex<Inner>,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) an SQLite database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &StoreConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;

        let store = Self::from_connection(conn, db_path)?;
        info!(
            path = %store.db_path.display(),
            wal = config.wal_mode,
            "Parley store opened"
        );
        Ok(store)
    }

    /// Open the database belonging to a service account's project, creating
    /// `config.data_dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::Io`] if the directory cannot be created, or
    /// [`ParleyError::Database`] on SQLite failures.
    pub fn open_for_account(account: &ServiceAccount, config: &StoreConfig) -> Result<Self> {
        let dir = Path::new(&config.data_dir);
        std::fs::create_dir_all(dir)?;
        Self::open(dir.join(format!("{}.sqlite3", account.project_id)), config)
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, db_path: PathBuf) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        let last_ts_us: i64 = conn.query_row(
            "SELECT MAX(COALESCE((SELECT MAX(ts_us) FROM memories), 0),
                        COALESCE((SELECT MAX(ts_us) FROM interactions), 0))",
            [],
            |row| row.get(0),
        )?;
        Ok(Self {
            inner: Mutex::new(Inner { conn, last_ts_us }),
            db_path,
        })
    }

    /// Return the path to the database file (or `:memory:` for in-memory DBs).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn timestamp_from_micros(ts_us: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(ts_us)
        .ok_or_else(|| ParleyError::Serialization(format!("timestamp out of range: {ts_us}")))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| ParleyError::Serialization(format!("bad id '{raw}': {e}")))
}

type MemoryRow = (String, String, i64, String, String, Option<String>);

fn memory_from_row(row: MemoryRow) -> Result<MemoryRecord> {
    let (id, npc_id, ts_us, content, kind, player_id) = row;
    Ok(MemoryRecord {
        id: MemoryId(parse_uuid(&id)?),
        npc_id: NpcId::new(npc_id).map_err(|e| ParleyError::Serialization(e.to_string()))?,
        timestamp: timestamp_from_micros(ts_us)?,
        content,
        kind: kind.parse::<MemoryKind>()?,
        player_id,
    })
}

type InteractionRow = (String, Option<String>, String, String, i64);

fn interaction_from_row(row: InteractionRow) -> Result<InteractionLogEntry> {
    let (id, player, message, response, ts_us) = row;
    Ok(InteractionLogEntry {
        id: InteractionId(parse_uuid(&id)?),
        player,
        message,
        response,
        timestamp: timestamp_from_micros(ts_us)?,
    })
}

fn sql_limit(limit: Option<usize>) -> i64 {
    // SQLite treats a negative LIMIT as "no limit".
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get_profile(&self, npc: &NpcId) -> Result<Option<NpcProfile>> {
        let inner = self.inner.lock();
        let row: Option<(String, String)> = inner
            .conn
            .prepare_cached("SELECT display_name, personality FROM npc_profiles WHERE npc_id = ?1")?
            .query_row(params![npc.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        Ok(row.map(|(display_name, personality)| NpcProfile {
            id: npc.clone(),
            display_name,
            personality,
        }))
    }

    async fn upsert_profile(&self, profile: &NpcProfile) -> Result<()> {
        let inner = self.inner.lock();
        inner.conn.execute(
            "INSERT INTO npc_profiles (npc_id, display_name, personality)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(npc_id) DO UPDATE SET
                display_name = excluded.display_name,
                personality = excluded.personality",
            params![profile.id.as_str(), profile.display_name, profile.personality],
        )?;
        debug!(npc = %profile.id, "Upserted NPC profile");
        Ok(())
    }

    async fn list_npcs(&self) -> Result<Vec<NpcId>> {
        let inner = self.inner.lock();
        let mut stmt = inner.conn.prepare_cached(
            "SELECT npc_id FROM npc_profiles
             UNION
             SELECT DISTINCT npc_id FROM memories
             ORDER BY 1",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut npcs = Vec::new();
        for row in rows {
            npcs.push(NpcId::new(row?).map_err(|e| ParleyError::Serialization(e.to_string()))?);
        }
        Ok(npcs)
    }

    async fn append_memory(&self, npc: &NpcId, memory: NewMemory) -> Result<MemoryRecord> {
        let start = Instant::now();
        let mut inner = self.inner.lock();
        let ts_us = inner.next_timestamp();
        let id = MemoryId::new();

        inner.conn.execute(
            "INSERT INTO memories (id, npc_id, ts_us, content, kind, player_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.0.to_string(),
                npc.as_str(),
                ts_us,
                memory.content,
                memory.kind.as_str(),
                memory.player_id
            ],
        )?;
        drop(inner);

        debug!(
            npc = %npc,
            kind = %memory.kind,
            elapsed_us = start.elapsed().as_micros(),
            "Appended memory"
        );

        Ok(MemoryRecord {
            id,
            npc_id: npc.clone(),
            timestamp: timestamp_from_micros(ts_us)?,
            content: memory.content,
            kind: memory.kind,
            player_id: memory.player_id,
        })
    }

    async fn recent_memories(&self, npc: &NpcId, limit: Option<usize>) -> Result<Vec<MemoryRecord>> {
        let inner = self.inner.lock();
        let mut stmt = inner.conn.prepare_cached(
            "SELECT id, npc_id, ts_us, content, kind, player_id FROM memories
             WHERE npc_id = ?1
             ORDER BY ts_us DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![npc.as_str(), sql_limit(limit)], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(memory_from_row(row?)?);
        }
        Ok(records)
    }

    async fn delete_memory(&self, npc: &NpcId, id: MemoryId) -> Result<bool> {
        let inner = self.inner.lock();
        let deleted = inner.conn.execute(
            "DELETE FROM memories WHERE id = ?1 AND npc_id = ?2",
            params![id.0.to_string(), npc.as_str()],
        )?;
        Ok(deleted > 0)
    }

    async fn delete_memories(&self, npc: &NpcId, ids: &[MemoryId]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let tx = inner.conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM memories WHERE id = ?1 AND npc_id = ?2")?;
            for id in ids {
                deleted += stmt.execute(params![id.0.to_string(), npc.as_str()])?;
            }
        }
        tx.commit()?;
        debug!(npc = %npc, deleted, "Batch-deleted memories");
        Ok(deleted)
    }

    async fn append_interaction(&self, entry: NewInteraction) -> Result<InteractionLogEntry> {
        let mut inner = self.inner.lock();
        let ts_us = inner.next_timestamp();
        let id = InteractionId::new();

        inner.conn.execute(
            "INSERT INTO interactions (id, player, message, response, ts_us)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id.0.to_string(), entry.player, entry.message, entry.response, ts_us],
        )?;

        Ok(InteractionLogEntry {
            id,
            player: entry.player,
            message: entry.message,
            response: entry.response,
            timestamp: timestamp_from_micros(ts_us)?,
        })
    }

    async fn recent_interactions(&self, limit: usize) -> Result<Vec<InteractionLogEntry>> {
        let inner = self.inner.lock();
        let mut stmt = inner.conn.prepare_cached(
            "SELECT id, player, message, response, ts_us FROM interactions
             ORDER BY ts_us DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![sql_limit(Some(limit))], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(interaction_from_row(row?)?);
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
