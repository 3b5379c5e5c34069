//! Document store seam.
//!
//! The handlers only ever talk to a [`DocumentStore`]. Records are addressed
//! per NPC and ordered by a timestamp the store assigns on write, so callers
//! never supply their own clock.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    InteractionLogEntry, MemoryId, MemoryRecord, NewInteraction, NewMemory, NpcId, NpcProfile,
};

/// Read/write/delete access to NPC profiles, per-NPC memory, and the legacy
/// flat interaction log.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Look up an NPC profile.
    async fn get_profile(&self, npc: &NpcId) -> Result<Option<NpcProfile>>;

    /// Insert or replace an NPC profile.
    async fn upsert_profile(&self, profile: &NpcProfile) -> Result<()>;

    /// Every NPC known to the store: those with a profile and those owning
    /// at least one memory record. Sorted by identifier.
    async fn list_npcs(&self) -> Result<Vec<NpcId>>;

    /// Append a memory record. The store assigns id and timestamp.
    async fn append_memory(&self, npc: &NpcId, memory: NewMemory) -> Result<MemoryRecord>;

    /// Memory records of `npc`, newest first, at most `limit` of them
    /// (`None` returns the whole collection).
    async fn recent_memories(&self, npc: &NpcId, limit: Option<usize>) -> Result<Vec<MemoryRecord>>;

    /// Delete one memory record. Returns `true` if it existed.
    async fn delete_memory(&self, npc: &NpcId, id: MemoryId) -> Result<bool>;

    /// Delete several memory records of one NPC. Returns how many existed.
    ///
    /// The default issues one [`delete_memory`](Self::delete_memory) per id.
    async fn delete_memories(&self, npc: &NpcId, ids: &[MemoryId]) -> Result<usize> {
        let mut deleted = 0;
        for id in ids {
            if self.delete_memory(npc, *id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Append a legacy flat log entry. The store assigns id and timestamp.
    async fn append_interaction(&self, entry: NewInteraction) -> Result<InteractionLogEntry>;

    /// Legacy flat log entries across all NPCs, newest first.
    async fn recent_interactions(&self, limit: usize) -> Result<Vec<InteractionLogEntry>>;
}
