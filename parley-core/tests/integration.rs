//! Integration Tests — store, window, and retention working together.
//!
//! Includes the failure path: a store that breaks mid-sweep must stop the
//! sweep without undoing work already done for earlier NPCs.

use async_trait::async_trait;

use parley_core::error::{ParleyError, Result};
use parley_core::retention::{self, SweepOptions};
use parley_core::store::{DocumentStore, SqliteStore};
use parley_core::types::{
    InteractionLogEntry, MemoryId, MemoryKind, MemoryRecord, NewInteraction, NewMemory, NpcId,
    NpcProfile,
};
use parley_core::window::MemoryWindow;

fn npc(id: &str) -> NpcId {
    NpcId::new(id).expect("valid id")
}

/// Delegates to SQLite but refuses to delete records of one NPC.
struct BrokenDeletes {
    inner: SqliteStore,
    broken: NpcId,
}

#[async_trait]
impl DocumentStore for BrokenDeletes {
    async fn get_profile(&self, npc: &NpcId) -> Result<Option<NpcProfile>> {
        self.inner.get_profile(npc).await
    }
    async fn upsert_profile(&self, profile: &NpcProfile) -> Result<()> {
        self.inner.upsert_profile(profile).await
    }
    async fn list_npcs(&self) -> Result<Vec<NpcId>> {
        self.inner.list_npcs().await
    }
    async fn append_memory(&self, npc: &NpcId, memory: NewMemory) -> Result<MemoryRecord> {
        self.inner.append_memory(npc, memory).await
    }
    async fn recent_memories(&self, npc: &NpcId, limit: Option<usize>) -> Result<Vec<MemoryRecord>> {
        self.inner.recent_memories(npc, limit).await
    }
    async fn delete_memory(&self, npc: &NpcId, id: MemoryId) -> Result<bool> {
        if *npc == self.broken {
            return Err(ParleyError::Io(std::io::Error::other("disk unplugged")));
        }
        self.inner.delete_memory(npc, id).await
    }
    async fn append_interaction(&self, entry: NewInteraction) -> Result<InteractionLogEntry> {
        self.inner.append_interaction(entry).await
    }
    async fn recent_interactions(&self, limit: usize) -> Result<Vec<InteractionLogEntry>> {
        self.inner.recent_interactions(limit).await
    }
}

async fn fill(store: &dyn DocumentStore, id: &NpcId, count: usize) {
    for i in 0..count {
        store
            .append_memory(id, NewMemory::new(MemoryKind::NpcResponse, format!("{id}-{i}")))
            .await
            .expect("append");
    }
}

#[tokio::test]
async fn sweep_aborts_on_store_error_without_rollback() {
    let store = BrokenDeletes {
        inner: SqliteStore::open_in_memory().expect("open"),
        broken: npc("b-broken"),
    };
    let first = npc("a-first");
    let broken = npc("b-broken");
    let later = npc("c-later");
    fill(&store, &first, 5).await;
    fill(&store, &broken, 5).await;
    fill(&store, &later, 5).await;

    let err = retention::sweep(&store, SweepOptions { keep: 2, batch_deletes: false })
        .await
        .expect_err("sweep must fail");
    assert!(err.to_string().contains("disk unplugged"));

    assert_eq!(store.recent_memories(&first, None).await.expect("read").len(), 2, "already trimmed");
    assert_eq!(store.recent_memories(&broken, None).await.expect("read").len(), 5);
    assert_eq!(store.recent_memories(&later, None).await.expect("read").len(), 5, "never reached");
}

#[tokio::test]
async fn default_batch_delete_goes_through_single_deletes() {
    let store = BrokenDeletes {
        inner: SqliteStore::open_in_memory().expect("open"),
        broken: npc("nobody"),
    };
    let id = npc("goran");
    fill(&store, &id, 4).await;
    let ids: Vec<_> = store
        .recent_memories(&id, None)
        .await
        .expect("read")
        .iter()
        .map(|r| r.id)
        .collect();

    let deleted = store.delete_memories(&id, &ids[1..]).await.expect("delete");
    assert_eq!(deleted, 3);
    assert_eq!(store.recent_memories(&id, None).await.expect("read").len(), 1);
}

#[tokio::test]
async fn window_after_sweep_shows_survivors_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::open(dir.path().join("world.sqlite3"), &Default::default()).expect("open");
    let id = npc("innkeeper");
    fill(&store, &id, 15).await;

    retention::sweep(&store, SweepOptions { keep: 4, batch_deletes: true })
        .await
        .expect("sweep");

    let window = MemoryWindow::load(&store, &id, 10).await.expect("load");
    let contents: Vec<_> = window.records().iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, ["innkeeper-11", "innkeeper-12", "innkeeper-13", "innkeeper-14"]);
    assert!(window.render("none").starts_with("- "));
}
