//! Retention sweeper — caps every NPC's memory at a keep-count.
//!
//! ```text
//!  newest ──────────────────────────────────────────▶ oldest
//! ┌────┬────┬────┬─ ─ ─┬────┐┌────┬────┬─ ─ ─┬────┐
//! │ r1 │ r2 │ r3 │     │ rK ││rK+1│rK+2│     │ rN │
//! └────┴────┴────┴─ ─ ─┴────┘└────┴────┴─ ─ ─┴────┘
//!          kept (K = keep)            deleted
//! ```
//!
//! The sweep walks NPCs one after another. A store error stops it on the
//! spot; NPCs already trimmed stay trimmed. With no writes in between, a
//! second sweep deletes nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RetentionConfig;
use crate::error::Result;
use crate::store::DocumentStore;
use crate::types::{MemoryId, MemoryRecord, NpcId};

/// Parameters of one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    /// Records kept per NPC.
    pub keep: usize,
    /// Delete each NPC's excess in one store call.
    pub batch_deletes: bool,
}

impl SweepOptions {
    /// Options from configuration, with an optional caller override of `keep`.
    #[must_use]
    pub fn from_config(config: &RetentionConfig, keep_override: Option<usize>) -> Self {
        Self {
            keep: keep_override.unwrap_or(config.keep),
            batch_deletes: config.batch_deletes,
        }
    }
}

/// What one NPC lost in a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcTrim {
    /// The trimmed NPC.
    pub npc_id: NpcId,
    /// Records before the sweep.
    pub before: usize,
    /// Records deleted.
    pub deleted: usize,
}

/// Outcome of a completed sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Keep-count that was applied.
    pub kept: usize,
    /// How many NPCs were examined.
    pub npcs_scanned: usize,
    /// Total records deleted.
    pub deleted: usize,
    /// NPCs that actually lost records.
    pub trimmed: Vec<NpcTrim>,
}

/// Records to delete from a newest-first collection: everything past `keep`.
#[must_use]
pub fn plan_trim(newest_first: &[MemoryRecord], keep: usize) -> &[MemoryRecord] {
    newest_first.get(keep..).unwrap_or(&[])
}

/// Trim every NPC in `store` down to `options.keep` records.
///
/// # Errors
/// Returns the first store error; the sweep does not continue past it.
pub async fn sweep(store: &dyn DocumentStore, options: SweepOptions) -> Result<SweepReport> {
    let npcs = store.list_npcs().await?;
    let mut report = SweepReport {
        kept: options.keep,
        npcs_scanned: npcs.len(),
        deleted: 0,
        trimmed: Vec::new(),
    };

    for npc in npcs {
        let records = store.recent_memories(&npc, None).await?;
        let excess = plan_trim(&records, options.keep);
        if excess.is_empty() {
            continue;
        }

        let deleted = if options.batch_deletes {
            let ids: Vec<MemoryId> = excess.iter().map(|r| r.id).collect();
            store.delete_memories(&npc, &ids).await?
        } else {
            let mut deleted = 0;
            for record in excess {
                if store.delete_memory(&npc, record.id).await? {
                    deleted += 1;
                }
            }
            deleted
        };

        debug!(npc = %npc, before = records.len(), deleted, "Trimmed NPC memory");
        report.deleted += deleted;
        report.trimmed.push(NpcTrim {
            npc_id: npc,
            before: records.len(),
            deleted,
        });
    }

    info!(
        keep = report.kept,
        npcs = report.npcs_scanned,
        deleted = report.deleted,
        "Retention sweep finished"
    );
    Ok(report)
}
