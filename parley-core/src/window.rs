//! Memory window — the slice of history an NPC "remembers" when it replies.
//!
//! The store hands records back newest-first; the prompt wants them in the
//! order they happened. [`MemoryWindow`] holds them oldest-first and renders
//! one line per record:
//!
//! ```text
//! - 2026-10-18T09:12:44Z: NPC response: Welcome back, traveler.
//! - 2026-10-18T09:13:02Z: NPC response: The forge is cold today.
//! ```

use chrono::SecondsFormat;

use crate::error::Result;
use crate::store::DocumentStore;
use crate::types::{MemoryRecord, NpcId};

/// Recent memory records of one NPC, oldest first.
#[derive(Debug, Clone, Default)]
pub struct MemoryWindow {
    records: Vec<MemoryRecord>,
}

impl MemoryWindow {
    /// Build a window from records in the store's newest-first order.
    #[must_use]
    pub fn from_newest_first(mut records: Vec<MemoryRecord>) -> Self {
        records.reverse();
        Self { records }
    }

    /// Load up to `size` most recent records of `npc`.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn load(store: &dyn DocumentStore, npc: &NpcId, size: usize) -> Result<Self> {
        let records = store.recent_memories(npc, Some(size)).await?;
        Ok(Self::from_newest_first(records))
    }

    /// Records in chronological order.
    #[must_use]
    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    /// Whether the NPC has no history yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Render as a prompt block, or `placeholder` when empty.
    #[must_use]
    pub fn render(&self, placeholder: &str) -> String {
        if self.records.is_empty() {
            return placeholder.to_string();
        }
        self.records
            .iter()
            .map(render_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_line(record: &MemoryRecord) -> String {
    format!(
        "- {}: {}",
        record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        record.content
    )
}
