//! Core type definitions for NPC memory.
//!
//! All types are serializable so handlers can return them as JSON unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ParleyError, Result};

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Identifier of an NPC, as chosen by the game client.
///
/// Never empty and never surrounded by whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NpcId(String);

impl NpcId {
    /// Validate and wrap a client-supplied identifier.
    ///
    /// # Errors
    /// Returns [`ParleyError::InvalidInput`] if the identifier is empty after
    /// trimming.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ParleyError::InvalidInput("NPC identifier must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NpcId {
    type Error = ParleyError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<NpcId> for String {
    fn from(id: NpcId) -> Self {
        id.0
    }
}

impl fmt::Display for NpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    /// Create a new random memory ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a legacy interaction log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionId(pub Uuid);

impl InteractionId {
    /// Create a new random interaction ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InteractionId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Persona of an NPC. Read-only from the request handlers' point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcProfile {
    /// Which NPC this profile describes.
    pub id: NpcId,
    /// Name the NPC uses for itself.
    pub display_name: String,
    /// Free-text personality description, embedded in the system prompt.
    pub personality: String,
}

impl NpcProfile {
    /// Neutral stand-in used when no profile is stored for `id`.
    ///
    /// The identifier doubles as the display name.
    #[must_use]
    pub fn fallback(id: &NpcId, personality: impl Into<String>) -> Self {
        Self {
            id: id.clone(),
            display_name: id.as_str().to_string(),
            personality: personality.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Memory records
// ---------------------------------------------------------------------------

/// Type tag carried by every memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Something the player said.
    Chat,
    /// A reply generated for the NPC.
    NpcResponse,
    /// Anything else.
    #[default]
    Note,
}

impl MemoryKind {
    /// Stable tag stored in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::NpcResponse => "npc_response",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryKind {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chat" => Ok(Self::Chat),
            "npc_response" => Ok(Self::NpcResponse),
            "note" | "" => Ok(Self::Note),
            other => Err(ParleyError::Serialization(format!("unknown memory kind '{other}'"))),
        }
    }
}

/// One persisted unit of an NPC's conversation history. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier for this record.
    pub id: MemoryId,
    /// Owning NPC.
    pub npc_id: NpcId,
    /// Server-assigned write time; strictly increasing per store.
    pub timestamp: DateTime<Utc>,
    /// Free-text content.
    pub content: String,
    /// Type tag.
    pub kind: MemoryKind,
    /// Player who triggered the write, if known.
    pub player_id: Option<String>,
}

/// A memory record before the store has assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    /// Free-text content.
    pub content: String,
    /// Type tag.
    pub kind: MemoryKind,
    /// Player who triggered the write, if known.
    pub player_id: Option<String>,
}

impl NewMemory {
    /// A memory of the given kind with no player attached.
    #[must_use]
    pub fn new(kind: MemoryKind, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind,
            player_id: None,
        }
    }

    /// Attach the originating player.
    #[must_use]
    pub fn with_player(mut self, player_id: Option<String>) -> Self {
        self.player_id = player_id;
        self
    }
}

// ---------------------------------------------------------------------------
// Legacy flat log
// ---------------------------------------------------------------------------

/// A flat player/message/response record, not tied to any NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionLogEntry {
    /// Unique identifier for this entry.
    pub id: InteractionId,
    /// Player who sent the message, if given.
    pub player: Option<String>,
    /// What the player said.
    pub message: String,
    /// What the provider answered.
    pub response: String,
    /// Server-assigned write time.
    pub timestamp: DateTime<Utc>,
}

/// A flat log entry before the store has assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInteraction {
    /// Player who sent the message, if given.
    pub player: Option<String>,
    /// What the player said.
    pub message: String,
    /// What the provider answered.
    pub response: String,
}
