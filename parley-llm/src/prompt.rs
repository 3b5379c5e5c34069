//! Prompt templates for NPC conversations.
//!
//! Templates use `{key}` placeholders filled by [`render_template`].

/// System prompt for a memory-aware NPC reply.
pub const INTERACTION_SYSTEM: &str = r"You are {npc_name}, a character in the game world.
Your personality: {personality}

RULES:
- Stay in character. Never break the fourth wall.
- Use your memories of earlier conversations naturally; don't list them.
- Keep responses under 3 sentences.";

/// User prompt for a memory-aware NPC reply.
pub const INTERACTION_USER: &str = r#"Your memories of recent conversations (oldest first):
{memories}

The player says: "{player_message}"

Respond as {npc_name} would."#;

/// Fixed persona of the deprecated flat logger. No per-NPC personalization.
pub const LEGACY_SYSTEM: &str = "You are an NPC in the game. Reply briefly and with a playful tone.";

/// Single-pass template interpolation.
///
/// Replaces each `{key}` with its value. Substituted text is never scanned
/// again, so a player typing `{memories}` gets exactly that.
/// Unknown placeholders are left as they are.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render the system and user prompts of a memory-aware reply.
#[must_use]
pub fn interaction_prompts(
    npc_name: &str,
    personality: &str,
    memories: &str,
    player_message: &str,
) -> (String, String) {
    let vars = [
        ("npc_name", npc_name),
        ("personality", personality),
        ("memories", memories),
        ("player_message", player_message),
    ];
    (
        render_template(INTERACTION_SYSTEM, &vars),
        render_template(INTERACTION_USER, &vars),
    )
}
