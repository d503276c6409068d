//! Leaderboard rendering and the post replacement policy.
//!
//! Publishing deliberately replaces rather than edits: retire the old
//! message best-effort, always send a fresh one, so the board surfaces
//! as the most recent message in the destination. A failed retirement
//! leaves the old message to linger -- degraded, never fatal. The
//! lighter `refresh` path edits in place and only when the text
//! actually changed.

use tracing::warn;

use crate::error::TransportError;
use crate::scoring::RankEntry;
use crate::transport::{ChatTransport, Destination, MessageId, SubDestination};

/// Rendered output when nobody is on the board yet.
pub const EMPTY_BOARD_TEXT: &str = "Nobody on the board yet.";

const MEDALS: [&str; 3] = ["\u{1F947}", "\u{1F948}", "\u{1F949}"];

/// Render ranked rows into the posted text. `limit` of `None` renders
/// the whole board.
pub fn render(entries: &[RankEntry], limit: Option<usize>) -> String {
    if entries.is_empty() {
        return EMPTY_BOARD_TEXT.to_string();
    }
    let shown = limit.unwrap_or(entries.len()).min(entries.len());
    let mut lines = Vec::with_capacity(shown + 1);
    lines.push(format!("TOP-{shown}:"));
    for (idx, entry) in entries.iter().take(shown).enumerate() {
        let prefix = MEDALS
            .get(idx)
            .map(|m| (*m).to_string())
            .unwrap_or_else(|| format!("{}.", idx + 1));
        lines.push(format!(
            "{prefix} {} — {} d.",
            entry.member.display_or_id(),
            entry.snapshot.elapsed_days
        ));
    }
    lines.join("\n")
}

/// Replace policy: best-effort retirement of the previous message, then
/// a fresh send. Returns the new message handle for the tracker row.
pub async fn replace_post<T: ChatTransport + ?Sized>(
    transport: &T,
    destination: Destination,
    sub_destination: SubDestination,
    previous: Option<MessageId>,
    text: &str,
) -> Result<MessageId, TransportError> {
    if let Some(old) = previous {
        // Insufficient rights or an out-of-band deletion both land here;
        // the old message lingering is tolerated.
        if let Err(err) = transport.delete_message(destination, old).await {
            warn!(destination = destination.0, message = old.0, %err, "previous post retirement failed");
        }
    }
    transport.send_message(destination, sub_destination, text).await
}

/// Refresh policy: edit in place, skipping the call entirely when the
/// content is byte-identical. Returns whether an edit was issued.
pub async fn refresh_post<T: ChatTransport + ?Sized>(
    transport: &T,
    destination: Destination,
    message: MessageId,
    old_text: &str,
    new_text: &str,
) -> Result<bool, TransportError> {
    if old_text == new_text {
        return Ok(false);
    }
    transport.edit_message(destination, message, new_text).await?;
    Ok(true)
}
