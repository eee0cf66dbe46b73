//! CHRONOS stamp rendering.
//!
//! A stamp is a single-line descriptor embedding the temporal, cognitive,
//! sequential and contextual coordinates of an event:
//!
//! ```text
//! [CHRONOS] 2025-11-04T14:23:45.123456789Z::agent::Thinking::TICK-0000000042::[session]::[/home/user] → tool-completion - Write file
//! ```
//!
//! Rendering is pure: identical fields always give an identical string.
//! Stamps are always a single line: line breaks inside fields are rendered
//! as the two-character escapes `\r` and `\n`.

use std::borrow::Cow;
use crate::id::SessionId;
use crate::Time;

/// Prefix every stamp starts with.
pub const STAMP_PREFIX: &str = "[CHRONOS]";

/// Width the sequence number is zero-padded to.
pub const TICK_WIDTH: usize = 10;

/// Everything a stamp is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct StampFields<'a> {
    /// Agent name
    pub agent_name: &'a str,
    /// Cognitive state label
    pub state: &'a str,
    /// Tick
    pub sequence: u64,
    /// Owning session
    pub session_id: &'a SessionId,
    /// Working directory or other environment identifier
    pub working_context: &'a str,
    /// Action category
    pub action: &'a str,
    /// Free-text detail
    pub description: &'a str,
    /// When the event happened
    pub timestamp: Time,
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SS.fffffffffZ`.
pub fn format_timestamp(timestamp: &Time) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.9fZ").to_string()
}

/// Render `TICK-<sequence>` with the fixed pad width.
pub fn format_tick(sequence: u64) -> String {
    format!("TICK-{:0width$}", sequence, width = TICK_WIDTH)
}

/// Escape line breaks so a field cannot split the stamp.
fn one_line(field: &str) -> Cow<'_, str> {
    if field.contains(['\r', '\n']) {
        Cow::Owned(field.replace('\r', "\\r").replace('\n', "\\n"))
    } else {
        Cow::Borrowed(field)
    }
}

/// Render the full stamp.
pub fn format_stamp(fields: &StampFields<'_>) -> String {
    format!(
        "{} {}::{}::{}::{}::[{}]::[{}] → {} - {}",
        STAMP_PREFIX,
        format_timestamp(&fields.timestamp),
        one_line(fields.agent_name),
        one_line(fields.state),
        format_tick(fields.sequence),
        one_line(fields.session_id.as_str()),
        one_line(fields.working_context),
        one_line(fields.action),
        one_line(fields.description),
    )
}

/// The stamp without its temporal coordinates (timestamp and tick).
///
/// Two events carrying the same content within a session share this key; its
/// digest is the deduplication key. Fields are kept raw here, so a real line
/// break and a literal `\n` in the text never collide.
pub fn content_key(
    agent_name: &str,
    state: &str,
    session_id: &SessionId,
    working_context: &str,
    action: &str,
    description: &str,
) -> String {
    format!(
        "{}::{}::{}::[{}]::[{}] → {} - {}",
        STAMP_PREFIX, agent_name, state, session_id, working_context, action, description,
    )
}

impl StampFields<'_> {
    /// Dedup key for these fields; see [`content_key`].
    pub fn content_key(&self) -> String {
        content_key(
            self.agent_name,
            self.state,
            self.session_id,
            self.working_context,
            self.action,
            self.description,
        )
    }
}
