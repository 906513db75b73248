//! Append-only history events recorded alongside every artifact mutation.

use std::fmt;

/// Kind of mutation recorded in `memory_history` for a category artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    /// The artifact did not previously exist and was written for the
    /// first time.
    Create,
    /// An existing artifact was overwritten or appended to.
    Update,
    /// The artifact was removed.
    Delete,
    /// An embedding vector was persisted for the artifact's content.
    Embed,
}

impl fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HistoryEvent::Create => "CREATE",
            HistoryEvent::Update => "UPDATE",
            HistoryEvent::Delete => "DELETE",
            HistoryEvent::Embed => "EMBED",
        };
        f.write_str(label)
    }
}
