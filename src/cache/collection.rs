//! Collection Registry
//!
//! The fixed set of named collections created when the store is initialized.

use std::fmt;

use serde::Serialize;

// == Collection ==
/// A named, independent namespace of cached entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Profiles,
    Events,
    Collections,
    Leaderboard,
    ForumThreads,
    ChatMessages,
    /// Reserved for small process-level bookkeeping values
    Metadata,
}

impl Collection {
    /// Every declared collection, in creation order.
    pub const ALL: [Collection; 7] = [
        Collection::Profiles,
        Collection::Events,
        Collection::Collections,
        Collection::Leaderboard,
        Collection::ForumThreads,
        Collection::ChatMessages,
        Collection::Metadata,
    ];

    /// Name used for the collection's directory and in log output.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Profiles => "profiles",
            Collection::Events => "events",
            Collection::Collections => "collections",
            Collection::Leaderboard => "leaderboard",
            Collection::ForumThreads => "forum_threads",
            Collection::ChatMessages => "chat_messages",
            Collection::Metadata => "metadata",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
