use serde::{Deserialize, Serialize};

use crate::models::{CustomEmoji, PostPage, Profile, UserStatus};

/// Typed update records handed to the state machine that owns the UI state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StateAction {
    /// Normalized posts of a fetch, with the page cursors
    ReceivedPosts { page: PostPage },

    /// A page of a channel's posts (page strategy and around strategy)
    ReceivedPostsInChannel {
        channel_id: String,
        order: Vec<String>,
        /// The page holds the newest posts of the channel
        recent: bool,
        /// The page reaches the oldest post of the channel
        oldest: bool,
    },

    /// Posts created or updated since a timestamp
    ReceivedPostsSince { channel_id: String, order: Vec<String> },

    /// Posts older than an anchor post
    ReceivedPostsBefore {
        channel_id: String,
        before_post_id: String,
        order: Vec<String>,
        oldest: bool,
    },

    /// Posts newer than an anchor post
    ReceivedPostsAfter {
        channel_id: String,
        after_post_id: String,
        order: Vec<String>,
        newest: bool,
    },

    /// A root post and its replies
    ReceivedPostsInThread { root_id: String, order: Vec<String> },

    /// Profiles of post authors or mentioned users
    ReceivedProfilesList { profiles: Vec<Profile> },

    /// Presence of post authors
    ReceivedStatuses { statuses: Vec<UserStatus> },

    /// Custom emojis carried in post metadata
    ReceivedCustomEmojis { emojis: Vec<CustomEmoji> },
}

impl StateAction {
    /// Returns the channel this action is scoped to, if any.
    /// Thread and user-cache actions are not channel-scoped.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::ReceivedPostsInChannel { channel_id, .. }
            | Self::ReceivedPostsSince { channel_id, .. }
            | Self::ReceivedPostsBefore { channel_id, .. }
            | Self::ReceivedPostsAfter { channel_id, .. } => Some(channel_id),
            _ => None,
        }
    }

    /// True for actions that carry posts rather than user-cache entities.
    pub fn is_post_delivery(&self) -> bool {
        !matches!(
            self,
            Self::ReceivedProfilesList { .. }
                | Self::ReceivedStatuses { .. }
                | Self::ReceivedCustomEmojis { .. }
        )
    }
}

/// A group of actions applied as one state transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionBatch {
    pub actions: Vec<StateAction>,
}

impl ActionBatch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateAction> {
        self.actions.iter()
    }
}
