use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use harbor_types::models::{CustomEmoji, Profile, UserStatus};

/// What the client already knows about users, copied out at call time.
#[derive(Debug, Clone, Default)]
pub struct UsersSnapshot {
    pub current_user_id: String,
    pub profiles: HashMap<String, Profile>,
    /// user_id -> status
    pub statuses: HashMap<String, String>,
    /// Names of custom emojis already loaded
    pub custom_emojis: HashSet<String>,
}

impl UsersSnapshot {
    /// Lowercased usernames of cached profiles.
    pub fn known_usernames(&self) -> HashSet<String> {
        self.profiles
            .values()
            .map(|p| p.username.to_lowercase())
            .collect()
    }
}

/// Shared view of the client session: which channel is on screen and the
/// user cache the dependency resolver checks against.
///
/// Cheap to clone; all clones share state.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionInner>>,
}

#[derive(Default)]
struct SessionInner {
    current_channel_id: Option<String>,
    users: UsersSnapshot,
}

impl Session {
    pub fn new(current_user_id: &str) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionInner {
                current_channel_id: None,
                users: UsersSnapshot {
                    current_user_id: current_user_id.to_string(),
                    ..Default::default()
                },
            })),
        }
    }

    pub async fn current_channel_id(&self) -> Option<String> {
        self.inner.read().await.current_channel_id.clone()
    }

    pub async fn set_current_channel(&self, channel_id: Option<&str>) {
        self.inner.write().await.current_channel_id = channel_id.map(str::to_string);
    }

    pub async fn current_user_id(&self) -> String {
        self.inner.read().await.users.current_user_id.clone()
    }

    pub async fn set_current_user(&self, user_id: &str) {
        self.inner.write().await.users.current_user_id = user_id.to_string();
    }

    /// Copy of the user cache as it is right now. Not kept in sync with later
    /// updates.
    pub async fn snapshot(&self) -> UsersSnapshot {
        self.inner.read().await.users.clone()
    }

    pub async fn insert_profiles(&self, profiles: impl IntoIterator<Item = Profile>) {
        let mut inner = self.inner.write().await;
        for profile in profiles {
            inner.users.profiles.insert(profile.id.clone(), profile);
        }
    }

    pub async fn insert_statuses(&self, statuses: impl IntoIterator<Item = UserStatus>) {
        let mut inner = self.inner.write().await;
        for status in statuses {
            inner.users.statuses.insert(status.user_id, status.status);
        }
    }

    pub async fn insert_custom_emojis(&self, emojis: impl IntoIterator<Item = CustomEmoji>) {
        let mut inner = self.inner.write().await;
        inner.users.custom_emojis.extend(emojis.into_iter().map(|e| e.name));
    }
}
