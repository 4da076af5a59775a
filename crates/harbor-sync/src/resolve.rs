//! Dependency resolution: the users a batch of posts refers to but does not
//! contain.

use std::collections::HashSet;

use tracing::debug;

use harbor_client::PostsApi;
use harbor_types::actions::StateAction;
use harbor_types::models::{CustomEmoji, Post, Profile};

use crate::mentions::MentionExtractor;
use crate::session::UsersSnapshot;

/// Mentions that address a group rather than a user.
pub const SPECIAL_MENTIONS: &[&str] = &["all", "channel", "here"];

/// Work still missing from the user cache for one batch of posts. Every list
/// is deduplicated and keeps first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyRequest {
    /// Authors without a cached profile, current user excluded
    pub profile_ids: Vec<String>,
    /// Mentioned usernames without a cached profile
    pub usernames: Vec<String>,
    /// Authors without a cached status, current user included
    pub status_ids: Vec<String>,
    /// Custom emojis carried in post metadata that are not loaded yet
    pub custom_emojis: Vec<CustomEmoji>,
}

impl DependencyRequest {
    pub fn from_posts<'a>(
        posts: impl IntoIterator<Item = &'a Post>,
        users: &UsersSnapshot,
        mentions: &dyn MentionExtractor,
    ) -> Self {
        let known_usernames = users.known_usernames();
        let current_username = users
            .profiles
            .get(&users.current_user_id)
            .map(|p| p.username.to_lowercase());

        let mut request = Self::default();
        let mut seen_profiles = HashSet::new();
        let mut seen_statuses = HashSet::new();
        let mut seen_usernames = HashSet::new();
        let mut seen_emojis = HashSet::new();

        for post in posts {
            let user_id = post.user_id.as_str();

            if !users.statuses.contains_key(user_id) && seen_statuses.insert(user_id.to_string()) {
                request.status_ids.push(user_id.to_string());
            }

            if user_id != users.current_user_id
                && !users.profiles.contains_key(user_id)
                && seen_profiles.insert(user_id.to_string())
            {
                request.profile_ids.push(user_id.to_string());
            }

            for username in mentions.mentioned_usernames(&post.message) {
                if SPECIAL_MENTIONS.contains(&username.as_str())
                    || known_usernames.contains(&username)
                    || current_username.as_deref() == Some(username.as_str())
                {
                    continue;
                }
                if seen_usernames.insert(username.clone()) {
                    request.usernames.push(username);
                }
            }

            let emojis = post
                .metadata
                .iter()
                .filter_map(|meta| meta.emojis.as_ref())
                .flatten();
            for emoji in emojis {
                if emoji.name.is_empty() || users.custom_emojis.contains(&emoji.name) {
                    continue;
                }
                if seen_emojis.insert(emoji.name.clone()) {
                    request.custom_emojis.push(emoji.clone());
                }
            }
        }

        request
    }

    /// True when at least one remote call is needed.
    pub fn needs_network(&self) -> bool {
        !self.profile_ids.is_empty() || !self.usernames.is_empty() || !self.status_ids.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.needs_network() && self.custom_emojis.is_empty()
    }
}

/// Fetch everything in `request` and turn it into user-cache actions.
///
/// Profiles by id, profiles by username and statuses are requested
/// concurrently, one call per non-empty list. If any call fails, none of the
/// fetched data is returned. Fetched profiles never include the current user.
pub async fn resolve_dependencies(
    api: &dyn PostsApi,
    request: &DependencyRequest,
    current_user_id: &str,
) -> Vec<StateAction> {
    let mut actions = Vec::new();

    if request.needs_network() {
        let by_ids = async {
            if request.profile_ids.is_empty() {
                return Ok(None);
            }
            api.get_profiles_by_ids(&request.profile_ids).await.map(Some)
        };
        let by_usernames = async {
            if request.usernames.is_empty() {
                return Ok(None);
            }
            api.get_profiles_by_usernames(&request.usernames).await.map(Some)
        };
        let statuses = async {
            if request.status_ids.is_empty() {
                return Ok(None);
            }
            api.get_statuses_by_ids(&request.status_ids).await.map(Some)
        };

        match tokio::try_join!(by_ids, by_usernames, statuses) {
            Ok((by_ids, by_usernames, statuses)) => {
                for profiles in [by_ids, by_usernames].into_iter().flatten() {
                    let profiles = without_user(profiles, current_user_id);
                    if !profiles.is_empty() {
                        actions.push(StateAction::ReceivedProfilesList { profiles });
                    }
                }

                if let Some(statuses) = statuses.filter(|s| !s.is_empty()) {
                    actions.push(StateAction::ReceivedStatuses { statuses });
                }
            }
            Err(e) => {
                debug!("Dropping dependency results for this batch: {}", e);
            }
        }
    }

    if !request.custom_emojis.is_empty() {
        actions.push(StateAction::ReceivedCustomEmojis {
            emojis: request.custom_emojis.clone(),
        });
    }

    actions
}

fn without_user(profiles: Vec<Profile>, user_id: &str) -> Vec<Profile> {
    profiles.into_iter().filter(|p| p.id != user_id).collect()
}
