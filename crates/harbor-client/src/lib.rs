pub mod error;
pub mod http;

pub use error::ClientError;
pub use http::HttpClient;

use async_trait::async_trait;

use harbor_types::api::PostListResponse;
use harbor_types::models::{Profile, UserStatus};

/// Which side of an anchor post to page towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Before,
    After,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

/// Remote endpoints the sync pipeline reads from.
#[async_trait]
pub trait PostsApi: Send + Sync {
    /// A page of a channel's posts, newest first.
    async fn get_posts(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PostListResponse, ClientError>;

    /// Posts created or updated after `since` (ms since epoch). No cursors.
    async fn get_posts_since(&self, channel_id: &str, since: i64)
    -> Result<PostListResponse, ClientError>;

    /// A page of posts on one side of `post_id`.
    async fn get_posts_anchored(
        &self,
        channel_id: &str,
        post_id: &str,
        direction: Direction,
        page: u32,
        per_page: u32,
    ) -> Result<PostListResponse, ClientError>;

    /// A root post and all of its replies.
    async fn get_post_thread(&self, root_id: &str) -> Result<PostListResponse, ClientError>;

    async fn get_profiles_by_ids(&self, user_ids: &[String]) -> Result<Vec<Profile>, ClientError>;

    async fn get_profiles_by_usernames(
        &self,
        usernames: &[String],
    ) -> Result<Vec<Profile>, ClientError>;

    async fn get_statuses_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserStatus>, ClientError>;
}
