//! Database row types. These map directly to SQLite rows.
//! Distinct from harbor-types models to keep the DB layer independent of
//! the JSON encoding of nested fields.

use anyhow::Result;
use harbor_types::models::{Attributes, Post, PostMetadata};

pub struct PostRow {
    pub id: String,
    pub channel_id: String,
    pub root_id: Option<String>,
    pub user_id: String,
    pub message: String,
    pub post_type: String,
    pub create_at: i64,
    pub update_at: i64,
    pub props: Option<String>,
    pub metadata: Option<String>,
}

impl PostRow {
    pub fn from_post(post: &Post) -> Result<Self> {
        Ok(Self {
            id: post.id.clone(),
            channel_id: post.channel_id.clone(),
            root_id: post.root_id.clone(),
            user_id: post.user_id.clone(),
            message: post.message.clone(),
            post_type: post.post_type.clone(),
            create_at: post.create_at,
            update_at: post.update_at,
            props: post.props.as_ref().map(serde_json::to_string).transpose()?,
            metadata: post.metadata.as_ref().map(serde_json::to_string).transpose()?,
        })
    }

    pub fn into_post(self) -> Result<Post> {
        let props: Option<Attributes> = self.props.as_deref().map(serde_json::from_str).transpose()?;
        let metadata: Option<PostMetadata> =
            self.metadata.as_deref().map(serde_json::from_str).transpose()?;

        Ok(Post {
            id: self.id,
            channel_id: self.channel_id,
            root_id: self.root_id,
            user_id: self.user_id,
            message: self.message,
            post_type: self.post_type,
            create_at: self.create_at,
            update_at: self.update_at,
            props,
            metadata,
        })
    }
}

/// Result of writing one post inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { id: String },
    Failed { id: String, error: String },
}

impl WriteOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Written { id } | Self::Failed { id, .. } => id,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}
