//! Wire shapes as the server sends them.
//!
//! These types are only ever produced by decoding a response body and only
//! ever consumed by the normalizer in `harbor-sync`. Nothing past the
//! normalizer should see a `WireList`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::Attributes;

/// A list the server sends either as an array or as an object keyed by
/// some identifying field (image url, reaction key, ...).
///
/// Entries stay undecoded so one malformed entry costs only itself, never
/// the post or the page around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireList {
    Seq(Vec<Value>),
    Keyed(Map<String, Value>),
}

// -- Posts --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub channel_id: String,
    /// Empty string on the wire means "not a reply".
    #[serde(default)]
    pub root_id: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub post_type: String,
    #[serde(default)]
    pub create_at: i64,
    #[serde(default)]
    pub update_at: i64,
    #[serde(default)]
    pub props: Option<Attributes>,
    #[serde(default)]
    pub metadata: Option<RawPostMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPostMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<WireList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emojis: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<WireList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeds: Option<WireList>,
    #[serde(flatten)]
    pub extra: Attributes,
}

impl RawPostMetadata {
    /// True when the server sent `{}` (or only null-valued known keys).
    pub fn is_empty(&self) -> bool {
        self.files.is_none()
            && self.images.is_none()
            && self.emojis.is_none()
            && self.reactions.is_none()
            && self.embeds.is_none()
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEmbed {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub embed_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RawEmbedData>,
    #[serde(flatten)]
    pub extra: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEmbedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<WireList>,
    #[serde(flatten)]
    pub extra: Attributes,
}

/// Response body of every post listing endpoint.
///
/// `since` and thread responses carry no cursors; both default to `""`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostListResponse {
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub posts: HashMap<String, RawPost>,
    #[serde(default)]
    pub next_post_id: String,
    #[serde(default)]
    pub prev_post_id: String,
}
