use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields Harbor does not read but must carry through untouched.
pub type Attributes = Map<String, Value>;

/// A normalized post, as stored locally and delivered to observers.
///
/// `props` and `metadata` are either meaningful or absent: an empty object
/// never survives normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub post_type: String,
    #[serde(default)]
    pub create_at: i64,
    #[serde(default)]
    pub update_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PostMetadata>,
}

impl Post {
    pub fn is_reply(&self) -> bool {
        self.root_id.is_some()
    }
}

/// Post metadata with every list in its canonical, ordered form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostMetadata {
    /// Absent when the server sent no file list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileInfo>>,
    #[serde(default)]
    pub images: Vec<PostImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emojis: Option<Vec<CustomEmoji>>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub embeds: Vec<PostEmbed>,
    #[serde(flatten)]
    pub extra: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Attributes,
}

/// An image referenced by a post, keyed by its url.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomEmoji {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostEmbed {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub embed_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EmbedData>,
    #[serde(flatten)]
    pub extra: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedData {
    #[serde(default)]
    pub images: Vec<PostImage>,
    #[serde(flatten)]
    pub extra: Attributes,
}

/// One page of normalized posts plus its paging cursors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: HashMap<String, Post>,
    pub order: Vec<String>,
    #[serde(default)]
    pub next_post_id: String,
    #[serde(default)]
    pub prev_post_id: String,
}

impl PostPage {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Posts in display order, followed by any posts the order does not
    /// mention (sorted by id so the result is stable).
    pub fn ordered_posts(&self) -> Vec<&Post> {
        let mut seen = std::collections::HashSet::new();
        let mut out: Vec<&Post> = self
            .order
            .iter()
            .filter_map(|id| self.posts.get(id))
            .filter(|post| seen.insert(post.id.as_str()))
            .collect();

        let mut rest: Vec<&Post> = self
            .posts
            .values()
            .filter(|post| !seen.contains(post.id.as_str()))
            .collect();
        rest.sort_by(|a, b| a.id.cmp(&b.id));
        out.extend(rest);
        out
    }

    /// The first post in display order, if any.
    pub fn first_post(&self) -> Option<&Post> {
        self.ordered_posts().into_iter().next()
    }
}

/// A cached user profile. Owned by the user cache; Harbor only reads the id
/// and the username.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(flatten)]
    pub extra: Attributes,
}

/// A cached presence status (`online`, `away`, `dnd`, `offline`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    pub user_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: Attributes,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str) -> Post {
        Post {
            id: id.into(),
            channel_id: "c1".into(),
            root_id: None,
            user_id: "u1".into(),
            message: String::new(),
            post_type: String::new(),
            create_at: 0,
            update_at: 0,
            props: None,
            metadata: None,
        }
    }

    #[test]
    fn ordered_posts_follow_order_then_leftovers() {
        let mut page = PostPage::default();
        for id in ["a", "b", "c", "z"] {
            page.posts.insert(id.into(), post(id));
        }
        page.order = vec!["c".into(), "missing".into(), "a".into()];

        let ids: Vec<&str> = page.ordered_posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b", "z"]);
        assert_eq!(page.first_post().map(|p| p.id.as_str()), Some("c"));
    }

    #[test]
    fn absent_props_and_metadata_are_not_serialized() {
        let value = serde_json::to_value(post("a")).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("props"));
        assert!(!obj.contains_key("metadata"));
        assert!(!obj.contains_key("root_id"));
    }
}
