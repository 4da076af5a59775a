//! Canonicalizes wire posts.
//!
//! The server sends `metadata.images`, `metadata.reactions`, `metadata.embeds`
//! and `embed.data.images` either as arrays or as objects keyed by url (or
//! some other key). Everything downstream of this module sees `Vec`s only.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use harbor_types::api::{PostListResponse, RawEmbed, RawPost, RawPostMetadata, WireList};
use harbor_types::models::{Attributes, EmbedData, Post, PostEmbed, PostImage, PostMetadata, PostPage};

pub fn normalize_page(resp: PostListResponse) -> PostPage {
    let posts = resp
        .posts
        .into_iter()
        .map(|(id, raw)| (id, normalize_post(raw)))
        .collect();

    PostPage {
        posts,
        order: resp.order,
        next_post_id: resp.next_post_id,
        prev_post_id: resp.prev_post_id,
    }
}

pub fn normalize_post(raw: RawPost) -> Post {
    Post {
        id: raw.id,
        channel_id: raw.channel_id,
        root_id: raw.root_id.filter(|id| !id.is_empty()),
        user_id: raw.user_id,
        message: raw.message,
        post_type: raw.post_type,
        create_at: raw.create_at,
        update_at: raw.update_at,
        props: raw.props.filter(|props| !props.is_empty()),
        metadata: raw.metadata.filter(|meta| !meta.is_empty()).map(normalize_metadata),
    }
}

fn normalize_metadata(raw: RawPostMetadata) -> PostMetadata {
    PostMetadata {
        files: raw.files.map(entries_from_wire),
        images: raw.images.map(images_from_wire).unwrap_or_default(),
        emojis: raw.emojis.map(entries_from_wire),
        reactions: raw.reactions.map(list_from_wire).unwrap_or_default(),
        embeds: raw.embeds.map(embeds_from_wire).unwrap_or_default(),
        extra: raw.extra,
    }
}

/// Keyed images become `{url: key, ..value}` in key order. A `url` inside the
/// value takes precedence over the key. Array entries are decoded as sent.
pub fn images_from_wire(images: WireList) -> Vec<PostImage> {
    match images {
        WireList::Seq(entries) => entries_from_wire(entries),
        WireList::Keyed(map) => map
            .into_iter()
            .map(|(key, value)| {
                let mut attributes = match value {
                    Value::Object(obj) => obj,
                    _ => Attributes::new(),
                };
                let url = match attributes.remove("url") {
                    Some(Value::String(url)) => url,
                    _ => key,
                };
                PostImage { url: Some(url), attributes }
            })
            .collect(),
    }
}

/// Keyed lists keep only their values, in key order. Entries that do not
/// decode are dropped in either shape.
pub fn list_from_wire<T: DeserializeOwned>(list: WireList) -> Vec<T> {
    match list {
        WireList::Seq(entries) => entries_from_wire(entries),
        WireList::Keyed(map) => map
            .into_iter()
            .filter_map(|(key, value)| decode_entry(&key, value))
            .collect(),
    }
}

fn entries_from_wire<T: DeserializeOwned>(entries: Vec<Value>) -> Vec<T> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| decode_entry(&index.to_string(), value))
        .collect()
}

fn decode_entry<T: DeserializeOwned>(key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(item) => Some(item),
        Err(e) => {
            warn!("Dropping list entry '{}': {}", key, e);
            None
        }
    }
}

fn embeds_from_wire(embeds: WireList) -> Vec<PostEmbed> {
    let entries: Vec<Value> = match embeds {
        WireList::Seq(entries) => entries,
        WireList::Keyed(map) => map.into_iter().map(|(_, value)| value).collect(),
    };

    entries
        .into_iter()
        .filter(is_truthy)
        .filter_map(|entry| match serde_json::from_value::<RawEmbed>(entry) {
            Ok(embed) => Some(normalize_embed(embed)),
            Err(e) => {
                warn!("Dropping malformed embed: {}", e);
                None
            }
        })
        .collect()
}

fn normalize_embed(raw: RawEmbed) -> PostEmbed {
    PostEmbed {
        embed_type: raw.embed_type,
        url: raw.url,
        data: raw.data.map(|data| EmbedData {
            images: data.images.map(images_from_wire).unwrap_or_default(),
            extra: data.extra,
        }),
        extra: raw.extra,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
