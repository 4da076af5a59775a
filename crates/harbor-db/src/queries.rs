use crate::Database;
use crate::models::{PostRow, WriteOutcome};
use anyhow::Result;
use harbor_types::models::Post;
use rusqlite::{Connection, Row, Transaction};
use tracing::{debug, warn};

const POST_COLUMNS: &str =
    "id, channel_id, root_id, user_id, message, post_type, create_at, update_at, props, metadata";

impl Database {
    // -- Writes --

    /// Upsert a batch of posts in one transaction.
    ///
    /// Every post replaces the stored row with the same id wholesale. A post
    /// that fails to write is rolled back on its own and reported as
    /// `WriteOutcome::Failed`; the rest of the batch still commits. `Err` is
    /// only returned when the transaction itself cannot be opened or committed.
    pub fn write_posts(&self, posts: &[Post]) -> Result<Vec<WriteOutcome>> {
        self.with_conn_mut(|conn| {
            let mut tx = conn.transaction()?;
            let mut outcomes = Vec::with_capacity(posts.len());

            for post in posts {
                match upsert_post(&mut tx, post) {
                    Ok(()) => outcomes.push(WriteOutcome::Written { id: post.id.clone() }),
                    Err(e) => {
                        warn!("Skipping post '{}': {}", post.id, e);
                        outcomes.push(WriteOutcome::Failed {
                            id: post.id.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            tx.commit()?;
            debug!(
                "Wrote {} of {} posts",
                outcomes.iter().filter(|o| o.is_written()).count(),
                posts.len()
            );
            Ok(outcomes)
        })
    }

    // -- Reads --

    pub fn get_post(&self, id: &str) -> Result<Option<Post>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                    [id],
                    post_row,
                )
                .optional()?;

            row.map(PostRow::into_post).transpose()
        })
    }

    /// Newest first.
    pub fn get_posts_in_channel(&self, channel_id: &str, limit: u32) -> Result<Vec<Post>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts
                     WHERE channel_id = ?1
                     ORDER BY create_at DESC, id DESC
                     LIMIT ?2"
                ),
                rusqlite::params![channel_id, limit],
            )
        })
    }

    /// Ids of a channel's stored posts, newest first.
    pub fn get_post_ids_in_channel(&self, channel_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM posts WHERE channel_id = ?1 ORDER BY create_at DESC, id DESC",
            )?;
            let ids = stmt
                .query_map([channel_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }

    /// A root post followed by its replies, oldest first.
    pub fn get_thread(&self, root_id: &str) -> Result<Vec<Post>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts
                     WHERE id = ?1 OR root_id = ?1
                     ORDER BY create_at ASC, id ASC"
                ),
                rusqlite::params![root_id],
            )
        })
    }

    pub fn count_posts(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

fn upsert_post(tx: &mut Transaction<'_>, post: &Post) -> Result<()> {
    let row = PostRow::from_post(post)?;

    // Rolls back on drop unless committed
    let sp = tx.savepoint()?;
    sp.execute(
        "INSERT INTO posts (id, channel_id, root_id, user_id, message, post_type, create_at, update_at, props, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            channel_id = excluded.channel_id,
            root_id    = excluded.root_id,
            user_id    = excluded.user_id,
            message    = excluded.message,
            post_type  = excluded.post_type,
            create_at  = excluded.create_at,
            update_at  = excluded.update_at,
            props      = excluded.props,
            metadata   = excluded.metadata",
        rusqlite::params![
            row.id,
            row.channel_id,
            row.root_id,
            row.user_id,
            row.message,
            row.post_type,
            row.create_at,
            row.update_at,
            row.props,
            row.metadata,
        ],
    )?;
    sp.commit()?;
    Ok(())
}

fn post_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        root_id: row.get(2)?,
        user_id: row.get(3)?,
        message: row.get(4)?,
        post_type: row.get(5)?,
        create_at: row.get(6)?,
        update_at: row.get(7)?,
        props: row.get(8)?,
        metadata: row.get(9)?,
    })
}

fn query_posts(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, post_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(PostRow::into_post).collect()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_types::models::{PostImage, PostMetadata};
    use serde_json::json;

    fn post(id: &str, channel_id: &str, create_at: i64) -> Post {
        Post {
            id: id.into(),
            channel_id: channel_id.into(),
            root_id: None,
            user_id: "u1".into(),
            message: format!("message {id}"),
            post_type: String::new(),
            create_at,
            update_at: create_at,
            props: None,
            metadata: None,
        }
    }

    #[test]
    fn upserting_same_payload_twice_keeps_one_row() {
        let db = Database::open_in_memory().unwrap();
        let mut p = post("p1", "c1", 10);
        p.props = json!({ "from_bot": "true" }).as_object().cloned();
        p.metadata = Some(PostMetadata {
            images: vec![PostImage { url: Some("https://img/1".into()), ..Default::default() }],
            ..Default::default()
        });

        db.write_posts(std::slice::from_ref(&p)).unwrap();
        db.write_posts(std::slice::from_ref(&p)).unwrap();

        assert_eq!(db.count_posts().unwrap(), 1);
        assert_eq!(db.get_post("p1").unwrap(), Some(p));
    }

    #[test]
    fn upsert_replaces_rather_than_merges() {
        let db = Database::open_in_memory().unwrap();
        let mut first = post("p1", "c1", 10);
        first.props = json!({ "attachments": [] }).as_object().cloned();
        first.metadata = Some(PostMetadata::default());
        db.write_posts(&[first]).unwrap();

        let mut second = post("p1", "c1", 10);
        second.message = "edited".into();
        db.write_posts(std::slice::from_ref(&second)).unwrap();

        let stored = db.get_post("p1").unwrap().unwrap();
        assert_eq!(stored, second);
        assert!(stored.props.is_none());
        assert!(stored.metadata.is_none());
    }

    #[test]
    fn failing_row_is_skipped_and_reported() {
        let db = Database::open_in_memory().unwrap();
        let posts = vec![post("p1", "c1", 1), post("", "c1", 2), post("p3", "c1", 3)];

        let outcomes = db.write_posts(&posts).unwrap();

        assert_eq!(db.count_posts().unwrap(), 2);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_written());
        assert!(matches!(&outcomes[1], WriteOutcome::Failed { id, .. } if id.is_empty()));
        assert!(outcomes[2].is_written());
    }

    #[test]
    fn channel_queries_are_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.write_posts(&[post("a", "c1", 1), post("b", "c1", 3), post("c", "c1", 2), post("x", "c2", 5)])
            .unwrap();

        assert_eq!(db.get_post_ids_in_channel("c1").unwrap(), vec!["b", "c", "a"]);

        let latest = db.get_posts_in_channel("c1", 2).unwrap();
        let ids: Vec<&str> = latest.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn thread_includes_root_and_replies() {
        let db = Database::open_in_memory().unwrap();
        let root = post("root", "c1", 1);
        let mut reply = post("reply", "c1", 2);
        reply.root_id = Some("root".into());
        db.write_posts(&[reply, root, post("other", "c1", 3)]).unwrap();

        let thread = db.get_thread("root").unwrap();
        let ids: Vec<&str> = thread.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "reply"]);
        assert!(thread[1].is_reply());
    }

    #[test]
    fn posts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harbor.db");

        {
            let db = Database::open(&path).unwrap();
            db.write_posts(&[post("p1", "c1", 1)]).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_post("p1").unwrap().map(|p| p.channel_id), Some("c1".to_string()));
    }
}
