use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (posts)");
        // props and metadata hold JSON; nested metadata has no identity
        // outside its post, so it lives in the post row.
        conn.execute_batch(
            "
            CREATE TABLE posts (
                id          TEXT PRIMARY KEY CHECK (id <> ''),
                channel_id  TEXT NOT NULL CHECK (channel_id <> ''),
                root_id     TEXT,
                user_id     TEXT NOT NULL,
                message     TEXT NOT NULL,
                post_type   TEXT NOT NULL,
                create_at   INTEGER NOT NULL DEFAULT 0,
                update_at   INTEGER NOT NULL DEFAULT 0,
                props       TEXT,
                metadata    TEXT
            );

            CREATE INDEX idx_posts_channel
                ON posts(channel_id, create_at);

            CREATE INDEX idx_posts_root
                ON posts(root_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
