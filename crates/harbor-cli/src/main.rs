mod config;

use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

use harbor_client::HttpClient;
use harbor_db::Database;
use harbor_sync::{BatchDispatcher, FetchOutcome, PostFetcher, Session};
use harbor_types::models::Post;

use config::{Cli, Command, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging; stdout is reserved for JSON output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "harbor=debug,harbor_sync=debug,harbor_db=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let db = Arc::new(Database::open(&cli.config.db_path)?);

    match cli.command {
        Command::Local { channel_id, limit } => print_posts(&db.get_posts_in_channel(&channel_id, limit)?),
        Command::LocalThread { root_id } => print_posts(&db.get_thread(&root_id)?),
        command => run_remote(&cli.config, command, db).await,
    }
}

async fn run_remote(config: &Config, command: Command, db: Arc<Database>) -> anyhow::Result<()> {
    let api = Arc::new(HttpClient::new(config.server_url()?, config.token()?)?);

    let session = Session::new(config.user_id()?);
    let viewing = config.channel_id.as_deref().or(command.channel_id());
    session.set_current_channel(viewing).await;

    let dispatcher = BatchDispatcher::new();
    let mut batches = dispatcher.subscribe();
    let fetcher = PostFetcher::new(api, db, session, Arc::new(dispatcher.clone()));

    let outcome = match command {
        Command::Page { channel_id, page, per_page } => {
            fetcher.get_posts(&channel_id, page, per_page).await?
        }
        Command::Since { channel_id, since } => fetcher.get_posts_since(&channel_id, since).await?,
        Command::Before { channel_id, post_id, page, per_page } => {
            fetcher.get_posts_before(&channel_id, &post_id, page, per_page).await?
        }
        Command::After { channel_id, post_id, page, per_page } => {
            fetcher.get_posts_after(&channel_id, &post_id, page, per_page).await?
        }
        Command::Around { channel_id, post_id, per_page } => {
            fetcher.get_posts_around(&channel_id, &post_id, per_page).await?
        }
        Command::Thread { root_id } => fetcher.get_post_thread(&root_id).await?,
        Command::Local { .. } | Command::LocalThread { .. } => {
            anyhow::bail!("local commands do not fetch")
        }
    };

    report(&outcome);

    let mut dispatched = Vec::new();
    while let Ok(batch) = batches.try_recv() {
        dispatched.push(batch);
    }

    let failed: Vec<_> = outcome
        .writes
        .iter()
        .filter(|w| !w.is_written())
        .map(|w| w.id())
        .collect();

    let output = json!({
        "delivery": format!("{:?}", outcome.delivery),
        "order": outcome.page.order,
        "failed_writes": failed,
        "batches": dispatched,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn report(outcome: &FetchOutcome) {
    let written = outcome.writes.iter().filter(|w| w.is_written()).count();
    info!(
        "Fetched {} posts, stored {}, delivery {:?}",
        outcome.page.posts.len(),
        written,
        outcome.delivery
    );
    if written < outcome.writes.len() {
        warn!("{} posts could not be stored", outcome.writes.len() - written);
    }
}

fn print_posts(posts: &[Post]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(posts)?);
    Ok(())
}
