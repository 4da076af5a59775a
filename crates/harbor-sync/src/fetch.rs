use std::sync::Arc;

use tracing::{debug, error, info};

use harbor_client::{Direction, PostsApi};
use harbor_db::{Database, WriteOutcome};
use harbor_types::actions::StateAction;
use harbor_types::api::PostListResponse;
use harbor_types::models::{Post, PostPage};

use crate::batch::{ActionSink, batch_actions};
use crate::error::{FetchError, Strategy};
use crate::mentions::{AtMentionExtractor, MentionExtractor};
use crate::normalize::normalize_page;
use crate::resolve::{DependencyRequest, resolve_dependencies};
use crate::session::Session;

/// Default page size for every strategy. The around strategy asks for half of
/// it on each side of the anchor.
pub const POST_CHUNK_SIZE: u32 = 60;

/// What happened to a successful fetch after it was persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Posts and their dependencies went out as one batch.
    Dispatched,
    /// The viewed channel changed; posts were stored but not dispatched.
    StaleChannel,
    /// The server returned no posts.
    Empty,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub page: PostPage,
    /// One entry per stored post, in display order. Empty when nothing was
    /// fetched.
    pub writes: Vec<WriteOutcome>,
    pub delivery: Delivery,
}

/// Runs the retrieval strategies against explicit store, session and sink
/// handles.
#[derive(Clone)]
pub struct PostFetcher {
    api: Arc<dyn PostsApi>,
    db: Arc<Database>,
    session: Session,
    sink: Arc<dyn ActionSink>,
    mentions: Arc<dyn MentionExtractor>,
}

impl PostFetcher {
    pub fn new(
        api: Arc<dyn PostsApi>,
        db: Arc<Database>,
        session: Session,
        sink: Arc<dyn ActionSink>,
    ) -> Self {
        Self {
            api,
            db,
            session,
            sink,
            mentions: Arc::new(AtMentionExtractor),
        }
    }

    pub fn with_mention_extractor(mut self, mentions: Arc<dyn MentionExtractor>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// A page of a channel's posts, newest first.
    pub async fn get_posts(
        &self,
        channel_id: &str,
        page: u32,
        per_page: Option<u32>,
    ) -> Result<FetchOutcome, FetchError> {
        let per_page = per_page.unwrap_or(POST_CHUNK_SIZE);
        debug!("Fetching page {} ({} per page) of channel {}", page, per_page, channel_id);

        let resp = self
            .api
            .get_posts(channel_id, page, per_page)
            .await
            .map_err(network(Strategy::Page))?;

        let page_data = normalize_page(resp);
        let action = StateAction::ReceivedPostsInChannel {
            channel_id: channel_id.to_string(),
            order: page_data.order.clone(),
            recent: page == 0,
            oldest: page_data.prev_post_id.is_empty(),
        };
        self.deliver(Strategy::Page, channel_id, page_data, action).await
    }

    /// Posts created or updated after `since` (ms since epoch).
    pub async fn get_posts_since(
        &self,
        channel_id: &str,
        since: i64,
    ) -> Result<FetchOutcome, FetchError> {
        debug!("Fetching posts of channel {} since {}", channel_id, since);

        let resp = self
            .api
            .get_posts_since(channel_id, since)
            .await
            .map_err(network(Strategy::Since))?;

        let page_data = normalize_page(resp);
        let action = StateAction::ReceivedPostsSince {
            channel_id: channel_id.to_string(),
            order: page_data.order.clone(),
        };
        self.deliver(Strategy::Since, channel_id, page_data, action).await
    }

    /// A page of posts older than `post_id`.
    pub async fn get_posts_before(
        &self,
        channel_id: &str,
        post_id: &str,
        page: u32,
        per_page: Option<u32>,
    ) -> Result<FetchOutcome, FetchError> {
        let per_page = per_page.unwrap_or(POST_CHUNK_SIZE);
        debug!("Fetching posts of channel {} before {}", channel_id, post_id);

        let resp = self
            .api
            .get_posts_anchored(channel_id, post_id, Direction::Before, page, per_page)
            .await
            .map_err(network(Strategy::Before))?;

        let page_data = normalize_page(resp);
        let action = StateAction::ReceivedPostsBefore {
            channel_id: channel_id.to_string(),
            before_post_id: post_id.to_string(),
            order: page_data.order.clone(),
            oldest: page_data.prev_post_id.is_empty(),
        };
        self.deliver(Strategy::Before, channel_id, page_data, action).await
    }

    /// A page of posts newer than `post_id`.
    pub async fn get_posts_after(
        &self,
        channel_id: &str,
        post_id: &str,
        page: u32,
        per_page: Option<u32>,
    ) -> Result<FetchOutcome, FetchError> {
        let per_page = per_page.unwrap_or(POST_CHUNK_SIZE);
        debug!("Fetching posts of channel {} after {}", channel_id, post_id);

        let resp = self
            .api
            .get_posts_anchored(channel_id, post_id, Direction::After, page, per_page)
            .await
            .map_err(network(Strategy::After))?;

        let page_data = normalize_page(resp);
        let action = StateAction::ReceivedPostsAfter {
            channel_id: channel_id.to_string(),
            after_post_id: post_id.to_string(),
            order: page_data.order.clone(),
            newest: page_data.next_post_id.is_empty(),
        };
        self.deliver(Strategy::After, channel_id, page_data, action).await
    }

    /// Posts on both sides of `post_id` plus its thread, as one page.
    pub async fn get_posts_around(
        &self,
        channel_id: &str,
        post_id: &str,
        per_page: Option<u32>,
    ) -> Result<FetchOutcome, FetchError> {
        let per_page = per_page.unwrap_or(POST_CHUNK_SIZE / 2);
        debug!("Fetching posts of channel {} around {}", channel_id, post_id);

        let (before, thread, after) = tokio::try_join!(
            self.api.get_posts_anchored(channel_id, post_id, Direction::Before, 0, per_page),
            self.api.get_post_thread(post_id),
            self.api.get_posts_anchored(channel_id, post_id, Direction::After, 0, per_page),
        )
        .map_err(network(Strategy::Around))?;

        let recent = after.next_post_id.is_empty();
        let oldest = before.prev_post_id.is_empty();

        let page_data = normalize_page(merge_around(post_id, before, thread, after));
        let action = StateAction::ReceivedPostsInChannel {
            channel_id: channel_id.to_string(),
            order: page_data.order.clone(),
            recent,
            oldest,
        };
        self.deliver(Strategy::Around, channel_id, page_data, action).await
    }

    /// A root post and its replies. The channel is taken from the posts
    /// themselves, so a thread opened from a channel that is no longer
    /// viewed is stored but not dispatched.
    pub async fn get_post_thread(&self, root_id: &str) -> Result<FetchOutcome, FetchError> {
        debug!("Fetching thread {}", root_id);

        let resp = self
            .api
            .get_post_thread(root_id)
            .await
            .map_err(network(Strategy::Thread))?;

        let page_data = normalize_page(resp);
        let channel_id = page_data
            .first_post()
            .map(|post| post.channel_id.clone())
            .unwrap_or_default();
        let action = StateAction::ReceivedPostsInThread {
            root_id: root_id.to_string(),
            order: page_data.order.clone(),
        };
        self.deliver(Strategy::Thread, &channel_id, page_data, action).await
    }

    /// Persist, then dispatch if `channel_id` is still on screen.
    async fn deliver(
        &self,
        strategy: Strategy,
        channel_id: &str,
        page: PostPage,
        action: StateAction,
    ) -> Result<FetchOutcome, FetchError> {
        if page.is_empty() {
            debug!("{} fetch for channel {} returned no posts", strategy, channel_id);
            return Ok(FetchOutcome {
                page,
                writes: Vec::new(),
                delivery: Delivery::Empty,
            });
        }

        let posts: Vec<Post> = page.ordered_posts().into_iter().cloned().collect();

        // Always stored, even for channels nobody is looking at
        let writes = self.persist(posts.clone()).await;

        if !self.is_viewed(channel_id).await {
            info!(
                "Channel {} is no longer viewed, skipping {} delivery of {} posts",
                channel_id,
                strategy,
                posts.len()
            );
            return Ok(FetchOutcome {
                page,
                writes,
                delivery: Delivery::StaleChannel,
            });
        }

        let users = self.session.snapshot().await;
        let request = DependencyRequest::from_posts(&posts, &users, self.mentions.as_ref());
        let dependencies =
            resolve_dependencies(self.api.as_ref(), &request, &users.current_user_id).await;

        // The view may have moved on while dependencies were in flight
        if !self.is_viewed(channel_id).await {
            info!("Channel {} changed during dependency resolution, dropping batch", channel_id);
            return Ok(FetchOutcome {
                page,
                writes,
                delivery: Delivery::StaleChannel,
            });
        }

        let primary = vec![StateAction::ReceivedPosts { page: page.clone() }, action];
        let batch = batch_actions(primary, dependencies);
        debug!("Dispatching {} actions for {} fetch of channel {}", batch.len(), strategy, channel_id);
        self.sink.dispatch(batch);

        Ok(FetchOutcome {
            page,
            writes,
            delivery: Delivery::Dispatched,
        })
    }

    async fn is_viewed(&self, channel_id: &str) -> bool {
        self.session.current_channel_id().await.as_deref() == Some(channel_id)
    }

    /// Write on the blocking pool and wait for the commit.
    async fn persist(&self, posts: Vec<Post>) -> Vec<WriteOutcome> {
        let ids: Vec<String> = posts.iter().map(|post| post.id.clone()).collect();
        let db = self.db.clone();

        let error = match tokio::task::spawn_blocking(move || db.write_posts(&posts)).await {
            Ok(Ok(outcomes)) => return outcomes,
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("spawn_blocking join error: {}", e),
        };

        error!("Failed to persist {} posts: {}", ids.len(), error);
        ids.into_iter()
            .map(|id| WriteOutcome::Failed { id, error: error.clone() })
            .collect()
    }
}

fn network(strategy: Strategy) -> impl FnOnce(harbor_client::ClientError) -> FetchError {
    move |source| FetchError::Network { strategy, source }
}

/// Merge the three around-anchor responses into one page.
///
/// Order is `after ++ [anchor] ++ before`. On id collisions the thread
/// response overrides `after` and `before` overrides both.
pub fn merge_around(
    anchor: &str,
    before: PostListResponse,
    thread: PostListResponse,
    after: PostListResponse,
) -> PostListResponse {
    let mut posts = after.posts;
    posts.extend(thread.posts);
    posts.extend(before.posts);

    let mut order = after.order;
    order.push(anchor.to_string());
    order.extend(before.order);

    PostListResponse {
        posts,
        order,
        next_post_id: after.next_post_id,
        prev_post_id: before.prev_post_id,
    }
}
