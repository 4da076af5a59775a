//! Fetch, normalize, persist and deliver channel posts.
//!
//! [`fetch::PostFetcher`] is the entry point: each of its strategies pulls a
//! page from the server, normalizes it, writes it to the local store and, when
//! the page belongs to the channel being viewed, dispatches it together with
//! the author profiles and statuses it depends on as one [`ActionBatch`].
//!
//! [`ActionBatch`]: harbor_types::actions::ActionBatch

pub mod batch;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod mentions;
pub mod normalize;
pub mod resolve;
pub mod session;

pub use batch::ActionSink;
pub use dispatch::BatchDispatcher;
pub use error::{FetchError, Strategy};
pub use fetch::{Delivery, FetchOutcome, POST_CHUNK_SIZE, PostFetcher};
pub use mentions::{AtMentionExtractor, MentionExtractor};
pub use session::{Session, UsersSnapshot};
