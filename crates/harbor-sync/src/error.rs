use std::fmt;

use thiserror::Error;

use harbor_client::ClientError;

/// The retrieval strategy a fetch ran under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Page,
    Since,
    Before,
    After,
    Around,
    Thread,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Page => "page",
            Self::Since => "since",
            Self::Before => "before",
            Self::After => "after",
            Self::Around => "around",
            Self::Thread => "thread",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// A strategy call failed. Nothing was persisted or dispatched.
    #[error("{strategy} fetch failed: {source}")]
    Network {
        strategy: Strategy,
        #[source]
        source: ClientError,
    },
}

impl FetchError {
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Network { strategy, .. } => *strategy,
        }
    }
}
