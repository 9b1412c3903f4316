//! eDiscovery crawl job types.

/// Entity a crawl job runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlTarget {
    /// An inventory, or one asset of it.
    Inventory,
    /// An eDiscovery client (file server, project).
    Client,
}

impl CrawlTarget {
    /// Value of the `type` query parameter.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Inventory => 0,
            Self::Client => 1,
        }
    }
}

/// State of a crawl job as reported by the job status call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlJobState {
    /// The job is running.
    Running,
    /// The job finished.
    Completed,
    /// The job finished with errors.
    CompletedWithError,
    /// The job stopped, aborted or cannot make progress.
    Failed(u8),
    /// A state code this crate does not know; treated as still running.
    Other(i64),
}

impl CrawlJobState {
    /// Maps a server state code.
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Running,
            1 => Self::Completed,
            10 => Self::CompletedWithError,
            2..=9 => Self::Failed(u8::try_from(code).unwrap_or_default()),
            other => Self::Other(other),
        }
    }

    /// Returns true for states that end the wait loop.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithError | Self::Failed(_)
        )
    }
}
