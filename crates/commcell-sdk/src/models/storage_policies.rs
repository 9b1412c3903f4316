//! Storage policy request types.

use serde_json::{json, Value};

/// Request to create a storage policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePolicyCreate {
    /// Policy name.
    pub name: String,
    /// Disk library name.
    pub library: String,
    /// Media agent name.
    pub media_agent: String,
    /// Days to retain backup data.
    pub retention_days: u32,
    /// Create a disaster recovery policy.
    pub dr_policy: bool,
    /// Deduplication database path, enabling deduplication.
    pub dedup_path: Option<String>,
    /// Media agent hosting the deduplication database. Defaults to `media_agent`.
    pub dedup_media_agent: Option<String>,
    /// Number of device streams.
    pub number_of_streams: Option<u32>,
    /// Incremental storage policy name.
    pub incremental_policy: Option<String>,
}

impl StoragePolicyCreate {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        library: impl Into<String>,
        media_agent: impl Into<String>,
        retention_days: u32,
    ) -> Self {
        Self {
            name: name.into(),
            library: library.into(),
            media_agent: media_agent.into(),
            retention_days,
            dr_policy: false,
            dedup_path: None,
            dedup_media_agent: None,
            number_of_streams: None,
            incremental_policy: None,
        }
    }

    /// Marks the policy as a disaster recovery policy.
    #[must_use]
    pub fn with_dr_policy(mut self, dr: bool) -> Self {
        self.dr_policy = dr;
        self
    }

    /// Enables deduplication with the given database path.
    #[must_use]
    pub fn with_dedup_path(mut self, path: impl Into<String>) -> Self {
        self.dedup_path = Some(path.into());
        self
    }

    /// Hosts the deduplication database on another media agent.
    #[must_use]
    pub fn with_dedup_media_agent(mut self, media_agent: impl Into<String>) -> Self {
        self.dedup_media_agent = Some(media_agent.into());
        self
    }

    /// Sets the number of device streams.
    #[must_use]
    pub fn with_streams(mut self, streams: u32) -> Self {
        self.number_of_streams = Some(streams);
        self
    }

    /// Sets the incremental storage policy.
    #[must_use]
    pub fn with_incremental_policy(mut self, policy: impl Into<String>) -> Self {
        self.incremental_policy = Some(policy.into());
        self
    }

    /// Builds the request body.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "storagePolicyCopyInfo": {
                "library": {"libraryName": self.library},
                "mediaAgent": {"mediaAgentName": self.media_agent},
                "retentionRules": {"retainBackupDataForDays": self.retention_days}
            },
            "storagePolicyName": self.name,
            "type": if self.dr_policy { 2 } else { 1 }
        });

        if let Some(path) = &self.dedup_path {
            let dedup_ma = self.dedup_media_agent.as_ref().unwrap_or(&self.media_agent);
            body["storagePolicyCopyInfo"]["dedupeFlags"] = json!({"enableDeduplication": 1});
            body["storagePolicyCopyInfo"]["DDBPartitionInfo"] = json!({
                "maInfoList": [{
                    "mediaAgent": {"mediaAgentName": dedup_ma},
                    "subStoreList": [{"accessPath": {"path": path}}]
                }]
            });
        }
        if let Some(streams) = self.number_of_streams {
            body["numberOfStreams"] = json!(streams);
        }
        if let Some(policy) = &self.incremental_policy {
            body["incrementalStoragePolicy"] = json!({"storagePolicyName": policy});
        }
        body
    }
}
