//! Storage policies service.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::endpoints::Endpoint;
use crate::error::{Error, ErrorDomain, Result};
use crate::models::StoragePolicyCreate;
use crate::response::{self, as_id};

use super::{ApiContext, EntityMap, Fetcher, Lister, Mutator};

/// Storage policies of the commcell.
pub struct StoragePolicies {
    ctx: ApiContext,
    all: RwLock<EntityMap>,
}

impl std::fmt::Debug for StoragePolicies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoragePolicies")
            .field("count", &self.all.read().len())
            .finish_non_exhaustive()
    }
}

impl StoragePolicies {
    pub(crate) async fn load(ctx: ApiContext) -> Result<Self> {
        let policies = Self {
            ctx,
            all: RwLock::new(EntityMap::new()),
        };
        policies.refresh().await?;
        Ok(policies)
    }

    fn not_found(name: &str) -> Error {
        Error::not_found(ErrorDomain::Storage, "policy", name.to_lowercase())
    }
}

#[async_trait]
impl Lister for StoragePolicies {
    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<()> {
        let url = format!("{}?getAll=TRUE", self.ctx.endpoints.url(Endpoint::StoragePolicies));
        let value = self.ctx.http.get(&url, ErrorDomain::Storage).await?;

        let mut map = EntityMap::new();
        for policy in value
            .get("policies")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if let (Some(name), Some(id)) = (
                policy.get("storagePolicyName").and_then(Value::as_str),
                policy.get("storagePolicyId").and_then(as_id),
            ) {
                map.insert(name, json!(id));
            }
        }

        debug!(count = map.len(), "Refreshed storage policies");
        *self.all.write() = map;
        Ok(())
    }

    fn all(&self) -> EntityMap {
        self.all.read().clone()
    }
}

#[async_trait]
impl Fetcher for StoragePolicies {
    type Item = StoragePolicy;

    async fn get(&self, name: &str) -> Result<StoragePolicy> {
        let id = self
            .all
            .read()
            .get(name)
            .and_then(as_id)
            .ok_or_else(|| Self::not_found(name))?;

        let url = self.ctx.endpoints.format(Endpoint::StoragePolicy, &[&id]);
        let properties = self.ctx.http.get(&url, ErrorDomain::Storage).await?;
        Ok(StoragePolicy {
            name: name.to_lowercase(),
            id,
            properties,
        })
    }
}

#[async_trait]
impl Mutator for StoragePolicies {
    type Request = StoragePolicyCreate;
    type Item = StoragePolicy;

    /// Creates a disk storage policy.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use commcell_sdk::{Commcell, Mutator};
    /// # use commcell_sdk::models::StoragePolicyCreate;
    /// # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
    /// let policies = commcell.storage_policies().await?;
    /// let request = StoragePolicyCreate::new("Gold-30d", "DiskLib01", "ma01", 30)
    ///     .with_dedup_path("/ddb/gold")
    ///     .with_streams(4);
    /// let policy = policies.add(request).await?;
    /// println!("created policy {}", policy.id());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn add(&self, request: StoragePolicyCreate) -> Result<StoragePolicy> {
        if self.has(&request.name) {
            return Err(Error::already_exists(
                ErrorDomain::Storage,
                "Storage policy",
                &request.name,
            ));
        }

        let url = self.ctx.endpoints.url(Endpoint::StoragePolicies);
        let value = self
            .ctx
            .http
            .post(url, &request.to_json(), ErrorDomain::Storage)
            .await?;

        if value.pointer("/error/errorCode").and_then(response::error_code_value) != Some(0) {
            let message = value
                .pointer("/error/errorMessage")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Err(Error::operation(
                ErrorDomain::Storage,
                102,
                format!("Failed to create storage policy\nError: \"{message}\""),
            ));
        }

        self.refresh().await?;
        self.get(&request.name).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> Result<()> {
        if !self.has(name) {
            return Err(Self::not_found(name));
        }

        let url = self.ctx.endpoints.format(Endpoint::StoragePolicy, &[&name]);
        let (ok, raw) = self.ctx.http.dispatch(Method::DELETE, &url, None).await?;
        if !ok {
            return Err(Error::response(
                raw.status.as_u16(),
                response::extract_title(&raw.text()),
            ));
        }

        // The server answers with JSON on failure and plain text on success.
        let text = raw.text();
        let failure = match serde_json::from_str::<Value>(&text) {
            Ok(value) => value
                .get("errorCode")
                .and_then(response::error_code_value)
                .filter(|code| *code != 0)
                .and(value.get("errorMessage").and_then(Value::as_str))
                .map(str::to_string),
            Err(_) if text.trim().is_empty() => return Err(Error::EmptyResponse { detail: None }),
            Err(_) => (text.contains("errorCode") && text.contains("errorMessage"))
                .then(|| text.trim().to_string()),
        };
        if let Some(message) = failure {
            return Err(Error::operation(
                ErrorDomain::Storage,
                102,
                format!("Failed to delete storage policy\nError: \"{message}\""),
            ));
        }

        self.refresh().await
    }
}

/// One storage policy.
#[derive(Debug, Clone)]
pub struct StoragePolicy {
    name: String,
    id: u64,
    properties: Value,
}

impl StoragePolicy {
    /// Lower-cased policy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Policy id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Names of the copies of this policy, lower-cased.
    #[must_use]
    pub fn copy_names(&self) -> Vec<String> {
        self.properties
            .get("copy")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|c| c.pointer("/StoragePolicyCopy/copyName").and_then(Value::as_str))
            .map(str::to_lowercase)
            .collect()
    }

    /// Returns true if the policy has a copy named `name`.
    #[must_use]
    pub fn has_copy(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.copy_names().iter().any(|c| *c == name)
    }

    /// Raw policy properties.
    #[must_use]
    pub fn properties(&self) -> &Value {
        &self.properties
    }
}
