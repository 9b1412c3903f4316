//! Feature wrappers over the Commcell REST API.
//!
//! Every collection keeps the last fetched list in an [`EntityMap`] and
//! exposes the capabilities it supports through [`Lister`], [`Fetcher`] and
//! [`Mutator`].

mod auth;
mod blr_pairs;
mod client_groups;
mod clients;
mod commserv;
mod datacube;
mod ediscovery;
mod qcommand;
mod schedules;
mod storage_policies;
mod tags;

pub(crate) use auth::AuthService;
pub(crate) use commserv::CommServService;
pub(crate) use qcommand::QcommandService;

pub use blr_pairs::{BlrPair, BlrPairs};
pub use client_groups::{ClientGroup, ClientGroups};
pub use clients::{Client, Clients};
pub use datacube::{Datacube, Datasource, Datasources};
pub use ediscovery::CrawlJob;
pub use schedules::{Schedule, Schedules};
pub use storage_policies::{StoragePolicies, StoragePolicy};
pub use tags::{Tag, Tags};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

use super::endpoints::Endpoints;
use super::http::HttpClient;

/// Transport and endpoint map shared by every wrapper of one session.
#[derive(Debug, Clone)]
pub(crate) struct ApiContext {
    pub(crate) http: Arc<HttpClient>,
    pub(crate) endpoints: Arc<Endpoints>,
}

impl ApiContext {
    pub(crate) fn new(http: Arc<HttpClient>, endpoints: Arc<Endpoints>) -> Self {
        Self { http, endpoints }
    }
}

/// Name-keyed view of the last fetched entity list.
///
/// Keys are lower-cased unless the map was created case sensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMap {
    entries: BTreeMap<String, Value>,
    case_sensitive: bool,
}

impl EntityMap {
    /// Creates an empty, case insensitive map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map that keeps names as given.
    #[must_use]
    pub fn case_sensitive() -> Self {
        Self {
            entries: BTreeMap::new(),
            case_sensitive: true,
        }
    }

    fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Inserts the properties of one entity.
    pub fn insert(&mut self, name: &str, properties: Value) {
        let key = self.key(name);
        self.entries.insert(key, properties);
    }

    /// Returns the properties stored for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(&self.key(name))
    }

    /// Returns true if `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&self.key(name))
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over stored names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over `(name, properties)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A collection whose full list can be fetched and inspected.
#[async_trait]
pub trait Lister: Send + Sync {
    /// Re-fetches the full list from the server.
    async fn refresh(&self) -> Result<()>;

    /// Snapshot of the last fetched list.
    fn all(&self) -> EntityMap;

    /// Returns true if `name` was present in the last fetched list.
    fn has(&self, name: &str) -> bool {
        self.all().contains(name)
    }
}

/// A collection that can produce a wrapper for one entity.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Wrapper type for a single entity.
    type Item;

    /// Returns the wrapper for `name`, or a not found error.
    async fn get(&self, name: &str) -> Result<Self::Item>;
}

/// A collection that supports creating and deleting entities.
#[async_trait]
pub trait Mutator: Send + Sync {
    /// Arguments for creating an entity.
    type Request: Send + Sync;
    /// Wrapper returned for the created entity.
    type Item;

    /// Creates an entity and refreshes the list.
    async fn add(&self, request: Self::Request) -> Result<Self::Item>;

    /// Deletes the entity named `name` and refreshes the list.
    async fn delete(&self, name: &str) -> Result<()>;
}
