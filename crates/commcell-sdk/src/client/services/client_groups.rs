//! Client groups service.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::endpoints::Endpoint;
use crate::error::{Error, ErrorDomain, Result};
use crate::models::ClientGroupCreate;
use crate::response::{self, as_id};

use super::{ApiContext, Clients, EntityMap, Fetcher, Lister, Mutator};

/// Client groups of the commcell.
///
/// # Example
///
/// ```rust,no_run
/// # use commcell_sdk::{Commcell, Lister, Mutator};
/// # use commcell_sdk::models::ClientGroupCreate;
/// # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
/// let groups = commcell.client_groups().await?;
/// let request = ClientGroupCreate::new("Linux Servers")
///     .with_clients(["web01", "web02"])
///     .with_description("Front end hosts");
/// let group = groups.add(request).await?;
/// assert!(groups.has("linux servers"));
/// println!("{} has {} clients", group.name(), group.associated_clients().len());
/// # Ok(())
/// # }
/// ```
pub struct ClientGroups {
    ctx: ApiContext,
    clients: Arc<Clients>,
    all: RwLock<EntityMap>,
}

impl std::fmt::Debug for ClientGroups {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientGroups")
            .field("count", &self.all.read().len())
            .finish_non_exhaustive()
    }
}

impl ClientGroups {
    pub(crate) async fn load(ctx: ApiContext, clients: Arc<Clients>) -> Result<Self> {
        let groups = Self {
            ctx,
            clients,
            all: RwLock::new(EntityMap::new()),
        };
        groups.refresh().await?;
        Ok(groups)
    }

    fn id_of(&self, name: &str) -> Option<u64> {
        self.all.read().get(name).and_then(as_id)
    }

    /// Keeps only the clients the commcell knows, lower-cased.
    fn valid_clients(&self, clients: &[String]) -> Vec<String> {
        clients
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| self.clients.has_client(c))
            .collect()
    }
}

#[async_trait]
impl Lister for ClientGroups {
    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<()> {
        let url = self.ctx.endpoints.url(Endpoint::ClientGroups);
        let value = self.ctx.http.get(url, ErrorDomain::ClientGroup).await?;

        let mut map = EntityMap::new();
        for group in response::require(&value, "groups")?
            .as_array()
            .into_iter()
            .flatten()
        {
            if let (Some(name), Some(id)) = (
                group.get("name").and_then(Value::as_str),
                group.get("Id").and_then(as_id),
            ) {
                map.insert(name, json!(id));
            }
        }

        debug!(count = map.len(), "Refreshed client groups");
        *self.all.write() = map;
        Ok(())
    }

    fn all(&self) -> EntityMap {
        self.all.read().clone()
    }
}

#[async_trait]
impl Fetcher for ClientGroups {
    type Item = ClientGroup;

    async fn get(&self, name: &str) -> Result<ClientGroup> {
        let id = self.id_of(name).ok_or_else(|| {
            Error::not_found(ErrorDomain::ClientGroup, "ClientGroup", name.to_lowercase())
        })?;
        ClientGroup::load(self.ctx.clone(), id).await
    }
}

#[async_trait]
impl Mutator for ClientGroups {
    type Request = ClientGroupCreate;
    type Item = ClientGroup;

    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn add(&self, request: ClientGroupCreate) -> Result<ClientGroup> {
        if self.has(&request.name) {
            return Err(Error::operation(
                ErrorDomain::ClientGroup,
                102,
                format!("Client Group \"{}\" already exists.", request.name),
            ));
        }

        let clients = self.valid_clients(&request.clients);
        let url = self.ctx.endpoints.url(Endpoint::ClientGroups);
        let value = self
            .ctx
            .http
            .post(url, &request.to_json(&clients), ErrorDomain::ClientGroup)
            .await?;

        if let Some(message) = value.get("errorMessage").and_then(Value::as_str) {
            return Err(Error::operation(
                ErrorDomain::ClientGroup,
                102,
                format!("Failed to create new ClientGroup\nError:\"{message}\""),
            ));
        }
        let id = value
            .pointer("/clientGroupDetail/clientGroup/clientGroupId")
            .and_then(as_id)
            .ok_or_else(|| {
                Error::operation(ErrorDomain::ClientGroup, 102, "Failed to create new ClientGroup")
            })?;

        self.refresh().await?;
        ClientGroup::load(self.ctx.clone(), id).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> Result<()> {
        let id = self.id_of(name).ok_or_else(|| {
            Error::not_found(ErrorDomain::ClientGroup, "ClientGroup", name.to_lowercase())
        })?;

        let url = self.ctx.endpoints.format(Endpoint::ClientGroup, &[&id]);
        let value = self.ctx.http.delete(&url, ErrorDomain::ClientGroup).await?;
        match value.get("errorCode").and_then(response::error_code_value) {
            Some(0) => self.refresh().await,
            _ => Err(Error::empty("missing key 'errorCode'")),
        }
    }
}

/// One client group.
#[derive(Debug, Clone)]
pub struct ClientGroup {
    ctx: ApiContext,
    id: u64,
    properties: Value,
}

impl ClientGroup {
    async fn load(ctx: ApiContext, id: u64) -> Result<Self> {
        let mut group = Self {
            ctx,
            id,
            properties: Value::Null,
        };
        group.refresh().await?;
        Ok(group)
    }

    /// Re-reads the group details.
    pub async fn refresh(&mut self) -> Result<()> {
        let url = self.ctx.endpoints.format(Endpoint::ClientGroup, &[&self.id]);
        let value = self.ctx.http.get(&url, ErrorDomain::ClientGroup).await?;
        let detail = response::require(&value, "clientGroupDetail")?;
        if detail.pointer("/clientGroup/clientGroupName").is_none() {
            return Err(Error::operation(
                ErrorDomain::ClientGroup,
                102,
                "Client Group name is not specified in the response",
            ));
        }
        self.properties = detail.clone();
        Ok(())
    }

    /// Group id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Group name as returned by the server.
    #[must_use]
    pub fn name(&self) -> &str {
        self.properties
            .pointer("/clientGroup/clientGroupName")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Group description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.properties.get("description").and_then(Value::as_str)
    }

    /// Names of the clients in the group.
    #[must_use]
    pub fn associated_clients(&self) -> Vec<&str> {
        self.properties
            .get("associatedClients")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|c| c.get("clientName").and_then(Value::as_str))
            .collect()
    }

    /// Whether backups are enabled for the group.
    #[must_use]
    pub fn is_backup_enabled(&self) -> bool {
        self.activity_enabled(1)
    }

    /// Whether restores are enabled for the group.
    #[must_use]
    pub fn is_restore_enabled(&self) -> bool {
        self.activity_enabled(2)
    }

    /// Whether data aging is enabled for the group.
    #[must_use]
    pub fn is_data_aging_enabled(&self) -> bool {
        self.activity_enabled(16)
    }

    /// Raw `clientGroupDetail` object.
    #[must_use]
    pub fn properties(&self) -> &Value {
        &self.properties
    }

    fn activity_enabled(&self, activity_type: u64) -> bool {
        self.properties
            .pointer("/clientGroupActivityControl/activityControlOptions")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|o| o.get("activityType").and_then(Value::as_u64) == Some(activity_type))
            .and_then(|o| o.get("enableActivityType").and_then(Value::as_bool))
            .unwrap_or(false)
    }
}
