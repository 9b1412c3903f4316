//! Clients service.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::endpoints::Endpoint;
use crate::error::{Error, ErrorDomain, Result};
use crate::response::{self, as_id};

use super::{ApiContext, EntityMap, Fetcher, Lister};

/// Clients of the commcell.
///
/// # Example
///
/// ```rust,no_run
/// # use commcell_sdk::{Commcell, Fetcher, Lister};
/// # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
/// let clients = commcell.clients().await?;
/// if clients.has("fileserver01") {
///     let client = clients.get("fileserver01").await?;
///     println!("{} runs {}", client.name(), client.os_info().unwrap_or_default());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Clients {
    ctx: ApiContext,
    all: RwLock<EntityMap>,
}

impl std::fmt::Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients")
            .field("count", &self.all.read().len())
            .finish_non_exhaustive()
    }
}

impl Clients {
    /// Creates the wrapper and fetches the client list.
    pub(crate) async fn load(ctx: ApiContext) -> Result<Self> {
        let clients = Self {
            ctx,
            all: RwLock::new(EntityMap::new()),
        };
        clients.refresh().await?;
        Ok(clients)
    }

    /// Returns true if a client has `name` as its name or host name.
    #[must_use]
    pub fn has_client(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Returns the client with the given id.
    pub async fn get_by_id(&self, id: u64) -> Result<Client> {
        let name = self
            .all
            .read()
            .iter()
            .find(|(_, props)| props.get("id").and_then(as_id) == Some(id))
            .map(|(name, _)| name.to_string());

        match name {
            Some(name) => Client::load(self.ctx.clone(), name, id).await,
            None => Err(Error::not_found(ErrorDomain::Client, "client", id.to_string())),
        }
    }

    /// Returns the name of the client with the given id.
    #[must_use]
    pub fn name_of(&self, id: u64) -> Option<String> {
        self.all
            .read()
            .iter()
            .find(|(_, props)| props.get("id").and_then(as_id) == Some(id))
            .map(|(name, _)| name.to_string())
    }

    /// Returns the id of a client looked up by name or host name.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<u64> {
        self.resolve(name).map(|(_, id)| id)
    }

    /// Resolves a name or host name to `(client name, id)`.
    fn resolve(&self, name: &str) -> Option<(String, u64)> {
        let all = self.all.read();
        if let Some(props) = all.get(name) {
            return Some((name.to_lowercase(), props.get("id").and_then(as_id)?));
        }

        let hostname = name.trim().to_lowercase();
        if hostname.is_empty() {
            return None;
        }
        let found = all
            .iter()
            .find(|(_, props)| props.get("hostname").and_then(Value::as_str) == Some(&hostname))
            .and_then(|(client, props)| Some((client.to_string(), props.get("id").and_then(as_id)?)));
        found
    }
}

#[async_trait]
impl Lister for Clients {
    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<()> {
        let url = self.ctx.endpoints.url(Endpoint::Clients);
        let value = self.ctx.http.get(url, ErrorDomain::Client).await?;
        let properties = response::require(&value, "clientProperties")?;

        let mut map = EntityMap::new();
        for entry in properties.as_array().into_iter().flatten() {
            let Some(entity) = entry.pointer("/client/clientEntity") else {
                continue;
            };
            let Some(name) = entity.get("clientName").and_then(Value::as_str) else {
                continue;
            };
            let hostname = entity
                .get("hostName")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_lowercase);
            map.insert(
                name,
                json!({
                    "id": entity.get("clientId").and_then(as_id),
                    "hostname": hostname,
                }),
            );
        }

        debug!(count = map.len(), "Refreshed clients");
        *self.all.write() = map;
        Ok(())
    }

    fn all(&self) -> EntityMap {
        self.all.read().clone()
    }

    fn has(&self, name: &str) -> bool {
        self.has_client(name)
    }
}

#[async_trait]
impl Fetcher for Clients {
    type Item = Client;

    async fn get(&self, name: &str) -> Result<Client> {
        let (name, id) = self.resolve(name).ok_or_else(|| {
            Error::not_found(ErrorDomain::Client, "client", name.to_lowercase())
        })?;
        Client::load(self.ctx.clone(), name, id).await
    }
}

impl Clients {
    /// Force deletes a client and refreshes the list.
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<()> {
        let id = self
            .id_of(name)
            .ok_or_else(|| Error::not_found(ErrorDomain::Client, "client", name.to_lowercase()))?;

        let url = self.ctx.endpoints.format(Endpoint::DeleteClient, &[&id]);
        let value = self.ctx.http.delete(&url, ErrorDomain::Client).await?;

        let code = value
            .pointer("/response/0/errorCode")
            .or_else(|| value.get("errorCode"))
            .and_then(response::error_code_value);
        if code != Some(0) {
            return Err(Error::operation(
                ErrorDomain::Client,
                102,
                delete_failure_message(&value),
            ));
        }

        self.refresh().await
    }
}

fn delete_failure_message(value: &Value) -> String {
    let mut message = String::from("Failed to delete client");
    let warning = value
        .get("warningCode")
        .and_then(response::error_code_value)
        .filter(|c| *c != 0)
        .and(value.get("warningMessage").and_then(Value::as_str));
    if let Some(warning) = warning {
        message.push_str(&format!("\nWarning: \"{warning}\""));
    }
    message
}

/// One client and its properties.
#[derive(Debug, Clone)]
pub struct Client {
    ctx: ApiContext,
    name: String,
    id: u64,
    properties: Value,
}

impl Client {
    pub(crate) async fn load(ctx: ApiContext, name: String, id: u64) -> Result<Self> {
        let mut client = Self {
            ctx,
            name,
            id,
            properties: Value::Null,
        };
        client.refresh().await?;
        Ok(client)
    }

    /// Re-reads the client properties.
    pub async fn refresh(&mut self) -> Result<()> {
        let url = self.ctx.endpoints.format(Endpoint::Client, &[&self.id]);
        let value = self.ctx.http.get(&url, ErrorDomain::Client).await?;
        self.properties = response::require(&value, "clientProperties")?
            .get(0)
            .cloned()
            .ok_or_else(|| Error::empty("clientProperties is empty"))?;
        Ok(())
    }

    /// Lower-cased client name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Client id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Raw `clientProperties[0]` object.
    #[must_use]
    pub fn properties(&self) -> &Value {
        &self.properties
    }

    /// Host name of the client.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.str_at("/client/clientEntity/hostName")
    }

    /// GUID of the client.
    #[must_use]
    pub fn guid(&self) -> Option<&str> {
        self.str_at("/client/clientEntity/clientGUID")
    }

    /// Display name of the client.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.str_at("/client/displayName")
    }

    /// Time zone name of the client.
    #[must_use]
    pub fn timezone(&self) -> Option<&str> {
        self.str_at("/client/TimeZone/TimeZoneName")
    }

    /// Software install directory.
    #[must_use]
    pub fn install_directory(&self) -> Option<&str> {
        self.str_at("/client/installDirectory")
    }

    /// Operating system summary, e.g. `x64 Windows Server  --  Windows Server 2019`.
    #[must_use]
    pub fn os_info(&self) -> Option<String> {
        let os = self.properties.pointer("/client/osInfo")?;
        let field = |ptr: &str| os.pointer(ptr).and_then(Value::as_str).unwrap_or_default();
        Some(format!(
            "{} {} {}  --  {}",
            field("/OsDisplayInfo/ProcessorType"),
            field("/Type"),
            field("/SubType"),
            field("/OsDisplayInfo/OSName"),
        ))
    }

    /// Whether backups are enabled for the client.
    #[must_use]
    pub fn is_backup_enabled(&self) -> bool {
        self.activity_enabled(1)
    }

    /// Whether restores are enabled for the client.
    #[must_use]
    pub fn is_restore_enabled(&self) -> bool {
        self.activity_enabled(2)
    }

    /// Whether data aging is enabled for the client.
    #[must_use]
    pub fn is_data_aging_enabled(&self) -> bool {
        self.activity_enabled(16)
    }

    fn activity_enabled(&self, activity_type: u64) -> bool {
        self.properties
            .pointer("/clientProps/clientActivityControl/activityControlOptions")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|a| a.get("activityType").and_then(Value::as_u64) == Some(activity_type))
            .and_then(|a| a.get("enableActivityType").and_then(Value::as_bool))
            .unwrap_or(false)
    }

    fn str_at(&self, pointer: &str) -> Option<&str> {
        self.properties.pointer(pointer).and_then(Value::as_str)
    }
}
