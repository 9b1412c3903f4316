//! Block level replication (Live Sync) pairs service.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::endpoints::Endpoint;
use crate::client::http::Payload;
use crate::error::{Error, ErrorDomain, Result};
use crate::models::{
    EndPointType, FsPairCreate, PairEndpoint, PairStatus, RecoveryType, VolumeMapping,
};
use crate::response::{self, as_id};

use super::qcommand::QcommandService;
use super::{ApiContext, Client, Clients, EntityMap, Lister};

/// BLR pairs of the commcell.
///
/// Pairs are addressed by their source and destination client names.
///
/// # Example
///
/// ```rust,no_run
/// # use commcell_sdk::Commcell;
/// # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
/// let pairs = commcell.blr_pairs().await?;
/// if pairs.has_blr_pair("fs-src01", "fs-dst01") {
///     let pair = pairs.get("fs-src01", "fs-dst01").await?;
///     println!("{:?}, lag {:?}", pair.pair_status(), pair.lag_time());
/// }
/// # Ok(())
/// # }
/// ```
pub struct BlrPairs {
    ctx: ApiContext,
    clients: Arc<Clients>,
    summary: RwLock<Value>,
    site_info: RwLock<Vec<Value>>,
}

impl std::fmt::Debug for BlrPairs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlrPairs")
            .field("pairs", &self.site_info.read().len())
            .finish_non_exhaustive()
    }
}

impl BlrPairs {
    pub(crate) async fn load(ctx: ApiContext, clients: Arc<Clients>) -> Result<Self> {
        let pairs = Self {
            ctx,
            clients,
            summary: RwLock::new(Value::Null),
            site_info: RwLock::new(Vec::new()),
        };
        pairs.refresh().await?;
        Ok(pairs)
    }

    /// Replication summary returned with the last list.
    #[must_use]
    pub fn summary(&self) -> Value {
        self.summary.read().clone()
    }

    /// Returns true if a pair replicates `source` to `destination`.
    #[must_use]
    pub fn has_blr_pair(&self, source: &str, destination: &str) -> bool {
        self.find(source, destination).is_some()
    }

    /// Returns the pair replicating `source` to `destination`.
    pub async fn get(&self, source: &str, destination: &str) -> Result<BlrPair> {
        let row = self
            .find(source, destination)
            .ok_or_else(|| not_found(source, destination))?;
        let id = row
            .get("id")
            .and_then(as_id)
            .ok_or_else(|| Error::empty("BLR pair has no id"))?;
        BlrPair::load(self.ctx.clone(), id).await
    }

    /// Deletes the pair replicating `source` to `destination`.
    #[instrument(skip(self))]
    pub async fn delete(&self, source: &str, destination: &str) -> Result<()> {
        let id = self
            .find(source, destination)
            .ok_or_else(|| not_found(source, destination))?
            .get("id")
            .and_then(as_id)
            .ok_or_else(|| Error::empty("BLR pair has no id"))?;

        let url = self.ctx.endpoints.format(Endpoint::DeleteBlrPair, &[&id]);
        let value = self.ctx.http.delete(&url, ErrorDomain::BlrPairs).await?;

        if let Some(message) = value
            .pointer("/error/errorMessage")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
        {
            return Err(Error::operation(
                ErrorDomain::BlrPairs,
                102,
                format!(
                    "Failed to delete Source: {} and Destination: {} \nError: \"{message}\"",
                    source.to_lowercase(),
                    destination.to_lowercase()
                ),
            ));
        }

        self.refresh().await
    }

    /// Creates a file system pair between two clients.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use commcell_sdk::Commcell;
    /// # use commcell_sdk::models::{FsPairCreate, RecoveryType, VolumeMapping};
    /// # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
    /// let request = FsPairCreate::new("fs-src01", "fs-dst01", RecoveryType::Live)
    ///     .with_volume(VolumeMapping {
    ///         source_guid: "F961A090-90B3-403A-8629-10203C81517F".into(),
    ///         source_path: "E:".into(),
    ///         destination_guid: "0A800478-57E2-42B2-80BA-F7BA1B2E0BE1".into(),
    ///         destination_path: "F:".into(),
    ///         source_size: 10_737_418_240,
    ///     });
    /// commcell.blr_pairs().await?.create_fs_pair(&request).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, request), fields(source = %request.source_client))]
    pub async fn create_fs_pair(&self, request: &FsPairCreate) -> Result<()> {
        let source = self.client_entity(&request.source_client)?;
        let destination = self.client_entity(&request.destination_client)?;

        let volumes: Vec<Value> = request
            .volumes
            .iter()
            .map(|v| {
                json!({
                    "sourceVolumeGUID": v.source_guid,
                    "sourceVolume": v.source_path,
                    "destVolumeGUID": v.destination_guid,
                    "destVolume": v.destination_path,
                    "sourceVolumeSize": v.source_size,
                    "disabled": "",
                })
            })
            .collect();

        let body = json!({
            "destEndPointType": EndPointType::FileSystem as u8,
            "blrRecoveryOpts": request.recovery_options_xml()?,
            "srcEndPointType": EndPointType::FileSystem as u8,
            "srcDestVolumeMap": volumes,
            "destEntity": {"client": destination},
            "sourceEntity": {"client": source},
        });

        let url = self.ctx.endpoints.url(Endpoint::CreateBlrPair);
        let (ok, raw) = self
            .ctx
            .http
            .dispatch(Method::POST, url, Some(&Payload::Json(body)))
            .await?;
        let text = raw.text();
        if !ok {
            return Err(Error::response(
                raw.status.as_u16(),
                response::extract_title(&text),
            ));
        }

        let value = raw.json()?.ok_or(Error::EmptyResponse { detail: None })?;
        let code = value
            .get("errorCode")
            .and_then(response::error_code_value)
            .unwrap_or_default();
        if code != 0 {
            return Err(Error::response(raw.status.as_u16(), text));
        }

        self.refresh().await
    }

    /// Returns the id of the recovery point store named `name`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use commcell_sdk::Commcell;
    /// # use commcell_sdk::models::{FsPairCreate, RecoveryType, RpStoreOptions};
    /// # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
    /// let pairs = commcell.blr_pairs().await?;
    /// let id = pairs.get_rpstore_id("RPStore01").await?;
    /// let request = FsPairCreate::new("fs-src01", "fs-dst01", RecoveryType::GranularV2)
    ///     .with_rpstore(RpStoreOptions {
    ///         rpstore: Some((id, "RPStore01".into())),
    ///         ..RpStoreOptions::default()
    ///     });
    /// pairs.create_fs_pair(&request).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self))]
    pub async fn get_rpstore_id(&self, name: &str) -> Result<u64> {
        let request = Payload::Text(RPSTORE_LIST_REQUEST.to_string());
        let value = QcommandService::new(self.ctx.clone())
            .qoperation_execute(&request)
            .await?;

        let store = response::require(&value, "libraryList")?
            .as_array()
            .into_iter()
            .flatten()
            .find(|lib| {
                lib.pointer("/library/libraryName").and_then(Value::as_str) == Some(name)
                    && lib
                        .get("MountPathList")
                        .and_then(Value::as_array)
                        .is_some_and(|paths| !paths.is_empty())
            })
            .ok_or_else(|| {
                Error::operation(
                    ErrorDomain::BlrPairs,
                    102,
                    format!("No RP Store found with name {name}"),
                )
            })?;

        store
            .pointer("/MountPathList/0/rpStoreLibraryInfo/rpStoreId")
            .and_then(as_id)
            .ok_or_else(|| Error::empty(format!("RP store {name} has no id")))
    }

    fn client_entity(&self, name: &str) -> Result<Value> {
        let id = self
            .clients
            .id_of(name)
            .ok_or_else(|| Error::not_found(ErrorDomain::Client, "client", name.to_lowercase()))?;
        let client_name = self.clients.name_of(id).unwrap_or_else(|| name.to_lowercase());
        Ok(json!({
            "clientId": id,
            "clientName": client_name,
            "hasDrivesInPair": true,
            "tabLevel": "level-0",
            "checked": true,
        }))
    }

    fn find(&self, source: &str, destination: &str) -> Option<Value> {
        let source = source.to_lowercase();
        let destination = destination.to_lowercase();
        let lower = |row: &Value, key: &str| {
            row.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase()
        };

        self.site_info
            .read()
            .iter()
            .find(|row| {
                lower(row, "sourceName") == source && lower(row, "destinationName") == destination
            })
            .cloned()
    }
}

const RPSTORE_LIST_REQUEST: &str = r#"<EVGui_GetLibraryListWCReq libraryType="RPSTORE" />"#;

fn not_found(source: &str, destination: &str) -> Error {
    Error::operation(
        ErrorDomain::BlrPairs,
        102,
        format!(
            "No BLR pair exists with source: \"{}\" and destination: \"{}\"",
            source.to_lowercase(),
            destination.to_lowercase()
        ),
    )
}

#[async_trait]
impl Lister for BlrPairs {
    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<()> {
        let url = self.ctx.endpoints.url(Endpoint::BlrPairs);
        let value = self.ctx.http.get(url, ErrorDomain::BlrPairs).await?;

        let site_info = value
            .get("siteInfo")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        debug!(count = site_info.len(), "Refreshed BLR pairs");

        *self.summary.write() = value.get("summary").cloned().unwrap_or_else(|| json!({}));
        *self.site_info.write() = site_info;
        Ok(())
    }

    /// Pair (subclient) names mapped to pair ids.
    fn all(&self) -> EntityMap {
        let mut map = EntityMap::new();
        for row in self.site_info.read().iter() {
            let name = row
                .pointer("/entity/subclientName")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if let (false, Some(id)) = (name.is_empty(), row.get("id").and_then(as_id)) {
                map.insert(name, json!(id));
            }
        }
        map
    }
}

/// One BLR pair.
#[derive(Debug, Clone)]
pub struct BlrPair {
    ctx: ApiContext,
    id: u64,
    properties: Value,
}

impl BlrPair {
    async fn load(ctx: ApiContext, id: u64) -> Result<Self> {
        let mut pair = Self {
            ctx,
            id,
            properties: Value::Null,
        };
        pair.refresh().await?;
        Ok(pair)
    }

    /// Re-reads the pair properties.
    pub async fn refresh(&mut self) -> Result<()> {
        let url = self.ctx.endpoints.format(Endpoint::BlrPair, &[&self.id]);
        let value = self.ctx.http.get(&url, ErrorDomain::BlrPairs).await?;
        self.properties = response::require(&value, "siteInfo")?
            .get(0)
            .cloned()
            .ok_or_else(|| Error::empty("siteInfo is empty"))?;
        Ok(())
    }

    /// Pair id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Pair (subclient) name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.properties
            .pointer("/entity/subclientName")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Raw `siteInfo[0]` object.
    #[must_use]
    pub fn properties(&self) -> &Value {
        &self.properties
    }

    /// Replication state.
    #[must_use]
    pub fn pair_status(&self) -> Option<PairStatus> {
        self.properties
            .get("status")
            .and_then(as_id)
            .and_then(PairStatus::from_code)
    }

    /// Source side of the pair.
    #[must_use]
    pub fn source(&self) -> PairEndpoint {
        self.endpoint("sourceName", "srcClientId", "headClientId", "sourceGuid", "srcEndPointType")
    }

    /// Destination side of the pair.
    #[must_use]
    pub fn destination(&self) -> PairEndpoint {
        self.endpoint(
            "destinationName",
            "destClientId",
            "tailClientId",
            "destinationGuid",
            "destEndPointType",
        )
    }

    /// Replication lag in seconds.
    #[must_use]
    pub fn lag_time(&self) -> Option<u64> {
        self.properties.get("lagTime").and_then(as_id)
    }

    /// Name of the replication group the pair belongs to.
    #[must_use]
    pub fn replication_group_name(&self) -> Option<&str> {
        self.properties
            .pointer("/replicationGroup/replicationGroupName")
            .and_then(Value::as_str)
    }

    /// Recovery type of the pair.
    #[must_use]
    pub fn recovery_type(&self) -> Option<RecoveryType> {
        self.properties
            .pointer("/blrRecoveryOpts/recoveryType")
            .and_then(as_id)
            .and_then(RecoveryType::from_code)
    }

    /// Raw `granularV2` recovery point settings.
    #[must_use]
    pub fn rpstore_intervals(&self) -> Value {
        self.properties
            .pointer("/blrRecoveryOpts/granularV2")
            .cloned()
            .unwrap_or_else(|| json!({}))
    }

    /// Volumes replicated by the pair.
    #[must_use]
    pub fn volume_map(&self) -> Vec<VolumeMapping> {
        let text = |v: &Value, key: &str| {
            v.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        self.properties
            .get("srcDestVolumeMap")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|v| VolumeMapping {
                source_guid: text(v, "sourceVolumeGUID"),
                source_path: text(v, "sourceVolume"),
                destination_guid: text(v, "destVolumeGUID"),
                destination_path: text(v, "destVolume"),
                source_size: v.get("sourceVolumeSize").and_then(as_id).unwrap_or_default(),
            })
            .collect()
    }

    /// Replication statistics of the pair (`statsList`).
    #[instrument(skip(self), fields(pair_id = self.id))]
    pub async fn get_pair_stats(&self) -> Result<Vec<Value>> {
        let url = self.ctx.endpoints.format(Endpoint::BlrPairStats, &[&self.id]);
        let value = self.ctx.http.get(&url, ErrorDomain::BlrPairs).await?;
        Ok(response::require(&value, "statsList")?
            .as_array()
            .cloned()
            .unwrap_or_default())
    }

    /// Recovery points available on the destination (`vmScale`).
    #[instrument(skip(self), fields(pair_id = self.id))]
    pub async fn get_recovery_point_stores(&self) -> Result<Vec<Value>> {
        let destination = self.destination();
        let client = Client::load(
            self.ctx.clone(),
            destination.name.to_lowercase(),
            destination.client_id,
        )
        .await?;
        let guid = client.guid().unwrap_or_default();
        let subclient_id = self
            .properties
            .pointer("/entity/subclientId")
            .and_then(as_id)
            .unwrap_or_default();

        let url = self.ctx.endpoints.format(
            Endpoint::BlrRecoveryPointStores,
            &[&destination.proxy_client_id, &subclient_id, &guid],
        );
        let value = self.ctx.http.get(&url, ErrorDomain::BlrPairs).await?;
        Ok(response::require(&value, "vmScale")?
            .as_array()
            .cloned()
            .unwrap_or_default())
    }

    fn endpoint(
        &self,
        name: &str,
        client_id: &str,
        proxy_id: &str,
        guid: &str,
        endpoint: &str,
    ) -> PairEndpoint {
        let props = &self.properties;
        PairEndpoint {
            name: props.get(name).and_then(Value::as_str).unwrap_or_default().to_string(),
            client_id: props.get(client_id).and_then(as_id).unwrap_or_default(),
            proxy_client_id: props.get(proxy_id).and_then(as_id).unwrap_or_default(),
            guid: props.get(guid).and_then(Value::as_str).unwrap_or_default().to_string(),
            endpoint: props
                .get(endpoint)
                .and_then(as_id)
                .and_then(EndPointType::from_code),
        }
    }
}
