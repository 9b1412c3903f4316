//! Datacube and its datasources.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::client::endpoints::Endpoint;
use crate::client::http::Payload;
use crate::error::{Error, ErrorDomain, Result};
use crate::models::{datasource_type_name, DatasourceCreate};
use crate::response::{self, as_id};

use super::{ApiContext, EntityMap, Fetcher, Lister, Mutator};

/// Datacube of the commcell: its analytics engines and datasources.
///
/// Both are fetched concurrently when the datacube is first accessed.
///
/// # Example
///
/// ```rust,no_run
/// # use commcell_sdk::{Commcell, Fetcher};
/// # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
/// let datacube = commcell.datacube().await?;
/// println!("{} analytics engines", datacube.analytics_engines().len());
///
/// if let Some(datasources) = datacube.datasources() {
///     let sales = datasources.get("SalesDocs").await?;
///     let job_id = sales.start_job().await?;
///     println!("crawl job {job_id} started on core {:?}", sales.computed_core_name());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Datacube {
    analytics_engines: Arc<Vec<Value>>,
    datasources: Option<Arc<Datasources>>,
}

impl Datacube {
    pub(crate) async fn load(ctx: ApiContext) -> Result<Self> {
        let (engines, datasources) =
            tokio::join!(fetch_analytics_engines(&ctx), Datasources::load(ctx.clone()));

        let engines = Arc::new(engines?);
        let datasources = match datasources {
            Ok(datasources) => Some(Arc::new(datasources.with_engines(Arc::clone(&engines)))),
            Err(e) => {
                warn!(error = %e, "Failed to initialize datasources");
                None
            }
        };

        Ok(Self {
            analytics_engines: engines,
            datasources,
        })
    }

    /// Analytics engines (index servers) known to the datacube.
    #[must_use]
    pub fn analytics_engines(&self) -> &[Value] {
        &self.analytics_engines
    }

    /// Datasources, or `None` if they failed to load.
    #[must_use]
    pub fn datasources(&self) -> Option<Arc<Datasources>> {
        self.datasources.clone()
    }
}

async fn fetch_analytics_engines(ctx: &ApiContext) -> Result<Vec<Value>> {
    let url = ctx.endpoints.url(Endpoint::AnalyticsEngines);
    let value = ctx.http.get(url, ErrorDomain::Datacube).await?;
    value
        .get("listOfCIServer")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| {
            Error::operation(
                ErrorDomain::Datacube,
                103,
                "Failed to get the list of analytics engines",
            )
        })
}

/// Sends a request and returns the JSON body without classifying it.
///
/// Datacube calls report failures in an `error` object that callers read
/// themselves.
async fn call(ctx: &ApiContext, method: Method, url: &str, payload: Option<&Payload>) -> Result<Value> {
    let (ok, raw) = ctx.http.dispatch(method, url, payload).await?;
    if !ok {
        return Err(Error::response(raw.status.as_u16(), raw.text()));
    }
    raw.json()?.ok_or(Error::EmptyResponse { detail: None })
}

fn error_log_message(value: &Value) -> Option<&str> {
    value
        .get("error")
        .map(|e| e.get("errLogMessage").and_then(Value::as_str).unwrap_or_default())
}

/// Datasources of the datacube. Names are case sensitive.
pub struct Datasources {
    ctx: ApiContext,
    all: RwLock<EntityMap>,
    engines: Arc<Vec<Value>>,
}

impl std::fmt::Debug for Datasources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datasources")
            .field("count", &self.all.read().len())
            .finish_non_exhaustive()
    }
}

impl Datasources {
    async fn load(ctx: ApiContext) -> Result<Self> {
        let datasources = Self {
            ctx,
            all: RwLock::new(EntityMap::case_sensitive()),
            engines: Arc::new(Vec::new()),
        };
        datasources.refresh().await?;
        Ok(datasources)
    }

    fn with_engines(mut self, engines: Arc<Vec<Value>>) -> Self {
        self.engines = engines;
        self
    }

    /// Returns true if a datasource is named exactly `name`.
    #[must_use]
    pub fn has_datasource(&self, name: &str) -> bool {
        self.all.read().contains(name)
    }

    fn not_found(name: &str) -> Error {
        Error::not_found(ErrorDomain::Datacube, "datasource", name)
    }

    fn cloud_id(&self, engine: &str) -> Result<Value> {
        self.engines
            .iter()
            .find(|e| {
                e.get("clientName").and_then(Value::as_str) == Some(engine)
                    || e.get("engineName").and_then(Value::as_str) == Some(engine)
            })
            .and_then(|e| e.get("cloudID").cloned())
            .ok_or_else(|| {
                Error::not_found(ErrorDomain::Datacube, "analytics engine", engine)
            })
    }
}

/// Flattens `collections[].datasources[]` into per-datasource properties.
pub(crate) fn parse_collections(value: &Value) -> EntityMap {
    let mut map = EntityMap::case_sensitive();

    for collection in value.get("collections").and_then(Value::as_array).into_iter().flatten() {
        let core_name = collection.get("computedCoreName").cloned();

        for ds in collection.get("datasources").and_then(Value::as_array).into_iter().flatten() {
            let Some(name) = ds.get("datasourceName").and_then(Value::as_str) else {
                continue;
            };
            let mut props = json!({
                "data_source_id": ds.get("datasourceId"),
                "data_source_name": name,
                "data_source_type": ds
                    .get("datasourceType")
                    .and_then(as_id)
                    .and_then(datasource_type_name),
            });
            if let Some(core) = &core_name {
                props["computedCoreName"] = core.clone();
            }
            for key in ["coreId", "description"] {
                if let Some(v) = ds.get(key) {
                    props[key] = v.clone();
                }
            }
            if let Some(status) = ds.get("status") {
                props["total_count"] = status.get("totalcount").cloned().unwrap_or(Value::Null);
                props["state"] = status.get("state").cloned().unwrap_or(Value::Null);
            }
            map.insert(name, props);
        }
    }
    map
}

#[async_trait]
impl Lister for Datasources {
    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<()> {
        let url = self.ctx.endpoints.url(Endpoint::Datasources);
        let value = self.ctx.http.get(url, ErrorDomain::Datacube).await?;
        let map = parse_collections(&value);
        debug!(count = map.len(), "Refreshed datasources");
        *self.all.write() = map;
        Ok(())
    }

    fn all(&self) -> EntityMap {
        self.all.read().clone()
    }

    fn has(&self, name: &str) -> bool {
        self.has_datasource(name)
    }
}

#[async_trait]
impl Fetcher for Datasources {
    type Item = Datasource;

    async fn get(&self, name: &str) -> Result<Datasource> {
        let properties = self
            .all
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Self::not_found(name))?;
        let id = properties
            .get("data_source_id")
            .and_then(as_id)
            .ok_or_else(|| Error::empty("datasource has no id"))?;

        Ok(Datasource {
            ctx: self.ctx.clone(),
            name: name.to_string(),
            id,
            properties,
        })
    }
}

#[async_trait]
impl Mutator for Datasources {
    type Request = DatasourceCreate;
    type Item = Datasource;

    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn add(&self, request: DatasourceCreate) -> Result<Datasource> {
        let cloud_id = self.cloud_id(&request.analytics_engine)?;
        let body = Payload::Json(request.to_json(&cloud_id));
        let url = self.ctx.endpoints.url(Endpoint::CreateDatasource);
        let value = call(&self.ctx, Method::POST, url, Some(&body)).await?;

        let created = match value.get("error") {
            Some(error) => error.get("errorCode").and_then(response::error_code_value) == Some(0),
            None => value.get("collections").is_some(),
        };
        if !created {
            let message = error_log_message(&value).unwrap_or_default();
            return Err(Error::operation(
                ErrorDomain::Datacube,
                102,
                format!("Failed to create datasource\nError: \"{message}\""),
            ));
        }

        self.refresh().await?;
        self.get(&request.name).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> Result<()> {
        let datasource = self.get(name).await?;
        datasource.delete().await?;
        self.refresh().await
    }
}

/// One datasource.
#[derive(Debug, Clone)]
pub struct Datasource {
    ctx: ApiContext,
    name: String,
    id: u64,
    properties: Value,
}

impl Datasource {
    /// Datasource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Datasource id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the type, e.g. `file`.
    #[must_use]
    pub fn datasource_type(&self) -> Option<&str> {
        self.properties.get("data_source_type").and_then(Value::as_str)
    }

    /// Name of the search core backing this datasource.
    #[must_use]
    pub fn computed_core_name(&self) -> Option<&str> {
        self.properties.get("computedCoreName").and_then(Value::as_str)
    }

    /// Properties from the last datasource list.
    #[must_use]
    pub fn properties(&self) -> &Value {
        &self.properties
    }

    /// Starts a crawl job and returns its id.
    #[instrument(skip(self), fields(datasource = %self.name))]
    pub async fn start_job(&self) -> Result<String> {
        let url = self.ctx.endpoints.format(Endpoint::StartDatasourceJob, &[&self.id]);
        let value = call(&self.ctx, Method::POST, &url, None).await?;

        if let Some(message) = error_log_message(&value) {
            return Err(Error::operation(
                ErrorDomain::Datacube,
                102,
                format!("Failed to start job on datasource\nError: \"{message}\""),
            ));
        }
        match value.pointer("/status/jobId") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(Error::operation(
                ErrorDomain::Datacube,
                102,
                "Status object not found in response",
            )),
        }
    }

    /// Returns the status object of the datasource.
    #[instrument(skip(self), fields(datasource = %self.name))]
    pub async fn get_status(&self) -> Result<Value> {
        let url = self.ctx.endpoints.format(Endpoint::DatasourceStatus, &[&self.id]);
        let value = call(&self.ctx, Method::GET, &url, None).await?;

        if let Some(message) = error_log_message(&value) {
            return Err(Error::operation(
                ErrorDomain::Datacube,
                102,
                format!("Failed to Get status on datasource\nError: \"{message}\""),
            ));
        }
        if value.get("status").is_none() {
            return Err(Error::operation(
                ErrorDomain::Datacube,
                102,
                "Status object not found in response",
            ));
        }
        Ok(value)
    }

    /// Deletes this datasource.
    pub async fn delete(&self) -> Result<()> {
        let url = self.ctx.endpoints.format(Endpoint::DeleteDatasource, &[&self.id]);
        let value = call(&self.ctx, Method::POST, &url, None).await?;

        if let Some(message) = value.get("errLogMessage").and_then(Value::as_str) {
            return Err(Error::operation(
                ErrorDomain::Datacube,
                102,
                format!("Failed to delete datasource\nError: \"{message}\""),
            ));
        }
        Ok(())
    }
}
