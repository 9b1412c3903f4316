//! Commcell session implementation.
//!
//! This module provides the session object that discovers the web service,
//! logs in and hands out the feature wrappers.

mod builder;
pub(crate) mod config;
pub(crate) mod endpoints;
pub(crate) mod http;
mod profile;
pub(crate) mod services;

pub use builder::CommcellBuilder;
pub use config::{CommcellConfig, API_PATH};
pub use endpoints::{Endpoint, Endpoints};
pub use http::{HttpClient, Payload};
pub use profile::ProfileConfig;
pub use services::{
    BlrPair, BlrPairs, Client, ClientGroup, ClientGroups, Clients, CrawlJob, Datacube,
    Datasource, Datasources, EntityMap, Fetcher, Lister, Mutator, Schedule, Schedules,
    StoragePolicies, StoragePolicy, Tag, Tags,
};

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::auth::{Credentials, SessionToken};
use crate::error::{Error, Result};
use crate::models::{CommServInfo, CrawlTarget};
use crate::response::RawResponse;

use self::services::{ApiContext, AuthService, CommServService, QcommandService};

/// Feature handles created on first access.
#[derive(Default)]
struct FeatureCache {
    clients: Option<Arc<Clients>>,
    client_groups: Option<Arc<ClientGroups>>,
    storage_policies: Option<Arc<StoragePolicies>>,
    tags: Option<Arc<Tags>>,
    schedules: Option<Arc<Schedules>>,
    blr_pairs: Option<Arc<BlrPairs>>,
    datacube: Option<Arc<Datacube>>,
}

/// A logged in session with a Commcell.
///
/// Use [`Commcell::builder()`] to connect.
///
/// # Example
///
/// ```rust,no_run
/// use commcell_sdk::{Commcell, Fetcher, Lister};
///
/// #[tokio::main]
/// async fn main() -> Result<(), commcell_sdk::Error> {
///     let commcell = Commcell::builder()
///         .host("webconsole.example.com")
///         .username("admin")
///         .password("secret")
///         .build()
///         .await?;
///
///     println!("Connected to {} ({})", commcell.commserv_name(), commcell.version());
///
///     let clients = commcell.clients().await?;
///     for name in clients.all().names() {
///         println!("Client: {name}");
///     }
///
///     let client = clients.get("fileserver01").await?;
///     println!("OS: {:?}", client.os_info());
///
///     commcell.logout().await?;
///     Ok(())
/// }
/// ```
pub struct Commcell {
    ctx: ApiContext,
    config: Arc<CommcellConfig>,
    user: RwLock<Option<String>>,
    details: RwLock<CommServInfo>,
    features: RwLock<FeatureCache>,
}

impl Commcell {
    /// Creates a new session builder.
    #[must_use]
    pub fn builder() -> CommcellBuilder {
        CommcellBuilder::new()
    }

    /// Connects with a single set of credentials.
    pub async fn connect(config: CommcellConfig, credentials: Credentials) -> Result<Self> {
        Self::open(config, vec![credentials]).await
    }

    /// Discovers the web service and tries each credential in turn.
    ///
    /// A token that fails validation is cleared and the next credential is
    /// tried; a rejected password login ends the attempt.
    pub(crate) async fn open(config: CommcellConfig, credentials: Vec<Credentials>) -> Result<Self> {
        let token = SessionToken::new();
        let http = HttpClient::new(&config, token.clone())?;
        let base = discover(&http, &config).await?;
        info!(url = %base, "Using web service");

        let endpoints = Endpoints::new(base);
        http.set_renew_url(endpoints.url(Endpoint::RenewLoginToken));
        let ctx = ApiContext::new(Arc::new(http), Arc::new(endpoints));
        let auth = AuthService::new(ctx.clone());

        let mut user = None;
        let mut last_error = None;
        for credential in credentials {
            match credential {
                Credentials::Token(auth_token) => {
                    token.set(&auth_token);
                    match auth.who_am_i().await {
                        Ok(name) => {
                            user = Some(name);
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "Supplied token was rejected");
                            token.clear();
                            last_error = Some(e);
                        }
                    }
                }
                Credentials::Password { username, password } => {
                    user = Some(auth.login(&username, &password).await?);
                    break;
                }
            }
        }

        if !token.is_set() {
            return Err(last_error.unwrap_or(Error::CredentialsMissing));
        }

        let details = CommServService::new(ctx.clone()).load().await?;
        Ok(Self {
            ctx,
            config: Arc::new(config),
            user: RwLock::new(user),
            details: RwLock::new(details),
            features: RwLock::new(FeatureCache::default()),
        })
    }

    /// Returns the configuration this session was opened with.
    #[must_use]
    pub fn config(&self) -> &CommcellConfig {
        &self.config
    }

    /// Returns the web service base URL in use.
    #[must_use]
    pub fn web_service(&self) -> &str {
        self.ctx.endpoints.base()
    }

    /// Returns the endpoint map of this session.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.ctx.endpoints
    }

    /// Returns true while the session holds a token.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.ctx.http.token().is_set()
    }

    /// Name of the logged in user, if known.
    #[must_use]
    pub fn user(&self) -> Option<String> {
        self.user.read().clone()
    }

    /// Snapshot of the CommServ details.
    #[must_use]
    pub fn commserv_info(&self) -> CommServInfo {
        self.details.read().clone()
    }

    /// CommServ name.
    #[must_use]
    pub fn commserv_name(&self) -> String {
        self.details.read().name.clone()
    }

    /// CommServ host name.
    #[must_use]
    pub fn commserv_hostname(&self) -> String {
        self.details.read().hostname.clone()
    }

    /// CommServ GUID.
    #[must_use]
    pub fn commserv_guid(&self) -> String {
        self.details.read().guid.clone()
    }

    /// CommServ time zone.
    #[must_use]
    pub fn commserv_timezone(&self) -> String {
        self.details.read().timezone.clone()
    }

    /// Normalized CommServ version, e.g. `11.32.0`.
    #[must_use]
    pub fn version(&self) -> String {
        self.details.read().version.clone()
    }

    /// Release name of the CommServ.
    #[must_use]
    pub fn release_name(&self) -> String {
        self.details.read().release_name.clone()
    }

    /// Commcell id.
    #[must_use]
    pub fn commcell_id(&self) -> u64 {
        self.details.read().id
    }

    fn ensure_logged_in(&self) -> Result<()> {
        if self.is_logged_in() {
            Ok(())
        } else {
            Err(Error::LoggedOut)
        }
    }

    // ========================================================================
    // Session operations
    // ========================================================================

    /// Returns the user the current token belongs to.
    pub async fn who_am_i(&self) -> Result<String> {
        self.ensure_logged_in()?;
        let name = AuthService::new(self.ctx.clone()).who_am_i().await?;
        *self.user.write() = Some(name.clone());
        Ok(name)
    }

    /// Sends a raw request through the session.
    ///
    /// A relative path is joined to the web service URL. The response is
    /// returned as received, with `true` for a 200 status.
    #[instrument(skip(self, payload))]
    pub async fn request(
        &self,
        method: Method,
        path_or_url: &str,
        payload: Option<&Payload>,
    ) -> Result<(bool, RawResponse)> {
        let url = if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            self.ctx.endpoints.join(path_or_url)
        };
        self.ctx.http.dispatch(method, &url, payload).await
    }

    /// Executes a qoperation request, given as JSON or as an XML string.
    pub async fn qoperation_execute(&self, request: &Payload) -> Result<Value> {
        QcommandService::new(self.ctx.clone())
            .qoperation_execute(request)
            .await
    }

    /// Executes a qcommand with an optional input XML document.
    pub async fn execute_qcommand(&self, command: &str, input_xml: Option<&str>) -> Result<Value> {
        QcommandService::new(self.ctx.clone())
            .execute_qcommand(command, input_xml)
            .await
    }

    /// Logs out and drops every feature handle.
    ///
    /// Returns the server message, or `"User already logged out."` without
    /// making a request when no token is held. Feature handles are dropped
    /// even when the server rejects the logout; the token is kept so the
    /// call can be retried.
    pub async fn logout(&self) -> Result<String> {
        if !self.is_logged_in() {
            return Ok("User already logged out.".to_string());
        }

        let outcome = AuthService::new(self.ctx.clone()).logout().await;
        *self.features.write() = FeatureCache::default();
        let message = outcome?;
        *self.user.write() = None;
        info!(commserv = %self.commserv_name(), "Logged out");
        Ok(message)
    }

    /// Drops cached feature handles and re-reads the CommServ details.
    pub async fn refresh(&self) -> Result<()> {
        self.ensure_logged_in()?;
        *self.features.write() = FeatureCache::default();
        let details = CommServService::new(self.ctx.clone()).load().await?;
        *self.details.write() = details;
        debug!("Session refreshed");
        Ok(())
    }

    // ========================================================================
    // Feature accessors
    // ========================================================================

    async fn cached<T, Fut>(
        &self,
        slot: fn(&mut FeatureCache) -> &mut Option<Arc<T>>,
        load: impl FnOnce(ApiContext) -> Fut,
    ) -> Result<Arc<T>>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.ensure_logged_in()?;

        let hit = slot(&mut self.features.write()).clone();
        if let Some(feature) = hit {
            return Ok(feature);
        }

        let loaded = Arc::new(load(self.ctx.clone()).await?);
        let mut features = self.features.write();
        Ok(Arc::clone(slot(&mut features).get_or_insert(loaded)))
    }

    /// Returns the clients of the commcell.
    pub async fn clients(&self) -> Result<Arc<Clients>> {
        self.cached(|f| &mut f.clients, Clients::load).await
    }

    /// Returns the client groups of the commcell.
    pub async fn client_groups(&self) -> Result<Arc<ClientGroups>> {
        let clients = self.clients().await?;
        self.cached(|f| &mut f.client_groups, move |ctx| {
            ClientGroups::load(ctx, clients)
        })
        .await
    }

    /// Returns the storage policies of the commcell.
    pub async fn storage_policies(&self) -> Result<Arc<StoragePolicies>> {
        self.cached(|f| &mut f.storage_policies, StoragePolicies::load)
            .await
    }

    /// Returns the entity tags visible to the user.
    pub async fn tags(&self) -> Result<Arc<Tags>> {
        self.cached(|f| &mut f.tags, Tags::load).await
    }

    /// Returns the schedules of the whole commcell.
    pub async fn schedules(&self) -> Result<Arc<Schedules>> {
        self.cached(|f| &mut f.schedules, Schedules::for_commcell)
            .await
    }

    /// Returns the schedules of one client. Not cached.
    pub async fn client_schedules(&self, client_id: u64) -> Result<Schedules> {
        self.ensure_logged_in()?;
        Schedules::for_client(self.ctx.clone(), client_id).await
    }

    /// Returns the block level replication pairs.
    pub async fn blr_pairs(&self) -> Result<Arc<BlrPairs>> {
        let clients = self.clients().await?;
        self.cached(|f| &mut f.blr_pairs, move |ctx| BlrPairs::load(ctx, clients))
            .await
    }

    /// Returns the datacube.
    pub async fn datacube(&self) -> Result<Arc<Datacube>> {
        self.cached(|f| &mut f.datacube, Datacube::load).await
    }

    /// Returns a handle on the crawl job of an eDiscovery client and datasource.
    pub fn ediscovery_job(
        &self,
        client_id: u64,
        datasource_id: u64,
        target: CrawlTarget,
    ) -> Result<CrawlJob> {
        self.ensure_logged_in()?;
        Ok(CrawlJob::new(self.ctx.clone(), client_id, datasource_id, target))
    }
}

/// Probes the candidate web service URLs and returns the first that answers.
async fn discover(http: &HttpClient, config: &CommcellConfig) -> Result<String> {
    let candidates = config.candidate_urls();

    for url in &candidates {
        debug!(url = %url, "Probing web service");
        match http.probe(url).await {
            Ok(true) => return Ok(url.clone()),
            Ok(false) => debug!(url = %url, "Web service did not answer with 200"),
            Err(e) if config.force_https => return Err(e),
            Err(e) => warn!(url = %url, error = %e, "Web service probe failed, trying next"),
        }
    }

    Err(Error::Unreachable {
        attempted: candidates,
    })
}

impl std::fmt::Debug for Commcell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commcell")
            .field("web_service", &self.web_service())
            .field("commserv", &self.details.read().name)
            .field("logged_in", &self.is_logged_in())
            .finish_non_exhaustive()
    }
}
