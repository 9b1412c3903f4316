//! Endpoint map resolved against the web service base URL.

use std::collections::HashMap;
use std::fmt::Display;

/// Named REST endpoints used by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Endpoint {
    Login,
    Logout,
    RenewLoginToken,
    CommServ,
    WhoAmI,
    Clients,
    Client,
    DeleteClient,
    ClientGroups,
    ClientGroup,
    StoragePolicies,
    StoragePolicy,
    CommcellSchedules,
    ClientSchedules,
    Schedule,
    EnableSchedule,
    DisableSchedule,
    ExecuteQoperation,
    ExecuteQcommand,
    EntityTags,
    CreateEntityTag,
    DeleteEntityTag,
    BlrPairs,
    BlrPair,
    DeleteBlrPair,
    CreateBlrPair,
    BlrPairStats,
    BlrRecoveryPointStores,
    AnalyticsEngines,
    Datasources,
    CreateDatasource,
    DeleteDatasource,
    StartDatasourceJob,
    DatasourceStatus,
    EdiscoveryCrawl,
    EdiscoveryJobStatus,
    EdiscoveryJobHistory,
}

impl Endpoint {
    const ALL: [Self; 37] = [
        Self::Login,
        Self::Logout,
        Self::RenewLoginToken,
        Self::CommServ,
        Self::WhoAmI,
        Self::Clients,
        Self::Client,
        Self::DeleteClient,
        Self::ClientGroups,
        Self::ClientGroup,
        Self::StoragePolicies,
        Self::StoragePolicy,
        Self::CommcellSchedules,
        Self::ClientSchedules,
        Self::Schedule,
        Self::EnableSchedule,
        Self::DisableSchedule,
        Self::ExecuteQoperation,
        Self::ExecuteQcommand,
        Self::EntityTags,
        Self::CreateEntityTag,
        Self::DeleteEntityTag,
        Self::BlrPairs,
        Self::BlrPair,
        Self::DeleteBlrPair,
        Self::CreateBlrPair,
        Self::BlrPairStats,
        Self::BlrRecoveryPointStores,
        Self::AnalyticsEngines,
        Self::Datasources,
        Self::CreateDatasource,
        Self::DeleteDatasource,
        Self::StartDatasourceJob,
        Self::DatasourceStatus,
        Self::EdiscoveryCrawl,
        Self::EdiscoveryJobStatus,
        Self::EdiscoveryJobHistory,
    ];

    /// Path template relative to the base URL. `{}` marks a parameter.
    #[must_use]
    pub fn template(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Logout => "Logout",
            Self::RenewLoginToken => "RenewLoginToken",
            Self::CommServ => "CommServ",
            Self::WhoAmI => "WhoAmI",
            Self::Clients => "Client",
            Self::Client => "Client/{}",
            Self::DeleteClient => "Client/{}?forceDelete=1",
            Self::ClientGroups => "ClientGroup",
            Self::ClientGroup => "ClientGroup/{}",
            Self::StoragePolicies => "StoragePolicy",
            Self::StoragePolicy => "StoragePolicy/{}",
            Self::CommcellSchedules => "Schedules",
            Self::ClientSchedules => "Schedules?clientId={}",
            Self::Schedule => "Schedules/{}",
            Self::EnableSchedule => "Schedules/task/Action/Enable",
            Self::DisableSchedule => "Schedules/task/Action/Disable",
            Self::ExecuteQoperation => "Qcommand/qoperation execute",
            Self::ExecuteQcommand => "ExecuteQCommand",
            Self::EntityTags => "V4/Tags/AssociatedEntities",
            Self::CreateEntityTag => "EDiscovery/Tags",
            Self::DeleteEntityTag => "V4/EntityTags/{}",
            Self::BlrPairs => "Replications/Monitors/continuous",
            Self::BlrPair => "Replications/Monitors/continuous?replicationPairId={}",
            Self::DeleteBlrPair => "Replications/Monitors/continuous/{}",
            Self::CreateBlrPair => "Replications/Groups",
            Self::BlrPairStats => "Replications/Statistics/{}",
            Self::BlrRecoveryPointStores => {
                "Replications/Monitors/continuous/VmScale?destProxyClientId={}&subclientId={}&vmUuid={}"
            }
            Self::AnalyticsEngines => "dcube/getAnalyticsEngine",
            Self::Datasources => "dcube/GetDataSources?summary=1",
            Self::CreateDatasource => "dcube/createDataSource",
            Self::DeleteDatasource => "dcube/deleteDataSource/{}",
            Self::StartDatasourceJob => "dcube/startjob/{}",
            Self::DatasourceStatus => "dcube/GetStatus/{}",
            Self::EdiscoveryCrawl => {
                "EDiscoveryClients/Clients/{}/Jobs?datasourceId={}&type={}&operation={}"
            }
            Self::EdiscoveryJobStatus => {
                "EDiscoveryClients/Clients/{}/Jobs/Status?type={}&datasourceId={}"
            }
            Self::EdiscoveryJobHistory => {
                "EDiscoveryClients/Clients/{}/Jobs/History?type={}&datasourceId={}"
            }
        }
    }
}

/// Endpoint URLs for one web service, built once per session.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
    urls: HashMap<Endpoint, String>,
}

impl Endpoints {
    /// Resolves every endpoint against `base`, which must end with `/`.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        let urls = Endpoint::ALL
            .iter()
            .map(|e| (*e, format!("{base}{}", e.template())))
            .collect();
        Self { base, urls }
    }

    /// The web service base URL.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the URL of a parameterless endpoint.
    #[must_use]
    pub fn url(&self, endpoint: Endpoint) -> &str {
        self.urls
            .get(&endpoint)
            .map_or(self.base.as_str(), String::as_str)
    }

    /// Returns the URL of an endpoint with its `{}` parameters filled in order.
    ///
    /// Parameters are percent-encoded.
    #[must_use]
    pub fn format(&self, endpoint: Endpoint, params: &[&dyn Display]) -> String {
        let mut out = String::new();
        let mut params = params.iter();
        let mut parts = self.url(endpoint).split("{}").peekable();

        while let Some(part) = parts.next() {
            out.push_str(part);
            if parts.peek().is_some() {
                if let Some(param) = params.next() {
                    out.push_str(&urlencoding::encode(&param.to_string()));
                }
            }
        }
        out
    }

    /// Joins a relative path to the base URL. Absolute URLs are returned unchanged.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base, path.trim_start_matches('/'))
        }
    }
}
