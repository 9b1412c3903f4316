//! eDiscovery crawl jobs.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::client::endpoints::Endpoint;
use crate::error::{Error, ErrorDomain, Result};
use crate::models::{CrawlJobState, CrawlTarget};
use crate::response::{self, extract_title};

use super::ApiContext;

/// Default interval between two job status calls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Operation code that starts a full crawl.
const START_OPERATION: u8 = 0;

/// Crawl job of one eDiscovery client and datasource.
///
/// # Example
///
/// ```rust,no_run
/// # use std::time::Duration;
/// # use commcell_sdk::Commcell;
/// # use commcell_sdk::models::CrawlTarget;
/// # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
/// let job = commcell
///     .ediscovery_job(42, 7, CrawlTarget::Client)?
///     .with_poll_interval(Duration::from_secs(30));
///
/// // Start the crawl and wait up to one hour for it to finish.
/// job.start_job(Some(Duration::from_secs(3600))).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CrawlJob {
    ctx: ApiContext,
    client_id: u64,
    datasource_id: u64,
    target: CrawlTarget,
    poll_interval: Duration,
}

impl CrawlJob {
    pub(crate) fn new(
        ctx: ApiContext,
        client_id: u64,
        datasource_id: u64,
        target: CrawlTarget,
    ) -> Self {
        Self {
            ctx,
            client_id,
            datasource_id,
            target,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the interval between status calls while waiting.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// eDiscovery client id.
    #[must_use]
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// Datasource id.
    #[must_use]
    pub fn datasource_id(&self) -> u64 {
        self.datasource_id
    }

    /// Starts the crawl job.
    ///
    /// With `wait` set, waits for the job to finish within that duration.
    #[instrument(skip(self), fields(client_id = self.client_id, datasource_id = self.datasource_id))]
    pub async fn start_job(&self, wait: Option<Duration>) -> Result<()> {
        let url = self.ctx.endpoints.format(
            Endpoint::EdiscoveryCrawl,
            &[
                &self.client_id,
                &self.datasource_id,
                &self.target.code(),
                &START_OPERATION,
            ],
        );
        let (ok, raw) = self.ctx.http.dispatch(reqwest::Method::GET, &url, None).await?;
        if !ok {
            return Err(Error::response(raw.status.as_u16(), extract_title(&raw.text())));
        }

        // The server answers an accepted crawl with an empty body.
        if let Some(value) = raw.json()? {
            return Err(start_error(&value));
        }
        info!("Crawl job started");

        match wait {
            Some(timeout) => self.wait_for_collection_job(timeout).await,
            None => Ok(()),
        }
    }

    /// Returns the `status` object of the last crawl job.
    #[instrument(skip(self), fields(client_id = self.client_id, datasource_id = self.datasource_id))]
    pub async fn get_job_status(&self) -> Result<Value> {
        let url = self.ctx.endpoints.format(
            Endpoint::EdiscoveryJobStatus,
            &[&self.client_id, &self.target.code(), &self.datasource_id],
        );
        let (ok, raw) = self.ctx.http.dispatch(reqwest::Method::GET, &url, None).await?;
        if !ok {
            return Err(Error::response(raw.status.as_u16(), extract_title(&raw.text())));
        }

        let value = raw.json()?.unwrap_or(Value::Null);
        status_from(value, "status", 105)
    }

    /// Returns the crawl job history of the client and datasource.
    #[instrument(skip(self), fields(client_id = self.client_id, datasource_id = self.datasource_id))]
    pub async fn get_job_history(&self) -> Result<Value> {
        let url = self.ctx.endpoints.format(
            Endpoint::EdiscoveryJobHistory,
            &[&self.client_id, &self.target.code(), &self.datasource_id],
        );
        let (ok, raw) = self.ctx.http.dispatch(reqwest::Method::GET, &url, None).await?;
        if !ok {
            return Err(Error::response(raw.status.as_u16(), extract_title(&raw.text())));
        }

        let value = raw.json()?.unwrap_or(Value::Null);
        status_from(value, "history", 104)
    }

    /// Polls the job status until the job reaches a terminal state.
    ///
    /// A timeout too large to be represented as a deadline waits without
    /// limit.
    pub async fn wait_for_collection_job(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if deadline.is_some_and(|deadline| Instant::now() > deadline) {
                return Err(Error::operation(
                    ErrorDomain::EdiscoveryClients,
                    102,
                    "Collection job Timeout",
                ));
            }

            let status = self.get_job_status().await?;
            let code = status
                .get("state")
                .and_then(response::error_code_value)
                .unwrap_or_default();
            let state = CrawlJobState::from_code(code);
            debug!(?state, "Crawl job state");

            match state {
                CrawlJobState::Completed => return Ok(()),
                CrawlJobState::CompletedWithError => {
                    return Err(Error::operation(
                        ErrorDomain::EdiscoveryClients,
                        102,
                        "Job status is marked as Completed with Error",
                    ));
                }
                CrawlJobState::Failed(_) => {
                    return Err(Error::operation(
                        ErrorDomain::EdiscoveryClients,
                        102,
                        "Job status is marked as Failed/Error/Pending",
                    ));
                }
                CrawlJobState::Running | CrawlJobState::Other(_) => {
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

fn start_error(value: &Value) -> Error {
    let code = value
        .get("errorCode")
        .and_then(response::error_code_value)
        .unwrap_or_default();
    if code != 0 {
        let message = value
            .get("errorMessage")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Error::operation(ErrorDomain::EdiscoveryClients, 102, message);
    }
    Error::JobNotStarted
}

/// Unwraps the `status` object of a job status or history reply.
fn status_from(mut value: Value, subject: &str, missing_code: u16) -> Result<Value> {
    if let Some(status) = value.get_mut("status") {
        return Ok(status.take());
    }

    match value.get("error") {
        Some(error) => {
            let code = error
                .get("errorCode")
                .and_then(response::error_code_value)
                .unwrap_or_default();
            let message = if code == 0 {
                format!("Something went wrong while fetching job {subject}")
            } else {
                error
                    .get("errLogMessage")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Err(Error::operation(ErrorDomain::EdiscoveryClients, 102, message))
        }
        None => Err(Error::operation(
            ErrorDomain::EdiscoveryClients,
            missing_code,
            format!("Job {subject} not found in response"),
        )),
    }
}
