//! Schedules service.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::endpoints::Endpoint;
use crate::client::http::Payload;
use crate::error::{Error, ErrorDomain, Result};
use crate::models::{Frequency, SchedulePattern, ScheduleQuery, ScheduleSummary};
use crate::response::{self, as_id};

use super::{ApiContext, EntityMap, Fetcher, Lister};

/// Schedules of the commcell or of one client.
///
/// Schedules are keyed by subtask id; names are not unique on the server.
///
/// # Example
///
/// ```rust,no_run
/// # use commcell_sdk::Commcell;
/// # use commcell_sdk::models::ScheduleQuery;
/// # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
/// let schedules = commcell.schedules().await?;
/// let nightly = schedules.get(&ScheduleQuery::by_name("Nightly Incremental")).await?;
/// if nightly.is_disabled() {
///     nightly.enable().await?;
/// }
/// let job_id = nightly.run_now().await?;
/// println!("started job {job_id}");
/// # Ok(())
/// # }
/// ```
pub struct Schedules {
    ctx: ApiContext,
    url: String,
    schedules: RwLock<BTreeMap<u64, ScheduleSummary>>,
}

impl std::fmt::Debug for Schedules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedules")
            .field("url", &self.url)
            .field("count", &self.schedules.read().len())
            .finish_non_exhaustive()
    }
}

impl Schedules {
    /// Schedules of the whole commcell.
    pub(crate) async fn for_commcell(ctx: ApiContext) -> Result<Self> {
        let url = ctx.endpoints.url(Endpoint::CommcellSchedules).to_string();
        Self::load(ctx, url).await
    }

    /// Schedules associated with one client.
    pub(crate) async fn for_client(ctx: ApiContext, client_id: u64) -> Result<Self> {
        let url = ctx.endpoints.format(Endpoint::ClientSchedules, &[&client_id]);
        Self::load(ctx, url).await
    }

    async fn load(ctx: ApiContext, url: String) -> Result<Self> {
        let schedules = Self {
            ctx,
            url,
            schedules: RwLock::new(BTreeMap::new()),
        };
        schedules.refresh().await?;
        Ok(schedules)
    }

    /// Summaries of every schedule, ordered by subtask id.
    #[must_use]
    pub fn summaries(&self) -> Vec<ScheduleSummary> {
        self.schedules.read().values().cloned().collect()
    }

    /// Resolves a query to a subtask id.
    ///
    /// Returns `Ok(None)` when nothing matches and an error when the query
    /// has no selector.
    pub fn resolve(&self, query: &ScheduleQuery) -> Result<Option<u64>> {
        if query.is_empty() {
            return Err(Error::operation(
                ErrorDomain::Schedules,
                102,
                "Either Schedule Name or Schedule Id is needed",
            ));
        }

        let schedules = self.schedules.read();
        let found = if let Some(name) = &query.name {
            let name = name.to_lowercase();
            schedules
                .values()
                .find(|s| s.schedule_name == name)
                .map(|s| s.subtask_id)
        } else if let Some(id) = query.subtask_id {
            schedules.contains_key(&id).then_some(id)
        } else {
            query.task_id.and_then(|task_id| {
                schedules
                    .values()
                    .find(|s| s.task_id == task_id)
                    .map(|s| s.subtask_id)
            })
        };
        Ok(found)
    }

    /// Returns true if a schedule matches the query.
    pub fn has_schedule(&self, query: &ScheduleQuery) -> Result<bool> {
        Ok(self.resolve(query)?.is_some())
    }

    /// Returns the schedule matching the query.
    pub async fn get(&self, query: &ScheduleQuery) -> Result<Schedule> {
        let subtask_id = self
            .resolve(query)?
            .ok_or_else(|| not_found(query))?;
        let task_id = self
            .schedules
            .read()
            .get(&subtask_id)
            .map(|s| s.task_id)
            .unwrap_or_default();
        Schedule::load(self.ctx.clone(), subtask_id, task_id).await
    }

    /// Deletes the schedule matching the query.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn delete(&self, query: &ScheduleQuery) -> Result<()> {
        let subtask_id = self
            .resolve(query)?
            .ok_or_else(|| not_found(query))?;

        let request = json!({
            "TMMsg_TaskOperationReq": {
                "opType": 3,
                "subtaskEntity": [{"_type_": 68, "subtaskId": subtask_id}]
            }
        });
        let url = self.ctx.endpoints.url(Endpoint::ExecuteQoperation);
        let value = self
            .ctx
            .http
            .post(url, &request, ErrorDomain::Schedules)
            .await?;
        response::require(&value, "errorCode")?;

        self.refresh().await
    }
}

fn not_found(query: &ScheduleQuery) -> Error {
    Error::not_found(ErrorDomain::Schedules, "schedule", query.to_string())
}

/// Reads the schedule summaries out of a `taskDetail` list.
pub(crate) fn parse_task_details(value: &Value) -> BTreeMap<u64, ScheduleSummary> {
    let mut out = BTreeMap::new();

    for task in value.get("taskDetail").and_then(Value::as_array).into_iter().flatten() {
        let Some(task_id) = task.pointer("/task/taskId").and_then(as_id) else {
            continue;
        };
        let mut description = String::new();

        for subtask in task.get("subTasks").and_then(Value::as_array).into_iter().flatten() {
            let Some(subtask_id) = subtask.pointer("/subTask/subTaskId").and_then(as_id) else {
                continue;
            };
            if subtask.pointer("/subTask/description").is_some() {
                description = subtask
                    .pointer("/pattern/description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_lowercase();
            }
            let name = subtask.pointer("/subTask/subTaskName").and_then(Value::as_str);
            let schedule_name = match name {
                Some(name) => name.to_lowercase(),
                None if !description.is_empty() => description.clone(),
                None => subtask_id.to_string(),
            };

            out.insert(
                subtask_id,
                ScheduleSummary {
                    subtask_id,
                    task_id,
                    schedule_name,
                    description: description.clone(),
                },
            );
        }
    }
    out
}

#[async_trait]
impl Lister for Schedules {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn refresh(&self) -> Result<()> {
        let value = self.ctx.http.get(&self.url, ErrorDomain::Schedules).await?;
        let schedules = parse_task_details(&value);
        debug!(count = schedules.len(), "Refreshed schedules");
        *self.schedules.write() = schedules;
        Ok(())
    }

    /// Schedules keyed by name.
    fn all(&self) -> EntityMap {
        let mut map = EntityMap::new();
        for s in self.schedules.read().values() {
            map.insert(
                &s.schedule_name,
                json!({
                    "subtask_id": s.subtask_id,
                    "task_id": s.task_id,
                    "description": s.description,
                }),
            );
        }
        map
    }
}

#[async_trait]
impl Fetcher for Schedules {
    type Item = Schedule;

    async fn get(&self, name: &str) -> Result<Schedule> {
        Schedules::get(self, &ScheduleQuery::by_name(name)).await
    }
}

/// One schedule (a task subtask with a pattern).
#[derive(Debug, Clone)]
pub struct Schedule {
    ctx: ApiContext,
    subtask_id: u64,
    task_id: u64,
    name: String,
    task: Value,
    associations: Value,
    subtask: Value,
}

impl Schedule {
    async fn load(ctx: ApiContext, subtask_id: u64, task_id: u64) -> Result<Self> {
        let mut schedule = Self {
            ctx,
            subtask_id,
            task_id,
            name: String::new(),
            task: Value::Null,
            associations: Value::Null,
            subtask: Value::Null,
        };
        schedule.refresh().await?;
        Ok(schedule)
    }

    /// Re-reads the task of this schedule.
    pub async fn refresh(&mut self) -> Result<()> {
        let url = self.ctx.endpoints.format(Endpoint::Schedule, &[&self.task_id]);
        let value = self.ctx.http.get(&url, ErrorDomain::Schedules).await?;
        let task_info = response::require(&value, "taskInfo")?;

        self.task = task_info.get("task").cloned().unwrap_or(Value::Null);
        self.associations = task_info.get("associations").cloned().unwrap_or(Value::Null);

        let subtask = task_info
            .get("subTasks")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|s| s.pointer("/subTask/subTaskId").and_then(as_id) == Some(self.subtask_id))
            .cloned()
            .ok_or_else(|| {
                Error::not_found(ErrorDomain::Schedules, "schedule", self.subtask_id.to_string())
            })?;

        self.name = subtask
            .pointer("/subTask/subTaskName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.subtask = subtask;
        Ok(())
    }

    /// Subtask id, the schedule id.
    #[must_use]
    pub fn subtask_id(&self) -> u64 {
        self.subtask_id
    }

    /// Id of the owning task.
    #[must_use]
    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    /// Schedule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the owning task is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.task
            .pointer("/taskFlags/disabled")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Raw `pattern` object of the subtask.
    #[must_use]
    pub fn pattern(&self) -> &Value {
        self.subtask.get("pattern").unwrap_or(&Value::Null)
    }

    /// Frequency name of the pattern, e.g. `weekly`.
    #[must_use]
    pub fn schedule_freq_type(&self) -> Option<&'static str> {
        self.pattern()
            .get("freq_type")
            .and_then(Frequency::name_for_code)
    }

    /// Enables the owning task.
    pub async fn enable(&self) -> Result<()> {
        self.toggle(Endpoint::EnableSchedule).await
    }

    /// Disables the owning task.
    pub async fn disable(&self) -> Result<()> {
        self.toggle(Endpoint::DisableSchedule).await
    }

    #[instrument(skip(self), fields(task_id = self.task_id))]
    async fn toggle(&self, endpoint: Endpoint) -> Result<()> {
        let url = self.ctx.endpoints.url(endpoint);
        let payload = Payload::Text(format!("taskId={}", self.task_id));
        let value = self
            .ctx
            .http
            .request(Method::POST, url, Some(&payload), ErrorDomain::Schedules)
            .await?;
        response::require(&value, "errorCode")?;
        Ok(())
    }

    /// Runs the schedule now and returns the job id.
    #[instrument(skip(self), fields(subtask_id = self.subtask_id))]
    pub async fn run_now(&self) -> Result<String> {
        let request = json!({
            "TMMsg_TaskOperationReq": {
                "opType": 5,
                "subtaskEntity": [{
                    "_type_": 68,
                    "subtaskId": self.subtask_id,
                    "taskName": "",
                    "subtaskName": self.name,
                    "taskId": self.task_id
                }],
                "taskIds": [self.task_id]
            }
        });
        let url = self.ctx.endpoints.url(Endpoint::ExecuteQoperation);
        let value = self
            .ctx
            .http
            .post(url, &request, ErrorDomain::Schedules)
            .await?;

        match value.pointer("/jobIds/0") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(Error::empty("JobID not found in response")),
        }
    }

    /// Replaces the pattern of this schedule.
    #[instrument(skip(self, pattern), fields(subtask_id = self.subtask_id))]
    pub async fn set_pattern(&mut self, pattern: &SchedulePattern) -> Result<()> {
        let mut subtask = self.subtask.clone();
        if let Frequency::Automatic(_) = pattern.frequency() {
            subtask["pattern"] = json!({"freq_type": 1024});
            if !subtask.get("options").is_some_and(Value::is_object) {
                subtask["options"] = json!({});
            }
            if !subtask["options"].get("commonOpts").is_some_and(Value::is_object) {
                subtask["options"]["commonOpts"] = json!({});
            }
            subtask["options"]["commonOpts"]["automaticSchedulePattern"] = pattern.to_json()?;
        } else {
            subtask["pattern"] = pattern.to_json()?;
        }

        let request = json!({
            "TMMsg_ModifyTaskReq": {
                "taskInfo": {
                    "associations": self.associations,
                    "task": self.task,
                    "subTasks": [{
                        "subTask": subtask.get("subTask"),
                        "pattern": subtask.get("pattern"),
                        "options": subtask.get("options"),
                    }]
                }
            }
        });
        let url = self.ctx.endpoints.url(Endpoint::ExecuteQoperation);
        let value = self
            .ctx
            .http
            .post(url, &request, ErrorDomain::Schedules)
            .await?;
        if value.get("taskId").is_none() && value.get("errorCode").is_none() {
            return Err(Error::EmptyResponse { detail: None });
        }

        self.refresh().await
    }
}
