//! Schedule lookup and pattern types.

use chrono::{Local, Month, NaiveDate, NaiveTime, Timelike, Weekday};
use serde_json::{json, Map, Value};

use crate::error::{Error, ErrorDomain, Result};

/// Selects one schedule by name, subtask id or task id.
///
/// When several selectors are set, the name is tried first, then the
/// subtask id, then the task id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleQuery {
    /// Schedule (subtask) name, matched case-insensitively.
    pub name: Option<String>,
    /// Subtask id.
    pub subtask_id: Option<u64>,
    /// Task id.
    pub task_id: Option<u64>,
}

impl ScheduleQuery {
    /// Selects by schedule name.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Selects by subtask id.
    #[must_use]
    pub fn by_subtask_id(id: u64) -> Self {
        Self {
            subtask_id: Some(id),
            ..Self::default()
        }
    }

    /// Selects by task id.
    #[must_use]
    pub fn by_task_id(id: u64) -> Self {
        Self {
            task_id: Some(id),
            ..Self::default()
        }
    }

    /// Returns true if no selector is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.subtask_id.is_none() && self.task_id.is_none()
    }
}

impl std::fmt::Display for ScheduleQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, self.subtask_id, self.task_id) {
            (Some(name), _, _) => write!(f, "{name}"),
            (None, Some(id), _) => write!(f, "subtask {id}"),
            (None, None, Some(id)) => write!(f, "task {id}"),
            (None, None, None) => write!(f, "<none>"),
        }
    }
}

/// Summary of one schedule from a schedule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSummary {
    /// Subtask id, the key of the schedule.
    pub subtask_id: u64,
    /// Owning task id.
    pub task_id: u64,
    /// Lower-cased schedule name, if the subtask has one.
    pub schedule_name: String,
    /// Task description.
    pub description: String,
}

/// Position of a relative schedule within the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RelativeDay {
    First = 1,
    Second = 2,
    Third = 3,
    Fourth = 4,
    Last = 5,
}

/// Day selector of a relative schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RelativeWeekday {
    Sunday = 1,
    Monday = 2,
    Tuesday = 3,
    Wednesday = 4,
    Thursday = 5,
    Friday = 6,
    Saturday = 7,
    Day = 8,
    Weekday = 9,
    WeekendDay = 10,
}

/// Settings of an automatic schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomaticSchedule {
    /// Minimum hours between jobs.
    pub min_interval_hours: u32,
    /// Minimum minutes between jobs.
    pub min_interval_minutes: u32,
    /// Maximum hours between jobs.
    pub max_interval_hours: u32,
    /// Maximum minutes between jobs.
    pub max_interval_minutes: u32,
    /// Minimum sync hours between jobs.
    pub min_sync_interval_hours: u32,
    /// Minimum sync minutes between jobs.
    pub min_sync_interval_minutes: u32,
    /// Ignore the operation window once the maximum interval has passed.
    pub ignore_opwindow_past_max_interval: bool,
    /// Only run on a wired network.
    pub wired_network_connection: bool,
    /// Skip metered networks.
    pub dont_use_metered_network: bool,
    /// Only run on AC power.
    pub ac_power: bool,
    /// Stop when the machine goes on battery.
    pub stop_if_on_battery: bool,
    /// Keep the machine awake while a job runs.
    pub stop_sleep_if_running_job: bool,
    /// Only run when CPU use is below this percentage.
    pub cpu_utilization_below: Option<u32>,
    /// Only run when CPU use is above this percentage.
    pub cpu_utilization_above: Option<u32>,
    /// Only run with at least this bandwidth, in kbps.
    pub min_network_bandwidth: Option<u32>,
    /// Only run on this network, as `(ip_address, subnet)`.
    pub specific_network: Option<(String, u8)>,
    /// Sweep start time in seconds after midnight.
    pub sweep_start_time: u32,
    /// Use storage space from the media agent.
    pub use_storage_space_from_ma: bool,
}

impl Default for AutomaticSchedule {
    fn default() -> Self {
        Self {
            min_interval_hours: 0,
            min_interval_minutes: 15,
            max_interval_hours: 72,
            max_interval_minutes: 0,
            min_sync_interval_hours: 0,
            min_sync_interval_minutes: 2,
            ignore_opwindow_past_max_interval: false,
            wired_network_connection: false,
            dont_use_metered_network: false,
            ac_power: false,
            stop_if_on_battery: false,
            stop_sleep_if_running_job: false,
            cpu_utilization_below: None,
            cpu_utilization_above: None,
            min_network_bandwidth: None,
            specific_network: None,
            sweep_start_time: 3600,
            use_storage_space_from_ma: false,
        }
    }
}

impl AutomaticSchedule {
    fn to_json(&self) -> Value {
        let (network_enabled, address, subnet) = match &self.specific_network {
            Some((address, subnet)) => (true, address.as_str(), *subnet),
            None => (false, "0.0.0.0", 24),
        };

        json!({
            "maxBackupInterval": self.max_interval_hours,
            "ignoreOpWindowPastMaxInterval": self.ignore_opwindow_past_max_interval,
            "minBackupIntervalMinutes": self.min_interval_minutes,
            "maxBackupIntervalMinutes": self.max_interval_minutes,
            "minSyncInterval": self.min_sync_interval_hours,
            "minBackupInterval": self.min_interval_hours,
            "minSyncIntervalMinutes": self.min_sync_interval_minutes,
            "stopIfOnBattery": {"enabled": self.stop_if_on_battery},
            "acPower": {"enabled": self.ac_power},
            "specfificNetwork": {
                "enabled": network_enabled,
                "ipAddress": {"family": 32, "address": address, "subnet": subnet}
            },
            "stopSleepIfBackUp": {"enabled": self.stop_sleep_if_running_job},
            "emergencyBackup": {
                "emergencyBackupCommandName": "",
                "emergencyBackup": {"enabled": false}
            },
            "cpuUtilization": {
                "enabled": self.cpu_utilization_below.is_some(),
                "threshold": self.cpu_utilization_below.unwrap_or(10)
            },
            "dontUseMeteredNetwork": {"enabled": self.dont_use_metered_network},
            "cpuUtilizationAbove": {
                "enabled": self.cpu_utilization_above.is_some(),
                "threshold": self.cpu_utilization_above.unwrap_or(10)
            },
            "wiredNetworkConnection": {"enabled": self.wired_network_connection},
            "minNetworkBandwidth": {
                "enabled": self.min_network_bandwidth.is_some(),
                "threshold": self.min_network_bandwidth.unwrap_or(128)
            },
            "sweepStartTime": self.sweep_start_time,
            "useStorageSpaceFromMA": self.use_storage_space_from_ma
        })
    }
}

/// How often a schedule runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Frequency {
    /// Runs once.
    OneTime,
    /// Every `repeat_days` days.
    Daily {
        /// Day interval.
        repeat_days: u32,
    },
    /// On the given weekdays every `repeat_weeks` weeks.
    Weekly {
        /// Days to run on; at least one is required.
        weekdays: Vec<Weekday>,
        /// Week interval.
        repeat_weeks: u32,
    },
    /// On a day of the month.
    Monthly {
        /// Day of the month, 1 to 31.
        on_day: u32,
        /// Month interval.
        repeat_months: u32,
    },
    /// On a relative day of the month, such as the second Tuesday.
    MonthlyRelative {
        /// Position in the month.
        relative_time: RelativeDay,
        /// Day selector.
        relative_weekday: RelativeWeekday,
        /// Month interval.
        repeat_months: u32,
    },
    /// On a day of a month every year.
    Yearly {
        /// Month to run in.
        on_month: Month,
        /// Day of the month, 1 to 31.
        on_day: u32,
    },
    /// On a relative day of a month every year.
    YearlyRelative {
        /// Position in the month.
        relative_time: RelativeDay,
        /// Day selector.
        relative_weekday: RelativeWeekday,
        /// Month to run in.
        on_month: Month,
    },
    /// Continuously, with `job_interval` minutes between jobs.
    Continuous {
        /// Minutes between jobs.
        job_interval: u32,
    },
    /// After the previous job completes.
    AfterJobCompletes {
        /// Recurrence factor.
        repeat_days: u32,
    },
    /// Automatic schedule driven by client conditions.
    Automatic(AutomaticSchedule),
}

impl Frequency {
    /// Daily with the default interval of one day.
    #[must_use]
    pub fn daily() -> Self {
        Self::Daily { repeat_days: 1 }
    }

    /// Weekly on the given days.
    #[must_use]
    pub fn weekly(weekdays: Vec<Weekday>) -> Self {
        Self::Weekly {
            weekdays,
            repeat_weeks: 1,
        }
    }

    /// Monthly on the default day, the 10th.
    #[must_use]
    pub fn monthly() -> Self {
        Self::Monthly {
            on_day: 10,
            repeat_months: 1,
        }
    }

    /// Continuous with the default 30 minute interval.
    #[must_use]
    pub fn continuous() -> Self {
        Self::Continuous { job_interval: 30 }
    }

    /// After job completes with the default recurrence factor.
    #[must_use]
    pub fn after_job_completes() -> Self {
        Self::AfterJobCompletes { repeat_days: 4096 }
    }

    /// Server frequency code. `AfterJobCompletes` is sent as a string.
    #[must_use]
    pub fn code(&self) -> Value {
        match self {
            Self::OneTime => json!(1),
            Self::Daily { .. } => json!(4),
            Self::Weekly { .. } => json!(8),
            Self::Monthly { .. } => json!(16),
            Self::MonthlyRelative { .. } => json!(32),
            Self::Yearly { .. } => json!(64),
            Self::YearlyRelative { .. } => json!(128),
            Self::Automatic(_) => json!(1024),
            Self::Continuous { .. } => json!(4096),
            Self::AfterJobCompletes { .. } => json!("After_Job_Completes"),
        }
    }

    /// Name of a server frequency code, as used in schedule summaries.
    #[must_use]
    pub fn name_for_code(code: &Value) -> Option<&'static str> {
        if code.as_str() == Some("After_Job_Completes") {
            return Some("after_job_completes");
        }
        let name = match crate::response::as_id(code)? {
            1 => "one_time",
            2 => "on_demand",
            4 => "daily",
            8 => "weekly",
            16 => "monthly",
            32 => "monthly_relative",
            64 => "yearly",
            128 => "yearly_relative",
            1024 => "automatic",
            4096 => "continuous",
            _ => return None,
        };
        Some(name)
    }

    /// Returns `(freq_interval, freq_relative_interval, freq_recurrence_factor)`.
    fn intervals(&self) -> Result<(u32, u32, u32)> {
        let values = match self {
            Self::OneTime | Self::Automatic(_) => (0, 0, 0),
            Self::Daily { repeat_days } => (0, 0, *repeat_days),
            Self::Weekly {
                weekdays,
                repeat_weeks,
            } => {
                if weekdays.is_empty() {
                    return Err(invalid("Weekdays need to be specified"));
                }
                (weekday_mask(weekdays), 0, *repeat_weeks)
            }
            Self::Monthly {
                on_day,
                repeat_months,
            } => (check_day(*on_day)?, 0, *repeat_months),
            Self::MonthlyRelative {
                relative_time,
                relative_weekday,
                repeat_months,
            } => (
                *relative_weekday as u32,
                *relative_time as u32,
                *repeat_months,
            ),
            Self::Yearly { on_month, on_day } => {
                (check_day(*on_day)?, 0, on_month.number_from_month())
            }
            Self::YearlyRelative {
                relative_time,
                relative_weekday,
                on_month,
            } => (
                *relative_weekday as u32,
                *relative_time as u32,
                on_month.number_from_month(),
            ),
            Self::Continuous { job_interval } => (*job_interval, 0, 0),
            Self::AfterJobCompletes { repeat_days } => (0, 0, *repeat_days),
        };
        Ok(values)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::operation(ErrorDomain::Schedules, 102, message)
}

fn check_day(day: u32) -> Result<u32> {
    if (1..=31).contains(&day) {
        Ok(day)
    } else {
        Err(invalid(format!("Invalid day of month: {day}")))
    }
}

/// Bitmask of weekdays: sunday 1, monday 2, up to saturday 64.
#[must_use]
pub fn weekday_mask(weekdays: &[Weekday]) -> u32 {
    weekdays
        .iter()
        .fold(0, |mask, day| mask | (1 << day.num_days_from_sunday()))
}

/// Encodes days of the month to skip as an `onDayNumber` bitmask.
#[must_use]
pub fn exception_day_mask(days: &[u32]) -> u64 {
    days.iter()
        .filter(|d| (1..=31).contains(*d))
        .fold(0, |mask, day| mask | (1 << (day - 1)))
}

/// Parses a `MM/DD/YYYY` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%m/%d/%Y")
        .map_err(|_| invalid("Incorrect data format, should be %m/%d/%Y"))
}

/// Parses an `HH:MM` time.
pub fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| invalid("Incorrect data format, should be %H:%M"))
}

fn epoch_seconds(date: NaiveDate) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    date.signed_duration_since(epoch).num_days() * 86_400
}

fn seconds_of_day(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight()
}

/// Schedule pattern that can be merged into a task request.
///
/// # Example
///
/// ```rust
/// use chrono::Weekday;
/// use commcell_sdk::models::{Frequency, SchedulePattern};
///
/// let pattern = SchedulePattern::new(Frequency::weekly(vec![Weekday::Mon, Weekday::Fri]))
///     .with_name("nightly")
///     .with_start_time(commcell_sdk::models::parse_time("22:30").unwrap());
///
/// let json = pattern.to_json().unwrap();
/// assert_eq!(json["freq_type"], 8);
/// assert_eq!(json["freq_interval"], 34);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulePattern {
    frequency: Frequency,
    name: Option<String>,
    start_date: Option<NaiveDate>,
    start_time: Option<NaiveTime>,
    end_date: Option<NaiveDate>,
    end_after: Option<u32>,
    exception_dates: Vec<u32>,
    repeat: Option<(NaiveTime, NaiveTime)>,
    time_zone: Option<String>,
}

impl SchedulePattern {
    /// Creates a pattern with the given frequency and defaults for everything else.
    #[must_use]
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            name: None,
            start_date: None,
            start_time: None,
            end_date: None,
            end_after: None,
            exception_dates: Vec::new(),
            repeat: None,
            time_zone: None,
        }
    }

    /// The frequency of this pattern.
    #[must_use]
    pub fn frequency(&self) -> &Frequency {
        &self.frequency
    }

    /// Sets the schedule name given to each subtask.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the start date. Defaults to today.
    #[must_use]
    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Sets the start time. Defaults to 09:00, or now for one time schedules.
    #[must_use]
    pub fn with_start_time(mut self, time: NaiveTime) -> Self {
        self.start_time = Some(time);
        self
    }

    /// Sets the last date the schedule runs on.
    #[must_use]
    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Stops the schedule after `occurrences` runs.
    #[must_use]
    pub fn with_end_after(mut self, occurrences: u32) -> Self {
        self.end_after = Some(occurrences);
        self
    }

    /// Days of the month (1 to 31) on which the schedule does not run.
    #[must_use]
    pub fn with_exception_dates(mut self, days: Vec<u32>) -> Self {
        self.exception_dates = days;
        self
    }

    /// Repeats the job every `every` (as `HH:MM`) until `until` each day.
    #[must_use]
    pub fn with_repeat(mut self, every: NaiveTime, until: NaiveTime) -> Self {
        self.repeat = Some((every, until));
        self
    }

    /// Sets the time zone name, e.g. `"UTC"` or `"CommServe Time Zone"`.
    #[must_use]
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Builds the `pattern` object of a subtask.
    ///
    /// For automatic schedules this returns the automatic settings, which go
    /// under `commonOpts` instead; see [`SchedulePattern::apply_to`].
    pub fn to_json(&self) -> Result<Value> {
        if let Frequency::Automatic(settings) = &self.frequency {
            return Ok(settings.to_json());
        }

        let (freq_interval, freq_relative_interval, freq_recurrence_factor) =
            self.frequency.intervals()?;

        let now = Local::now();
        let start_date = self.start_date.unwrap_or_else(|| now.date_naive());
        let start_time = self.start_time.unwrap_or_else(|| match self.frequency {
            Frequency::OneTime => {
                NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or_default()
            }
            _ => NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
        });

        let mut pattern = Map::new();
        pattern.insert("freq_type".into(), self.frequency.code());
        pattern.insert("active_start_date".into(), json!(epoch_seconds(start_date)));
        pattern.insert("active_start_time".into(), json!(seconds_of_day(start_time)));
        pattern.insert("freq_recurrence_factor".into(), json!(freq_recurrence_factor));
        pattern.insert("freq_interval".into(), json!(freq_interval));
        pattern.insert("freq_relative_interval".into(), json!(freq_relative_interval));
        pattern.insert(
            "timeZone".into(),
            json!({"TimeZoneName": self.time_zone.clone().unwrap_or_default()}),
        );

        if let Some(end_date) = self.end_date {
            pattern.insert("active_end_date".into(), json!(epoch_seconds(end_date)));
        }
        if !self.exception_dates.is_empty() {
            pattern.insert(
                "repeatPattern".into(),
                json!([{"exception": true, "onDayNumber": exception_day_mask(&self.exception_dates)}]),
            );
        }
        if let Some(end_after) = self.end_after {
            pattern.insert("active_end_occurence".into(), json!(end_after));
        }
        if let Some((every, until)) = self.repeat {
            pattern.insert("freq_subday_interval".into(), json!(seconds_of_day(every)));
            pattern.insert("active_end_time".into(), json!(seconds_of_day(until)));
        }

        Ok(Value::Object(pattern))
    }

    /// Turns an immediate task request into a scheduled one.
    ///
    /// Sets `taskInfo.task.taskType` to 2, names every subtask and attaches
    /// the pattern to it.
    pub fn apply_to(&self, task_request: &mut Value) -> Result<()> {
        let automatic = matches!(self.frequency, Frequency::Automatic(_));
        let (pattern, automatic_settings) = if automatic {
            (json!({"freq_type": 1024}), Some(self.to_json()?))
        } else {
            (self.to_json()?, None)
        };

        let task_info = task_request
            .get_mut("taskInfo")
            .ok_or_else(|| invalid("Task request has no taskInfo"))?;

        if let Some(task) = task_info.get_mut("task").filter(|t| t.is_object()) {
            task["taskType"] = json!(2);
        }

        let subtasks = task_info
            .get_mut("subTasks")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| invalid("Task request has no subTasks"))?;

        for subtask in subtasks {
            if !subtask.is_object() {
                continue;
            }
            if !subtask.get("subTask").is_some_and(Value::is_object) {
                subtask["subTask"] = json!({});
            }
            subtask["subTask"]["subTaskName"] = json!(self.name.clone().unwrap_or_default());
            subtask["pattern"] = pattern.clone();

            if let Some(settings) = &automatic_settings {
                if !subtask.get("options").is_some_and(Value::is_object) {
                    subtask["options"] = json!({});
                }
                if !subtask["options"].get("commonOpts").is_some_and(Value::is_object) {
                    subtask["options"]["commonOpts"] = json!({});
                }
                subtask["options"]["commonOpts"]["automaticSchedulePattern"] = settings.clone();
            }
        }

        Ok(())
    }
}
