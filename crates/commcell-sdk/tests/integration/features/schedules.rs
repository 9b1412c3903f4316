//! Schedule tests.

use std::sync::Arc;

use axum::http::Method;
use commcell_sdk::models::{Frequency, SchedulePattern, ScheduleQuery};
use commcell_sdk::{Fetcher, Lister};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::common::{logged_in, MockResponse, MockServer};

const QOPERATION: &str = "Qcommand/qoperation execute";

fn task_detail(subtasks: &[(u64, &str)]) -> Value {
    let subtasks: Vec<Value> = subtasks
        .iter()
        .map(|(id, name)| json!({"subTask": {"subTaskId": id, "subTaskName": name}}))
        .collect();
    json!({"taskDetail": [{"task": {"taskId": 10}, "subTasks": subtasks}]})
}

fn task_info() -> Value {
    json!({"taskInfo": {
        "task": {"taskId": 10, "taskFlags": {"disabled": true}},
        "associations": [{"clientName": "FileServer01"}],
        "subTasks": [{
            "subTask": {"subTaskId": 100, "subTaskName": "Nightly Full"},
            "pattern": {"freq_type": 8, "active_start_time": 75600},
            "options": {"backupOpts": {"backupLevel": 1}}
        }]
    }})
}

fn mount_schedules(server: &MockServer) -> Arc<Mutex<Vec<(u64, &'static str)>>> {
    let subtasks = Arc::new(Mutex::new(vec![(100, "Nightly Full"), (101, "Hourly Logs")]));

    let list = Arc::clone(&subtasks);
    server.on(Method::GET, "Schedules", move |_| {
        MockResponse::json(task_detail(&list.lock()))
    });
    server.on_json(Method::GET, "Schedules/10", task_info());
    subtasks
}

#[tokio::test]
async fn test_lookup_by_name_and_id() {
    let server = MockServer::start().await;
    mount_schedules(&server);
    let commcell = logged_in(&server).await;

    let schedules = commcell.schedules().await.expect("schedules");
    assert!(schedules.has("nightly full"));
    assert!(schedules
        .has_schedule(&ScheduleQuery::by_name("HOURLY LOGS"))
        .expect("query"));
    assert!(schedules
        .has_schedule(&ScheduleQuery::by_subtask_id(101))
        .expect("query"));
    assert!(schedules
        .has_schedule(&ScheduleQuery::by_task_id(10))
        .expect("query"));
    assert!(!schedules
        .has_schedule(&ScheduleQuery::by_subtask_id(999))
        .expect("query"));
    assert_eq!(schedules.summaries().len(), 2);

    let nightly = schedules
        .get(&ScheduleQuery::by_name("Nightly Full"))
        .await
        .expect("schedule");
    assert_eq!(nightly.subtask_id(), 100);
    assert_eq!(nightly.task_id(), 10);
    assert_eq!(nightly.name(), "Nightly Full");
    assert!(nightly.is_disabled());
    assert_eq!(nightly.schedule_freq_type(), Some("weekly"));
}

#[tokio::test]
async fn test_client_schedules_use_client_filter() {
    let server = MockServer::start().await;
    mount_schedules(&server);
    server.on_json(
        Method::GET,
        "Schedules?clientId=11",
        task_detail(&[(300, "FS Daily")]),
    );
    let commcell = logged_in(&server).await;

    let schedules = commcell.client_schedules(11).await.expect("client schedules");
    assert!(schedules.has("fs daily"));
    assert!(!schedules.has("nightly full"));

    let requests = server.requests_to(&Method::GET, "Schedules");
    assert_eq!(requests[0].query.as_deref(), Some("clientId=11"));
}

#[tokio::test]
async fn test_query_errors() {
    let server = MockServer::start().await;
    mount_schedules(&server);
    let commcell = logged_in(&server).await;

    let schedules = commcell.schedules().await.expect("schedules");

    let err = schedules.has_schedule(&ScheduleQuery::default()).unwrap_err();
    assert_eq!(err.code().to_string(), "Schedules/102");

    let err = schedules
        .get(&ScheduleQuery::by_name("Weekly Synthetic"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code().to_string(), "Schedules/105");

    let err = Fetcher::get(&*schedules, "weekly synthetic")
        .await
        .unwrap_err();
    assert_eq!(err.code().to_string(), "Schedules/105");
}

#[tokio::test]
async fn test_enable_and_run_now() {
    let server = MockServer::start().await;
    mount_schedules(&server);
    server.on_json(Method::POST, "Schedules/task/Action/Enable", json!({"errorCode": 0}));
    server.on_json(Method::POST, QOPERATION, json!({"jobIds": ["8812"]}));
    let commcell = logged_in(&server).await;

    let schedules = commcell.schedules().await.expect("schedules");
    let nightly = schedules
        .get(&ScheduleQuery::by_subtask_id(100))
        .await
        .expect("schedule");

    nightly.enable().await.expect("enable");
    let enable = server.requests_to(&Method::POST, "Schedules/task/Action/Enable");
    assert_eq!(enable[0].body, "taskId=10");
    assert_eq!(enable[0].header("content-type"), Some("text/plain"));

    assert_eq!(nightly.run_now().await.expect("run now"), "8812");
    let run = server.requests_to(&Method::POST, QOPERATION);
    let body = run[0].json();
    assert_eq!(body["TMMsg_TaskOperationReq"]["opType"], 5);
    assert_eq!(body["TMMsg_TaskOperationReq"]["taskIds"][0], 10);
}

#[tokio::test]
async fn test_set_pattern_keeps_task_and_options() {
    let server = MockServer::start().await;
    mount_schedules(&server);
    server.on_json(Method::POST, QOPERATION, json!({"taskId": 10}));
    let commcell = logged_in(&server).await;

    let schedules = commcell.schedules().await.expect("schedules");
    let mut nightly = schedules
        .get(&ScheduleQuery::by_name("nightly full"))
        .await
        .expect("schedule");

    let pattern = SchedulePattern::new(Frequency::daily());
    nightly.set_pattern(&pattern).await.expect("set pattern");

    let modify = server.requests_to(&Method::POST, QOPERATION);
    let body = modify[0].json();
    let task_info = &body["TMMsg_ModifyTaskReq"]["taskInfo"];
    assert_eq!(task_info["task"]["taskId"], 10);
    assert_eq!(task_info["associations"][0]["clientName"], "FileServer01");
    let subtask = &task_info["subTasks"][0];
    assert_eq!(subtask["pattern"]["freq_type"], 4);
    assert_eq!(subtask["options"]["backupOpts"]["backupLevel"], 1);
    assert_eq!(subtask["subTask"]["subTaskId"], 100);
}

#[tokio::test]
async fn test_delete_schedule() {
    let server = MockServer::start().await;
    let subtasks = mount_schedules(&server);
    let remove = Arc::clone(&subtasks);
    server.on(Method::POST, QOPERATION, move |_| {
        remove.lock().retain(|(id, _)| *id != 101);
        MockResponse::json(json!({"errorCode": 0}))
    });
    let commcell = logged_in(&server).await;

    let schedules = commcell.schedules().await.expect("schedules");
    schedules
        .delete(&ScheduleQuery::by_name("hourly logs"))
        .await
        .expect("delete");

    assert!(!schedules.has("hourly logs"));
    assert!(schedules.has("nightly full"));

    let delete = server.requests_to(&Method::POST, QOPERATION);
    let body = delete[0].json();
    let request = &body["TMMsg_TaskOperationReq"];
    assert_eq!(request["opType"], 3);
    assert_eq!(request["subtaskEntity"][0]["subtaskId"], 101);
}
