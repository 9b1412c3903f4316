//! eDiscovery crawl job tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use commcell_sdk::models::CrawlTarget;
use commcell_sdk::Error;
use serde_json::json;

use crate::common::{logged_in, MockResponse, MockServer};

const START_ROUTE: &str = "EDiscoveryClients/Clients/42/Jobs?datasourceId=7&type=1&operation=0";
const STATUS_ROUTE: &str = "EDiscoveryClients/Clients/42/Jobs/Status?type=1&datasourceId=7";
const HISTORY_ROUTE: &str = "EDiscoveryClients/Clients/42/Jobs/History?type=1&datasourceId=7";

/// Answers each status call with the next state, repeating the last one.
fn mount_states(server: &MockServer, states: &'static [i64]) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    server.on(Method::GET, STATUS_ROUTE, move |_| {
        let call = seen.fetch_add(1, Ordering::SeqCst);
        let state = states[call.min(states.len() - 1)];
        MockResponse::json(json!({"status": {"state": state, "totalcount": 10}}))
    });
    calls
}

#[tokio::test]
async fn test_start_and_wait_until_completed() {
    let server = MockServer::start().await;
    server.on(Method::GET, START_ROUTE, |_| MockResponse::empty());
    let calls = mount_states(&server, &[0, 0, 1]);
    let commcell = logged_in(&server).await;

    let job = commcell
        .ediscovery_job(42, 7, CrawlTarget::Client)
        .expect("job")
        .with_poll_interval(Duration::from_millis(10));
    assert_eq!(job.client_id(), 42);
    assert_eq!(job.datasource_id(), 7);

    job.start_job(Some(Duration::from_secs(5)))
        .await
        .expect("crawl job");

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let start = server.requests_to(&Method::GET, "EDiscoveryClients/Clients/42/Jobs");
    assert_eq!(
        start[0].query.as_deref(),
        Some("datasourceId=7&type=1&operation=0")
    );
}

#[tokio::test]
async fn test_start_without_wait_skips_polling() {
    let server = MockServer::start().await;
    server.on(Method::GET, START_ROUTE, |_| MockResponse::empty());
    let calls = mount_states(&server, &[0]);
    let commcell = logged_in(&server).await;

    let job = commcell
        .ediscovery_job(42, 7, CrawlTarget::Client)
        .expect("job");
    job.start_job(None).await.expect("crawl job");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_start_rejected() {
    let server = MockServer::start().await;
    server.on_json(
        Method::GET,
        START_ROUTE,
        json!({"errorCode": 17, "errorMessage": "A crawl job is already running"}),
    );
    let commcell = logged_in(&server).await;

    let job = commcell
        .ediscovery_job(42, 7, CrawlTarget::Client)
        .expect("job");
    let err = job.start_job(None).await.unwrap_err();
    assert_eq!(err.code().to_string(), "EdiscoveryClients/102");
    assert_eq!(err.to_string(), "A crawl job is already running");

    server.on_json(Method::GET, START_ROUTE, json!({"errorCode": 0}));
    let err = job.start_job(None).await.unwrap_err();
    assert!(matches!(err, Error::JobNotStarted));
}

#[tokio::test]
async fn test_completed_with_error_state() {
    let server = MockServer::start().await;
    mount_states(&server, &[0, 10]);
    let commcell = logged_in(&server).await;

    let job = commcell
        .ediscovery_job(42, 7, CrawlTarget::Client)
        .expect("job")
        .with_poll_interval(Duration::from_millis(10));
    let err = job
        .wait_for_collection_job(Duration::from_secs(5))
        .await
        .unwrap_err();

    assert_eq!(err.code().to_string(), "EdiscoveryClients/102");
    assert!(err.to_string().contains("Completed with Error"));
}

#[tokio::test]
async fn test_failed_state() {
    let server = MockServer::start().await;
    mount_states(&server, &[3]);
    let commcell = logged_in(&server).await;

    let job = commcell
        .ediscovery_job(42, 7, CrawlTarget::Client)
        .expect("job");
    let err = job
        .wait_for_collection_job(Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Failed"));
}

#[tokio::test]
async fn test_wait_times_out() {
    let server = MockServer::start().await;
    let calls = mount_states(&server, &[0]);
    let commcell = logged_in(&server).await;

    let job = commcell
        .ediscovery_job(42, 7, CrawlTarget::Client)
        .expect("job")
        .with_poll_interval(Duration::from_millis(20));
    let err = job
        .wait_for_collection_job(Duration::from_millis(100))
        .await
        .unwrap_err();

    assert_eq!(err.code().to_string(), "EdiscoveryClients/102");
    assert_eq!(err.to_string(), "Collection job Timeout");
    assert!(calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_wait_without_limit() {
    let server = MockServer::start().await;
    let calls = mount_states(&server, &[0, 1]);
    let commcell = logged_in(&server).await;

    let job = commcell
        .ediscovery_job(42, 7, CrawlTarget::Client)
        .expect("job")
        .with_poll_interval(Duration::from_millis(10));
    job.wait_for_collection_job(Duration::MAX)
        .await
        .expect("crawl job");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_status_error_message() {
    let server = MockServer::start().await;
    server.on_json(
        Method::GET,
        STATUS_ROUTE,
        json!({"error": {"errorCode": 4, "errLogMessage": "Datasource is not crawled yet"}}),
    );
    let commcell = logged_in(&server).await;

    let job = commcell
        .ediscovery_job(42, 7, CrawlTarget::Client)
        .expect("job");
    let err = job.get_job_status().await.unwrap_err();
    assert_eq!(err.to_string(), "Datasource is not crawled yet");
}

#[tokio::test]
async fn test_job_history() {
    let server = MockServer::start().await;
    server.on_json(
        Method::GET,
        HISTORY_ROUTE,
        json!({"status": {"jobs": [{"jobId": 901, "state": 1}, {"jobId": 877, "state": 3}]}}),
    );
    let commcell = logged_in(&server).await;

    let job = commcell
        .ediscovery_job(42, 7, CrawlTarget::Client)
        .expect("job");
    let history = job.get_job_history().await.expect("history");
    assert_eq!(history["jobs"][0]["jobId"], 901);
    assert_eq!(history["jobs"].as_array().map(Vec::len), Some(2));

    server.on_json(Method::GET, HISTORY_ROUTE, json!({"error": {"errorCode": 0}}));
    let err = job.get_job_history().await.unwrap_err();
    assert_eq!(err.code().to_string(), "EdiscoveryClients/102");
    assert_eq!(err.to_string(), "Something went wrong while fetching job history");

    server.on_json(Method::GET, HISTORY_ROUTE, json!({"jobs": []}));
    let err = job.get_job_history().await.unwrap_err();
    assert_eq!(err.code().to_string(), "EdiscoveryClients/104");
}
