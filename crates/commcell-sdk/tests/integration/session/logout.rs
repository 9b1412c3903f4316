//! Logout and post-logout behaviour.

use axum::http::{Method, StatusCode};
use commcell_sdk::models::CrawlTarget;
use commcell_sdk::{Error, Payload};
use serde_json::json;

use crate::common::{clients_json, logged_in, MockResponse, MockServer};

fn assert_logged_out<T: std::fmt::Debug>(result: Result<T, Error>) {
    match result {
        Err(e @ Error::LoggedOut) => assert_eq!(e.code().to_string(), "Session/104"),
        other => panic!("expected LoggedOut, got {other:?}"),
    }
}

#[tokio::test]
async fn test_feature_accessors_fail_after_logout() {
    let server = MockServer::start().await;
    server.on_json(Method::GET, "Client", clients_json());
    let commcell = logged_in(&server).await;

    commcell.clients().await.expect("clients before logout");
    let message = commcell.logout().await.expect("logout");
    assert_eq!(message, "User logged out");
    assert!(!commcell.is_logged_in());

    assert_logged_out(commcell.clients().await.map(|_| ()));
    assert_logged_out(commcell.client_groups().await.map(|_| ()));
    assert_logged_out(commcell.storage_policies().await.map(|_| ()));
    assert_logged_out(commcell.tags().await.map(|_| ()));
    assert_logged_out(commcell.schedules().await.map(|_| ()));
    assert_logged_out(commcell.client_schedules(11).await.map(|_| ()));
    assert_logged_out(commcell.blr_pairs().await.map(|_| ()));
    assert_logged_out(commcell.datacube().await.map(|_| ()));
    assert_logged_out(commcell.ediscovery_job(1, 2, CrawlTarget::Client).map(|_| ()));
    assert_logged_out(commcell.who_am_i().await);

    // Details read at login stay available.
    assert_eq!(commcell.commserv_name(), "CS1");
    assert_eq!(server.requests_to(&Method::GET, "Client").len(), 1);
}

#[tokio::test]
async fn test_second_logout_makes_no_request() {
    let server = MockServer::start().await;
    let commcell = logged_in(&server).await;

    commcell.logout().await.expect("logout");
    let message = commcell.logout().await.expect("second logout");

    assert_eq!(message, "User already logged out.");
    assert_eq!(server.requests_to(&Method::POST, "Logout").len(), 1);
}

#[tokio::test]
async fn test_rejected_logout_drops_cached_features() {
    let server = MockServer::start().await;
    server.on_json(Method::GET, "Client", clients_json());
    let commcell = logged_in(&server).await;

    let before = commcell.clients().await.expect("clients");
    server.on(Method::POST, "Logout", |_| {
        MockResponse::error_page(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    });

    let err = commcell.logout().await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert!(commcell.is_logged_in());

    let after = commcell.clients().await.expect("clients after failed logout");
    assert!(!std::sync::Arc::ptr_eq(&before, &after));
    assert_eq!(server.requests_to(&Method::GET, "Client").len(), 2);
}

#[tokio::test]
async fn test_refresh_drops_cached_features() {
    let server = MockServer::start().await;
    server.on_json(Method::GET, "Client", clients_json());
    let commcell = logged_in(&server).await;

    let first = commcell.clients().await.expect("clients");
    let cached = commcell.clients().await.expect("cached clients");
    assert!(std::sync::Arc::ptr_eq(&first, &cached));
    assert_eq!(server.requests_to(&Method::GET, "Client").len(), 1);

    commcell.refresh().await.expect("refresh");
    let reloaded = commcell.clients().await.expect("reloaded clients");
    assert!(!std::sync::Arc::ptr_eq(&first, &reloaded));
    assert_eq!(server.requests_to(&Method::GET, "Client").len(), 2);
    assert_eq!(server.requests_to(&Method::GET, "CommServ").len(), 2);
}

#[tokio::test]
async fn test_raw_request_and_qcommand() {
    let server = MockServer::start().await;
    server.on_json(Method::GET, "Job/42", json!({"jobs": [{"jobId": 42}]}));
    server.on_json(Method::POST, "ExecuteQCommand", json!({"output": "no jobs"}));
    server.on_json(Method::POST, "Qcommand/qoperation execute", json!({"errorCode": 0}));
    let commcell = logged_in(&server).await;

    let (ok, raw) = commcell
        .request(reqwest::Method::GET, "Job/42", None)
        .await
        .expect("raw request");
    assert!(ok);
    assert_eq!(raw.json().expect("json").expect("body")["jobs"][0]["jobId"], 42);

    let output = commcell
        .execute_qcommand("qlist job", None)
        .await
        .expect("qcommand");
    assert_eq!(output["output"], "no jobs");

    let xml = Payload::Text("<App_GetJobListRequest/>".to_string());
    let reply = commcell.qoperation_execute(&xml).await.expect("qoperation");
    assert_eq!(reply["errorCode"], 0);

    let qcommand = server.requests_to(&Method::POST, "ExecuteQCommand");
    assert_eq!(qcommand[0].body, "command=qlist+job");
    let qoperation = server.requests_to(&Method::POST, "Qcommand/qoperation execute");
    assert_eq!(qoperation[0].header("content-type"), Some("application/xml"));
    assert_eq!(qoperation[0].body, "<App_GetJobListRequest/>");
}
