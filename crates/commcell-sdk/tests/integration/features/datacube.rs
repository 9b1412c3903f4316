//! Datacube and datasource tests.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use commcell_sdk::models::DatasourceCreate;
use commcell_sdk::{Fetcher, Lister, Mutator};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::common::{logged_in, MockResponse, MockServer};

fn engines_json() -> Value {
    json!({"listOfCIServer": [
        {"clientName": "ae01", "engineName": "ae01_engine", "cloudID": 12}
    ]})
}

fn collection(name: &str, id: u64) -> Value {
    json!({
        "computedCoreName": format!("{name}_1"),
        "datasources": [{
            "datasourceId": id,
            "datasourceName": name,
            "datasourceType": 5,
            "coreId": 30,
            "status": {"totalcount": 120, "state": 1}
        }]
    })
}

fn mount_datacube(server: &MockServer) -> Arc<Mutex<Vec<Value>>> {
    let collections = Arc::new(Mutex::new(vec![collection("SalesDocs", 7)]));
    server.on_json(Method::GET, "dcube/getAnalyticsEngine", engines_json());

    let list = Arc::clone(&collections);
    server.on(Method::GET, "dcube/GetDataSources?summary=1", move |_| {
        MockResponse::json(json!({"collections": list.lock().clone()}))
    });

    collections
}

#[tokio::test]
async fn test_datacube_loads_engines_and_datasources() {
    let server = MockServer::start().await;
    mount_datacube(&server);
    let commcell = logged_in(&server).await;

    let datacube = commcell.datacube().await.expect("datacube");
    assert_eq!(datacube.analytics_engines().len(), 1);
    assert_eq!(datacube.analytics_engines()[0]["cloudID"], 12);

    let datasources = datacube.datasources().expect("datasources");
    assert!(datasources.has("SalesDocs"));
    assert!(!datasources.has("salesdocs"));

    let sales = datasources.get("SalesDocs").await.expect("datasource");
    assert_eq!(sales.id(), 7);
    assert_eq!(sales.datasource_type(), Some("file"));
    assert_eq!(sales.computed_core_name(), Some("SalesDocs_1"));

    let err = datasources.get("salesdocs").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code().to_string(), "Datacube/102");
}

#[tokio::test]
async fn test_datasource_jobs_and_status() {
    let server = MockServer::start().await;
    mount_datacube(&server);
    server.on_json(Method::POST, "dcube/startjob/7", json!({"status": {"jobId": 5521}}));
    server.on_json(
        Method::GET,
        "dcube/GetStatus/7",
        json!({"status": {"state": 1, "totalcount": 120}}),
    );
    let commcell = logged_in(&server).await;

    let datacube = commcell.datacube().await.expect("datacube");
    let sales = datacube
        .datasources()
        .expect("datasources")
        .get("SalesDocs")
        .await
        .expect("datasource");

    assert_eq!(sales.start_job().await.expect("start job"), "5521");
    let status = sales.get_status().await.expect("status");
    assert_eq!(status["status"]["totalcount"], 120);

    server.on_json(
        Method::POST,
        "dcube/startjob/7",
        json!({"error": {"errorCode": 3, "errLogMessage": "Core is offline"}}),
    );
    let err = sales.start_job().await.unwrap_err();
    assert_eq!(err.code().to_string(), "Datacube/102");
    assert_eq!(
        err.to_string(),
        "Failed to start job on datasource\nError: \"Core is offline\""
    );
}

#[tokio::test]
async fn test_datasource_failure_leaves_engines() {
    let server = MockServer::start().await;
    server.on_json(Method::GET, "dcube/getAnalyticsEngine", engines_json());
    server.on(Method::GET, "dcube/GetDataSources", |_| {
        MockResponse::error_page(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    });
    let commcell = logged_in(&server).await;

    let datacube = commcell.datacube().await.expect("datacube");
    assert!(datacube.datasources().is_none());
    assert_eq!(datacube.analytics_engines().len(), 1);
}

#[tokio::test]
async fn test_missing_engines_fail_datacube() {
    let server = MockServer::start().await;
    mount_datacube(&server);
    server.on_json(Method::GET, "dcube/getAnalyticsEngine", json!({}));
    let commcell = logged_in(&server).await;

    let err = commcell.datacube().await.unwrap_err();
    assert_eq!(err.code().to_string(), "Datacube/103");
}

#[tokio::test]
async fn test_create_and_delete_datasource() {
    let server = MockServer::start().await;
    let collections = mount_datacube(&server);

    let create = Arc::clone(&collections);
    server.on(Method::POST, "dcube/createDataSource", move |req| {
        let name = req.json()["dataSource"]["datasourceName"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        create.lock().push(collection(&name, 9));
        MockResponse::json(json!({"error": {"errorCode": 0}}))
    });
    let remove = Arc::clone(&collections);
    server.on(Method::POST, "dcube/deleteDataSource/9", move |_| {
        remove.lock().truncate(1);
        MockResponse::json(json!({"errorCode": 0}))
    });
    let commcell = logged_in(&server).await;

    let datacube = commcell.datacube().await.expect("datacube");
    let datasources = datacube.datasources().expect("datasources");

    let request = DatasourceCreate::new("Contracts", "ae01_engine", "5")
        .with_property("includedirectoriespath", "/srv/contracts");
    let contracts = datasources.add(request).await.expect("add");
    assert_eq!(contracts.id(), 9);
    assert!(datasources.has("Contracts"));

    let body = server.requests_to(&Method::POST, "dcube/createDataSource")[0].json();
    assert_eq!(body["collectionReq"]["ciserver"]["cloudID"], 12);
    assert_eq!(body["dataSource"]["datasourceType"], "5");
    assert_eq!(
        body["dataSource"]["properties"][0]["propertyValue"],
        "/srv/contracts"
    );

    datasources.delete("Contracts").await.expect("delete");
    assert!(!datasources.has("Contracts"));
    assert!(datasources.has("SalesDocs"));
}

#[tokio::test]
async fn test_create_failure_and_unknown_engine() {
    let server = MockServer::start().await;
    mount_datacube(&server);
    server.on_json(
        Method::POST,
        "dcube/createDataSource",
        json!({"error": {"errorCode": 9, "errLogMessage": "Datasource name is reserved"}}),
    );
    let commcell = logged_in(&server).await;

    let datacube = commcell.datacube().await.expect("datacube");
    let datasources = datacube.datasources().expect("datasources");

    let err = datasources
        .add(DatasourceCreate::new("System", "ae01", "5"))
        .await
        .unwrap_err();
    assert_eq!(err.code().to_string(), "Datacube/102");
    assert_eq!(
        err.to_string(),
        "Failed to create datasource\nError: \"Datasource name is reserved\""
    );

    let err = datasources
        .add(DatasourceCreate::new("Other", "ae99", "5"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        server.requests_to(&Method::POST, "dcube/createDataSource").len(),
        1
    );
}
