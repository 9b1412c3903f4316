//! Client group tests against a stateful mock.

use std::sync::Arc;

use axum::http::Method;
use commcell_sdk::models::ClientGroupCreate;
use commcell_sdk::{Fetcher, Lister, Mutator};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::common::{clients_json, logged_in, MockResponse, MockServer};

const NEW_GROUP_ID: u64 = 50;

#[derive(Default)]
struct GroupStore {
    groups: Vec<(String, u64)>,
    created: Option<Value>,
}

fn mount_groups(server: &MockServer) -> Arc<Mutex<GroupStore>> {
    let store = Arc::new(Mutex::new(GroupStore {
        groups: vec![("Windows Servers".to_string(), 3)],
        created: None,
    }));
    server.on_json(Method::GET, "Client", clients_json());

    let list = Arc::clone(&store);
    server.on(Method::GET, "ClientGroup", move |_| {
        let groups: Vec<Value> = list
            .lock()
            .groups
            .iter()
            .map(|(name, id)| json!({"name": name, "Id": id}))
            .collect();
        MockResponse::json(json!({"groups": groups}))
    });

    let create = Arc::clone(&store);
    server.on(Method::POST, "ClientGroup", move |req| {
        let detail = req.json()["clientGroupDetail"].clone();
        let name = detail["clientGroup"]["clientGroupName"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let mut store = create.lock();
        store.groups.push((name, NEW_GROUP_ID));
        store.created = Some(detail);
        MockResponse::json(json!({
            "clientGroupDetail": {"clientGroup": {"clientGroupId": NEW_GROUP_ID}}
        }))
    });

    let detail = Arc::clone(&store);
    server.on(Method::GET, "ClientGroup/50", move |_| {
        let created = detail.lock().created.clone().unwrap_or(Value::Null);
        MockResponse::json(json!({"clientGroupDetail": created}))
    });

    let remove = Arc::clone(&store);
    server.on(Method::DELETE, "ClientGroup/50", move |_| {
        remove.lock().groups.retain(|(_, id)| *id != NEW_GROUP_ID);
        MockResponse::json(json!({"errorCode": 0}))
    });

    store
}

#[tokio::test]
async fn test_create_filters_unknown_clients() {
    let server = MockServer::start().await;
    mount_groups(&server);
    let commcell = logged_in(&server).await;

    let groups = commcell.client_groups().await.expect("client groups");
    assert!(groups.has("windows servers"));

    let request = ClientGroupCreate::new("Linux Servers")
        .with_clients(["FileServer01", "ghost01", " SQL01 "])
        .with_description("Front end hosts");
    let group = groups.add(request).await.expect("add");

    assert_eq!(group.id(), NEW_GROUP_ID);
    assert_eq!(group.name(), "Linux Servers");
    assert_eq!(group.description(), Some("Front end hosts"));
    assert_eq!(group.associated_clients(), vec!["fileserver01", "sql01"]);
    assert!(groups.has("LINUX SERVERS"));

    let create = server.requests_to(&Method::POST, "ClientGroup");
    let body = create[0].json();
    assert_eq!(body["clientGroupOperationType"], 1);
    assert_eq!(body["clientGroupDetail"]["isSmartClientGroup"], false);
}

#[tokio::test]
async fn test_duplicate_group_rejected_before_request() {
    let server = MockServer::start().await;
    mount_groups(&server);
    let commcell = logged_in(&server).await;

    let groups = commcell.client_groups().await.expect("client groups");
    let err = groups
        .add(ClientGroupCreate::new("WINDOWS SERVERS"))
        .await
        .unwrap_err();

    assert_eq!(err.code().to_string(), "ClientGroup/102");
    assert!(err.to_string().contains("already exists"));
    assert!(server.requests_to(&Method::POST, "ClientGroup").is_empty());
}

#[tokio::test]
async fn test_create_error_message_surfaces() {
    let server = MockServer::start().await;
    mount_groups(&server);
    server.on_json(
        Method::POST,
        "ClientGroup",
        json!({"errorMessage": "Insufficient privileges"}),
    );
    let commcell = logged_in(&server).await;

    let groups = commcell.client_groups().await.expect("client groups");
    let err = groups.add(ClientGroupCreate::new("Audit")).await.unwrap_err();

    assert_eq!(err.code().to_string(), "ClientGroup/102");
    assert_eq!(
        err.to_string(),
        "Failed to create new ClientGroup\nError:\"Insufficient privileges\""
    );
    assert!(!groups.has("audit"));
}

#[tokio::test]
async fn test_delete_group() {
    let server = MockServer::start().await;
    let store = mount_groups(&server);
    let commcell = logged_in(&server).await;

    let groups = commcell.client_groups().await.expect("client groups");
    groups
        .add(ClientGroupCreate::new("Temp"))
        .await
        .expect("add");
    groups.delete("temp").await.expect("delete");

    assert!(!groups.has("temp"));
    assert_eq!(store.lock().groups.len(), 1);

    let err = groups.get("temp").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code().to_string(), "ClientGroup/102");
}
