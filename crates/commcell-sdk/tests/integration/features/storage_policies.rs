//! Storage policy tests.

use std::sync::Arc;

use axum::http::Method;
use commcell_sdk::models::StoragePolicyCreate;
use commcell_sdk::{Error, Lister, Mutator};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::common::{logged_in, MockResponse, MockServer};

fn mount_policies(server: &MockServer) -> Arc<Mutex<Vec<(String, u64)>>> {
    let policies = Arc::new(Mutex::new(vec![("Bronze".to_string(), 4)]));

    let list = Arc::clone(&policies);
    server.on(Method::GET, "StoragePolicy?getAll=TRUE", move |_| {
        let policies: Vec<Value> = list
            .lock()
            .iter()
            .map(|(name, id)| json!({"storagePolicyName": name, "storagePolicyId": id}))
            .collect();
        MockResponse::json(json!({"policies": policies}))
    });

    let create = Arc::clone(&policies);
    server.on(Method::POST, "StoragePolicy", move |req| {
        let name = req.json()["storagePolicyName"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        create.lock().push((name, 8));
        MockResponse::json(json!({"error": {"errorCode": 0}}))
    });

    server.on_json(
        Method::GET,
        "StoragePolicy/8",
        json!({"copy": [{"StoragePolicyCopy": {"copyName": "Primary", "copyId": 21}}]}),
    );

    policies
}

#[tokio::test]
async fn test_add_policy_and_fetch_copies() {
    let server = MockServer::start().await;
    mount_policies(&server);
    let commcell = logged_in(&server).await;

    let policies = commcell.storage_policies().await.expect("storage policies");
    assert!(policies.has("bronze"));

    let request = StoragePolicyCreate::new("Gold-30d", "DiskLib01", "ma01", 30)
        .with_dedup_path("/ddb/gold")
        .with_streams(4);
    let policy = policies.add(request).await.expect("add");

    assert_eq!(policy.name(), "gold-30d");
    assert_eq!(policy.id(), 8);
    assert!(policy.has_copy("primary"));

    let create = server.requests_to(&Method::POST, "StoragePolicy");
    let body = create[0].json();
    assert_eq!(body["storagePolicyCopyInfo"]["library"]["libraryName"], "DiskLib01");
    assert_eq!(body["storagePolicyCopyInfo"]["mediaAgent"]["mediaAgentName"], "ma01");
    assert_eq!(body["numberOfStreams"], 4);
}

#[tokio::test]
async fn test_duplicate_policy_rejected() {
    let server = MockServer::start().await;
    mount_policies(&server);
    let commcell = logged_in(&server).await;

    let policies = commcell.storage_policies().await.expect("storage policies");
    let err = policies
        .add(StoragePolicyCreate::new("BRONZE", "DiskLib01", "ma01", 7))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AlreadyExists { .. }));
    assert_eq!(err.code().to_string(), "Storage/102");
    assert!(server.requests_to(&Method::POST, "StoragePolicy").is_empty());
}

#[tokio::test]
async fn test_add_error_carries_server_message() {
    let server = MockServer::start().await;
    mount_policies(&server);
    server.on_json(
        Method::POST,
        "StoragePolicy",
        json!({"error": {"errorCode": 7, "errorMessage": "Library [DiskLib09] not found"}}),
    );
    let commcell = logged_in(&server).await;

    let policies = commcell.storage_policies().await.expect("storage policies");
    let err = policies
        .add(StoragePolicyCreate::new("Silver", "DiskLib09", "ma01", 14))
        .await
        .unwrap_err();

    assert_eq!(err.code().to_string(), "Storage/102");
    assert_eq!(err.server_message(), Some("Library [DiskLib09] not found"));
    assert!(!policies.has("silver"));
}

#[tokio::test]
async fn test_delete_policy() {
    let server = MockServer::start().await;
    let store = mount_policies(&server);
    let remove = Arc::clone(&store);
    server.on(Method::DELETE, "StoragePolicy/Bronze", move |_| {
        remove.lock().clear();
        MockResponse::text("Storage policy deleted successfully")
    });
    let commcell = logged_in(&server).await;

    let policies = commcell.storage_policies().await.expect("storage policies");
    policies.delete("Bronze").await.expect("delete");
    assert!(!policies.has("bronze"));
    assert!(policies.all().is_empty());
}

#[tokio::test]
async fn test_delete_failure_in_json_body() {
    let server = MockServer::start().await;
    mount_policies(&server);
    server.on_json(
        Method::DELETE,
        "StoragePolicy/Bronze",
        json!({"errorCode": 3, "errorMessage": "Policy has associated subclients"}),
    );
    let commcell = logged_in(&server).await;

    let policies = commcell.storage_policies().await.expect("storage policies");
    let err = policies.delete("Bronze").await.unwrap_err();

    assert_eq!(err.code().to_string(), "Storage/102");
    assert_eq!(
        err.to_string(),
        "Failed to delete storage policy\nError: \"Policy has associated subclients\""
    );
    assert!(policies.has("bronze"));

    let err = policies.delete("Platinum").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_missing_policies_key_is_empty() {
    let server = MockServer::start().await;
    server.on_json(Method::GET, "StoragePolicy", json!({}));
    let commcell = logged_in(&server).await;

    let policies = commcell.storage_policies().await.expect("storage policies");
    assert!(policies.all().is_empty());
    assert!(!policies.has("bronze"));
}
