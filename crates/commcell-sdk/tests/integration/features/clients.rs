//! Client wrapper tests.

use std::sync::Arc;

use axum::http::Method;
use commcell_sdk::{Fetcher, Lister};
use parking_lot::Mutex;
use serde_json::json;

use crate::common::{clients_json, logged_in, MockResponse, MockServer};

fn client_detail() -> serde_json::Value {
    json!({"clientProperties": [{
        "client": {
            "clientEntity": {"clientName": "FileServer01", "clientId": 11, "hostName": "fs01.example.com"},
            "displayName": "File Server 01",
            "osInfo": {
                "Type": "Windows",
                "SubType": "Server",
                "OsDisplayInfo": {"ProcessorType": "x64", "OSName": "Windows Server 2019"}
            }
        },
        "clientProps": {"clientActivityControl": {"activityControlOptions": [
            {"activityType": 1, "enableActivityType": true},
            {"activityType": 2, "enableActivityType": false}
        ]}}
    }]})
}

#[tokio::test]
async fn test_lookup_by_name_and_hostname() {
    let server = MockServer::start().await;
    server.on_json(Method::GET, "Client", clients_json());
    server.on_json(Method::GET, "Client/11", client_detail());
    let commcell = logged_in(&server).await;

    let clients = commcell.clients().await.expect("clients");
    assert!(clients.has("FileServer01"));
    assert!(clients.has("fileserver01"));
    assert!(clients.has("FS01.example.com"));
    assert_eq!(clients.id_of("sql01"), Some(12));
    assert_eq!(clients.name_of(11).as_deref(), Some("fileserver01"));

    let client = clients.get("fs01.example.com").await.expect("client");
    assert_eq!(client.name(), "fileserver01");
    assert_eq!(client.id(), 11);
    assert_eq!(client.display_name(), Some("File Server 01"));
    assert_eq!(
        client.os_info().as_deref(),
        Some("x64 Windows Server  --  Windows Server 2019")
    );
    assert!(client.is_backup_enabled());
    assert!(!client.is_restore_enabled());

    let by_id = clients.get_by_id(11).await.expect("client by id");
    assert_eq!(by_id.name(), "fileserver01");
}

#[tokio::test]
async fn test_unknown_client_not_found() {
    let server = MockServer::start().await;
    server.on_json(Method::GET, "Client", clients_json());
    let commcell = logged_in(&server).await;

    let clients = commcell.clients().await.expect("clients");
    let err = clients.get("Exchange01").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.code().to_string(), "Client/102");
    assert_eq!(err.to_string(), "No client exists with name: exchange01");
    assert!(clients.get_by_id(99).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_client_without_hostname_not_matched_by_blank_name() {
    let server = MockServer::start().await;
    server.on_json(
        Method::GET,
        "Client",
        json!({"clientProperties": [
            {"client": {"clientEntity": {"clientName": "NoHost", "clientId": 5}}},
            {"client": {"clientEntity": {"clientName": "Blank", "clientId": 6, "hostName": ""}}}
        ]}),
    );
    let commcell = logged_in(&server).await;

    let clients = commcell.clients().await.expect("clients");
    assert!(clients.has("nohost"));
    assert!(!clients.has(""));
    assert!(!clients.has("   "));
    assert_eq!(clients.id_of(""), None);

    let err = clients.get("").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code().to_string(), "Client/102");
}

#[tokio::test]
async fn test_delete_accepts_nested_error_code() {
    let server = MockServer::start().await;
    let deleted = Arc::new(Mutex::new(false));

    let list_state = Arc::clone(&deleted);
    server.on(Method::GET, "Client", move |_| {
        if *list_state.lock() {
            MockResponse::json(json!({"clientProperties": [
                {"client": {"clientEntity": {"clientName": "FileServer01", "clientId": 11}}}
            ]}))
        } else {
            MockResponse::json(clients_json())
        }
    });
    let delete_state = Arc::clone(&deleted);
    server.on(Method::DELETE, "Client/12?forceDelete=1", move |_| {
        *delete_state.lock() = true;
        MockResponse::json(json!({"response": [{"errorCode": 0, "entity": {"clientId": 12}}]}))
    });
    let commcell = logged_in(&server).await;

    let clients = commcell.clients().await.expect("clients");
    clients.delete("SQL01").await.expect("delete");
    assert!(!clients.has("sql01"));
    assert!(clients.has("fileserver01"));
}

#[tokio::test]
async fn test_delete_error_carries_server_message() {
    let server = MockServer::start().await;
    server.on_json(Method::GET, "Client", clients_json());
    server.on_json(
        Method::DELETE,
        "Client/12?forceDelete=1",
        json!({"response": [{"errorCode": 2, "errorString": "Client has active jobs"}]}),
    );
    let commcell = logged_in(&server).await;

    let clients = commcell.clients().await.expect("clients");
    let err = clients.delete("sql01").await.unwrap_err();

    assert_eq!(err.code().to_string(), "Client/102");
    assert_eq!(err.server_message(), Some("Client has active jobs"));
    assert!(clients.has("sql01"));
}
