//! Login, token validation and token renewal tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use commcell_sdk::{Commcell, Error, Lister};
use serde_json::json;

use crate::common::{
    clients_json, logged_in, mount_session, MockResponse, MockServer, TEST_TOKEN, TEST_USER,
};

#[tokio::test]
async fn test_password_login_sends_encoded_password() {
    let server = MockServer::start().await;
    let commcell = logged_in(&server).await;

    let login = server.requests_to(&Method::POST, "Login");
    assert_eq!(login.len(), 1);
    let body = login[0].json();
    assert_eq!(body["mode"], 4);
    assert_eq!(body["username"], TEST_USER);
    assert_eq!(body["password"], "c2VjcmV0");
    assert_eq!(body["clientType"], 30);
    assert!(body["deviceId"].is_string());

    let commserv = server.requests_to(&Method::GET, "CommServ");
    assert_eq!(commserv[0].header("Authtoken"), Some(TEST_TOKEN));
    assert_eq!(commcell.user().as_deref(), Some(TEST_USER));
}

#[tokio::test]
async fn test_commserv_details_loaded() {
    let server = MockServer::start().await;
    let commcell = logged_in(&server).await;

    assert_eq!(commcell.commserv_name(), "CS1");
    assert_eq!(commcell.commserv_guid(), "6F1B-22A0");
    assert_eq!(commcell.commserv_hostname(), "cs1.example.com");
    assert_eq!(commcell.commcell_id(), 2);
    assert_eq!(commcell.version(), "11.32.0");
    assert_eq!(commcell.commserv_timezone(), "(UTC) Coordinated Universal Time");
}

#[tokio::test]
async fn test_minimal_commserv_answer() {
    let server = MockServer::start().await;
    mount_session(&server);
    server.on_json(Method::GET, "CommServ", json!({"commcell": {"commCellName": "CS1"}}));

    let commcell = Commcell::builder()
        .host(server.host())
        .web_service_url(server.web_service_url())
        .token("abc")
        .build()
        .await
        .expect("session");

    assert_eq!(commcell.commserv_name(), "CS1");
    assert_eq!(commcell.version(), "");
}

#[tokio::test]
async fn test_token_is_prefixed_and_validated() {
    let server = MockServer::start().await;
    mount_session(&server);

    let commcell = Commcell::builder()
        .host(server.host())
        .web_service_url(server.web_service_url())
        .token("tok-existing")
        .build()
        .await
        .expect("session");

    let who = server.requests_to(&Method::POST, "WhoAmI");
    assert_eq!(who.len(), 1);
    assert_eq!(who[0].header("Authtoken"), Some("QSDK tok-existing"));
    assert!(server.requests_to(&Method::POST, "Login").is_empty());
    assert_eq!(commcell.who_am_i().await.expect("who am i"), TEST_USER);
}

#[tokio::test]
async fn test_token_validated_from_xml_reply() {
    let server = MockServer::start().await;
    mount_session(&server);
    server.on(Method::POST, "WhoAmI", |_| {
        MockResponse::text(
            r#"<CvEntities_ProcessingInstructionInfo><user userName="xmluser" userId="5"/></CvEntities_ProcessingInstructionInfo>"#,
        )
    });

    let commcell = Commcell::builder()
        .host(server.host())
        .web_service_url(server.web_service_url())
        .token("SAML saml-token")
        .build()
        .await
        .expect("session");

    assert_eq!(commcell.user().as_deref(), Some("xmluser"));
}

#[tokio::test]
async fn test_rejected_token_without_password_fails() {
    let server = MockServer::start().await;
    mount_session(&server);
    server.on_json(Method::POST, "WhoAmI", json!({"errorCode": 5}));

    let err = Commcell::builder()
        .host(server.host())
        .web_service_url(server.web_service_url())
        .token("stale")
        .build()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownToken));
    assert!(server.requests_to(&Method::GET, "CommServ").is_empty());
}

#[tokio::test]
async fn test_rejected_token_falls_back_to_password() {
    let server = MockServer::start().await;
    mount_session(&server);
    server.on_json(Method::POST, "WhoAmI", json!({"errorCode": 5}));

    let commcell = Commcell::builder()
        .host(server.host())
        .web_service_url(server.web_service_url())
        .token("stale")
        .username(TEST_USER)
        .password("secret")
        .build()
        .await
        .expect("session");

    assert_eq!(server.requests_to(&Method::POST, "Login").len(), 1);
    let commserv = server.requests_to(&Method::GET, "CommServ");
    assert_eq!(commserv[0].header("Authtoken"), Some(TEST_TOKEN));
    assert!(commcell.is_logged_in());
}

#[tokio::test]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    mount_session(&server);
    server.on_json(
        Method::POST,
        "Login",
        json!({"errList": [{"errorCode": 1116, "errLogMessage": "Invalid Username or Password"}]}),
    );

    let err = Commcell::builder()
        .host(server.host())
        .web_service_url(server.web_service_url())
        .username(TEST_USER)
        .password("wrong")
        .build()
        .await
        .unwrap_err();

    assert_eq!(err.code().to_string(), "Session/101");
    assert!(err.to_string().contains("Invalid Username or Password"));
}

#[tokio::test]
async fn test_unauthorized_request_renews_token() {
    let server = MockServer::start().await;
    let commcell = logged_in(&server).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    server.on(Method::GET, "Client", move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            MockResponse::error_page(StatusCode::UNAUTHORIZED, "Unauthorized")
        } else {
            MockResponse::json(clients_json())
        }
    });
    server.on_json(Method::POST, "RenewLoginToken", json!({"token": "QSDK renewed"}));

    let clients = commcell.clients().await.expect("clients");
    assert!(clients.has("fileserver01"));

    let renew = server.requests_to(&Method::POST, "RenewLoginToken");
    assert_eq!(renew.len(), 1);
    assert_eq!(renew[0].json()["sessionId"], TEST_TOKEN);

    let list = server.requests_to(&Method::GET, "Client");
    assert_eq!(list.len(), 2);
    assert_eq!(list[1].header("Authtoken"), Some("QSDK renewed"));
}

#[tokio::test]
async fn test_renewal_is_bounded() {
    let server = MockServer::start().await;
    let commcell = logged_in(&server).await;

    server.on(Method::GET, "Client", |_| {
        MockResponse::error_page(StatusCode::UNAUTHORIZED, "Unauthorized")
    });
    server.on_json(Method::POST, "RenewLoginToken", json!({"token": "QSDK renewed"}));

    let err = commcell.clients().await.unwrap_err();
    assert_eq!(err.code().to_string(), "Session/103");
    assert_eq!(server.requests_to(&Method::POST, "RenewLoginToken").len(), 3);
    assert_eq!(server.requests_to(&Method::GET, "Client").len(), 4);
}
