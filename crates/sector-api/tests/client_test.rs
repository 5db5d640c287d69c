#![allow(clippy::unwrap_used)]
// Integration tests for `AuthSession` and `SectorClient` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sector_api::{
    ArmAction, AuthError, AuthPolicy, AuthSession, Credentials, Error, HousecheckCategory,
    LockAction, RetryPolicy, SectorClient, Transport, TransportConfig, TransportError,
};

// ── Helpers ─────────────────────────────────────────────────────────

const PANEL: &str = "01234567";

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
        factor: 2,
    }
}

fn credentials(password: &str) -> Credentials {
    Credentials::new("owner@example.com", SecretString::from(password.to_owned()))
}

async fn setup() -> (MockServer, SectorClient) {
    let server = MockServer::start().await;
    let transport = Transport::new(&TransportConfig {
        base_url: format!("{}/api", server.uri()),
        timeout: Duration::from_secs(5),
        retry: fast_retry(),
        ..TransportConfig::default()
    })
    .unwrap();
    let transport = Arc::new(transport);
    let auth = Arc::new(AuthSession::new(
        Arc::clone(&transport),
        credentials("correct"),
        AuthPolicy::default(),
    ));
    (server, SectorClient::new(transport, auth))
}

async fn mount_login(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "AuthorizationToken": token })),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_sends_credentials_and_vendor_headers() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .and(header("API-Version", "6"))
        .and(body_json(json!({ "userId": "owner@example.com", "password": "correct" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "AuthorizationToken": "tok-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let info = client.auth().login(credentials("correct")).await.unwrap();
    assert!(info.expires_at > info.issued_at);
    assert!(client.auth().has_valid_session());
}

#[tokio::test]
async fn test_login_then_ensure_valid_does_not_log_in_again() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    client.auth().login(credentials("correct")).await.unwrap();
    client.auth().ensure_valid().await.unwrap();
    client.auth().ensure_valid().await.unwrap();

    assert_eq!(client.auth().login_attempts(), 1);
}

#[tokio::test]
async fn test_concurrent_ensure_valid_shares_one_login() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "AuthorizationToken": "tok-1" }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let auth = Arc::clone(client.auth());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.ensure_valid().await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(auth.login_attempts(), 1);
}

#[tokio::test]
async fn test_rejected_login_is_invalid_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.auth().login(credentials("wrong")).await;
    assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    assert!(!client.auth().is_locked());
}

#[tokio::test]
async fn test_missing_token_is_invalid_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let result = client.auth().ensure_valid().await;
    assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
}

#[tokio::test]
async fn test_repeated_rejections_lock_the_session() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let auth = client.auth();
    assert_eq!(auth.ensure_valid().await.unwrap_err(), AuthError::InvalidCredentials);
    assert_eq!(auth.ensure_valid().await.unwrap_err(), AuthError::InvalidCredentials);
    assert!(auth.is_locked());

    // No further network I/O while locked
    assert_eq!(auth.ensure_valid().await.unwrap_err(), AuthError::Locked);
    assert_eq!(auth.ensure_valid().await.unwrap_err(), AuthError::Locked);
    assert_eq!(auth.login_attempts(), 2);
}

#[tokio::test]
async fn test_throttled_login_never_locks_the_session() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
        .expect(3)
        .mount(&server)
        .await;

    let auth = client.auth();
    for _ in 0..3 {
        let result = auth.ensure_valid().await;
        assert!(
            matches!(result, Err(AuthError::ServiceUnavailable(TransportError::HttpStatus { status: 429, .. }))),
            "expected ServiceUnavailable, got: {result:?}"
        );
    }
    assert!(!auth.is_locked());
    assert_eq!(auth.login_attempts(), 3);
}

#[tokio::test]
async fn test_bad_request_on_login_is_not_a_credential_rejection() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .respond_with(ResponseTemplate::new(400))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_login(&server, "tok-1", 1).await;

    let auth = client.auth();
    let _ = auth.ensure_valid().await;
    let _ = auth.ensure_valid().await;
    assert!(!auth.is_locked());
    auth.ensure_valid().await.unwrap();
    assert!(auth.has_valid_session());
}

#[tokio::test]
async fn test_new_credentials_clear_the_lock() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .and(body_json(json!({ "userId": "owner@example.com", "password": "correct" })))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    let auth = client.auth();
    let _ = auth.ensure_valid().await;
    let _ = auth.ensure_valid().await;
    assert!(auth.is_locked());

    server.reset().await;
    mount_login(&server, "tok-2", 1).await;

    auth.replace_credentials(credentials("fixed")).await;
    assert!(!auth.is_locked());
    auth.ensure_valid().await.unwrap();
}

#[tokio::test]
async fn test_login_server_error_is_service_unavailable_after_retries() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let result = client.auth().ensure_valid().await;
    assert!(
        matches!(result, Err(AuthError::ServiceUnavailable(TransportError::HttpStatus { status: 503, .. }))),
        "expected ServiceUnavailable, got: {result:?}"
    );
    assert!(!client.auth().is_locked());
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_panel_status_sends_bearer_and_panel_id() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/Panel/GetPanelStatus"))
        .and(query_param("panelId", PANEL))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Status": 3,
            "IsOnline": true,
            "StatusTime": "2024-05-01T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = client.panel_status(PANEL).await.unwrap();
    assert_eq!(status.status, Some(3));
    assert_eq!(status.is_online, Some(true));
}

#[tokio::test]
async fn test_null_list_is_empty() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/Panel/GetLockStatus"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .mount(&server)
        .await;

    assert!(client.lock_status(PANEL).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transient_read_failure_is_retried() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/Panel/GetTemperatures"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/Panel/GetTemperatures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "SerialNo": "T1", "Label": "Hall", "Temprature": "" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let temps = client.temperatures(PANEL).await.unwrap();
    assert_eq!(temps.len(), 1);
    assert_eq!(temps[0].temperature, Some(json!("")));
}

#[tokio::test]
async fn test_read_gives_up_after_three_attempts() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/Panel/GetPanel"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = client.panel_info(PANEL).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/Panel/GetPanel"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.panel_info(PANEL).await.unwrap_err();
    assert!(matches!(err, Error::Transport(ref e) if e.is_not_found()), "got: {err:?}");
}

#[tokio::test]
async fn test_unexpected_payload_is_decode_error() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/Panel/GetPanelStatus"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.panel_status(PANEL).await.unwrap_err();
    assert!(
        matches!(err, Error::Transport(TransportError::Decode { .. })),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_unauthorized_read_relogs_in_once() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "AuthorizationToken": "tok-1" })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    client.auth().ensure_valid().await.unwrap();
    mount_login(&server, "tok-2", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/Panel/GetSmartplugStatus"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/Panel/GetSmartplugStatus"))
        .and(header("Authorization", "Bearer tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "Id": "p1", "Label": "Lamp", "Status": "On" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let plugs = client.smartplug_status(PANEL).await.unwrap();
    assert_eq!(plugs[0].status.as_deref(), Some("On"));
    assert_eq!(client.auth().login_attempts(), 2);
}

#[tokio::test]
async fn test_housecheck_posts_panel_id_and_is_retried() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/housecheck/doorsandwindows"))
        .and(body_json(json!({ "PanelId": PANEL })))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/housecheck/doorsandwindows"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Sections": [{ "Places": [{ "Components": [
                { "SerialNo": "DW1", "Label": "Back door", "Closed": true }
            ]}]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hc = client
        .housecheck(PANEL, HousecheckCategory::DoorsAndWindows)
        .await
        .unwrap();
    let sections = hc.sections.unwrap();
    let component = &sections[0].places.as_ref().unwrap()[0].components.as_ref().unwrap()[0];
    assert_eq!(component.serial_no.as_deref(), Some("DW1"));
    assert_eq!(component.closed, Some(true));
}

#[tokio::test]
async fn test_null_housecheck_is_empty() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/housecheck/smokedetectors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .mount(&server)
        .await;

    let hc = client
        .housecheck(PANEL, HousecheckCategory::SmokeDetectors)
        .await
        .unwrap();
    assert!(hc.sections.is_none());
}

#[tokio::test]
async fn test_event_log_requests_first_page() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/panel/logs"))
        .and(query_param("panelid", PANEL))
        .and(query_param("pageNumber", "1"))
        .and(query_param("pageSize", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Records": [{
                "User": "Owner",
                "Channel": "App",
                "Time": "2024-05-01T08:30:00Z",
                "EventType": "unlock",
                "LockName": "Front door"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = client.event_log(PANEL, 5).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type.as_deref(), Some("unlock"));
    assert_eq!(records[0].lock_name.as_deref(), Some("Front door"));
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_arm_posts_panel_code() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/Panel/Arm"))
        .and(body_json(json!({
            "PanelId": PANEL,
            "PanelCode": "123456",
            "Platform": "app"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_alarm(PANEL, ArmAction::Arm, &SecretString::from("123456"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_commands_are_never_retried_on_server_error() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/Panel/Unlock"))
        .and(body_json(json!({
            "PanelId": PANEL,
            "LockSerial": "L1",
            "PanelCode": "123456",
            "Platform": "app"
        })))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .set_lock(PANEL, "L1", LockAction::Unlock, &SecretString::from("123456"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_smartplug_command_body() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/Panel/TurnOffSmartplug"))
        .and(body_json(json!({ "PanelId": PANEL, "DeviceId": "p1" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.set_smartplug(PANEL, "p1", false).await.unwrap();
}

#[tokio::test]
async fn test_logout_drops_the_session() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/Login/Logout"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.auth().ensure_valid().await.unwrap();
    client.auth().logout().await.unwrap();
    assert!(!client.auth().has_valid_session());
}
