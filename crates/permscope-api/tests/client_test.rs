#![allow(clippy::unwrap_used)]
// Integration tests for `AuditClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use permscope_api::{AuditClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, AuditClient) {
    let server = MockServer::start().await;
    let client = AuditClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn permission_record(name: &str, label: &str, privileged: bool) -> serde_json::Value {
    json!({
        "name": name,
        "label": label,
        "privileged": privileged
    })
}

// ── Permission catalog ──────────────────────────────────────────────

#[tokio::test]
async fn test_list_permissions() {
    let (server, client) = setup().await;

    let page = json!({
        "offset": 0,
        "limit": 50,
        "count": 2,
        "totalCount": 2,
        "data": [
            permission_record("ModifyAllData", "Modify All Data", true),
            permission_record("ViewSetup", "View Setup and Configuration", false),
        ]
    });

    Mock::given(method("GET"))
        .and(path("/audit/v1/permissions"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&page))
        .mount(&server)
        .await;

    let page = client.list_permissions(0, 50).await.unwrap();

    assert_eq!(page.total_count, 2);
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].name, "ModifyAllData");
    assert!(page.data[0].privileged);
    assert!(!page.data[1].privileged);
}

#[tokio::test]
async fn test_paginate_all_collects_every_page() {
    let (server, client) = setup().await;

    let page1 = json!({
        "offset": 0, "limit": 1, "count": 1, "totalCount": 2,
        "data": [permission_record("A", "A", false)]
    });
    let page2 = json!({
        "offset": 1, "limit": 1, "count": 1, "totalCount": 2,
        "data": [permission_record("B", "B", false)]
    });

    Mock::given(method("GET"))
        .and(path("/audit/v1/permissions"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&page1))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audit/v1/permissions"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&page2))
        .mount(&server)
        .await;

    let all = client
        .paginate_all(1, |offset, limit| client.list_permissions(offset, limit))
        .await
        .unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "A");
    assert_eq!(all[1].name, "B");
}

// ── Access fetches ──────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_access_summary() {
    let (server, client) = setup().await;

    let body = json!({
        "permissionName": "ModifyAllData",
        "profiles": [
            { "id": "p1", "name": "Admin", "label": "System Administrator" }
        ],
        "permissionSets": [],
        "permissionSetGroups": [],
        "users": [
            { "id": "u1", "username": "admin@example.com", "active": true }
        ],
        "totalUsers": 412
    });

    Mock::given(method("GET"))
        .and(path("/audit/v1/permissions/ModifyAllData/access/summary"))
        .and(query_param("maxUsers", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let result = client
        .fetch_access_summary("ModifyAllData", 500)
        .await
        .unwrap();

    assert_eq!(result.permission_name, "ModifyAllData");
    assert_eq!(result.profiles.len(), 1);
    assert_eq!(result.profiles[0].label, "System Administrator");
    assert_eq!(result.users.len(), 1);
    assert_eq!(result.total_users, 412);
}

#[tokio::test]
async fn test_fetch_access_paged_carries_pagination() {
    let (server, client) = setup().await;

    let body = json!({
        "permissionName": "ViewSetup",
        "users": [
            { "id": "u1", "username": "a@example.com" },
            { "id": "u2", "username": "b@example.com" }
        ],
        "totalUsers": 3,
        "pagination": { "pageNumber": 1, "pageSize": 2, "hasNext": true, "totalCount": 3 }
    });

    Mock::given(method("GET"))
        .and(path("/audit/v1/permissions/ViewSetup/access"))
        .and(query_param("pageSize", "2"))
        .and(query_param("pageNumber", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let result = client.fetch_access_paged("ViewSetup", 2, 1).await.unwrap();

    assert_eq!(result.users.len(), 2);
    assert!(result.pagination.has_next);
    assert_eq!(result.pagination.total_count, 3);
}

#[tokio::test]
async fn test_fetch_access_user_fields_sends_field_list() {
    let (server, client) = setup().await;

    let body = json!({
        "permissionName": "ViewSetup",
        "users": [{
            "id": "u1",
            "username": "a@example.com",
            "email": "a@example.com",
            "profileName": "Standard User",
            "sources": [{ "type": "PermissionSet", "name": "Setup_Viewers" }]
        }],
        "totalUsers": 1
    });

    Mock::given(method("GET"))
        .and(path("/audit/v1/permissions/ViewSetup/access/users"))
        .and(query_param("fields", "email,profileName"))
        .and(query_param("maxUsers", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let result = client
        .fetch_access_user_fields("ViewSetup", &["email", "profileName"], 1000)
        .await
        .unwrap();

    assert_eq!(result.users.len(), 1);
    assert_eq!(result.users[0].sources.len(), 1);
    assert_eq!(result.users[0].sources[0].source_type, "PermissionSet");
}

// ── Active-user roster ──────────────────────────────────────────────

#[tokio::test]
async fn test_list_active_users_cursor() {
    let (server, client) = setup().await;

    let body = json!({
        "users": [{ "id": "u9", "username": "z@example.com" }],
        "pageSize": 200,
        "hasMore": false,
        "lastUserId": "u9",
        "totalCount": 201
    });

    Mock::given(method("GET"))
        .and(path("/audit/v1/users/active"))
        .and(query_param("pageSize", "200"))
        .and(query_param("afterId", "u8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let page = client.list_active_users(200, Some("u8")).await.unwrap();

    assert_eq!(page.users.len(), 1);
    assert!(!page.has_more);
    assert_eq!(page.last_user_id.as_deref(), Some("u9"));
}

// ── Template store ──────────────────────────────────────────────────

#[tokio::test]
async fn test_get_template() {
    let (server, client) = setup().await;

    let body = json!({
        "id": "tpl-1",
        "name": "Quarterly privileged review",
        "permissionNames": ["ModifyAllData"],
        "userIds": ["u1", "u2"],
        "includeAllActiveUsers": true
    });

    Mock::given(method("GET"))
        .and(path("/audit/v1/templates/tpl-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let tpl = client.get_template("tpl-1").await.unwrap();

    assert_eq!(tpl.name, "Quarterly privileged review");
    assert_eq!(tpl.permission_names, vec!["ModifyAllData"]);
    assert!(tpl.include_all_active_users);
}

// ── Error handling ──────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_invalid_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/audit/v1/permissions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.list_permissions(0, 50).await;

    assert!(
        matches!(result, Err(Error::InvalidToken)),
        "expected InvalidToken, got: {result:?}"
    );
}

#[tokio::test]
async fn test_structured_error_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/audit/v1/permissions/Nope/access/summary"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "unknown permission: Nope",
            "code": "audit.permission.unknown"
        })))
        .mount(&server)
        .await;

    let result = client.fetch_access_summary("Nope", 10).await;

    match result {
        Err(Error::Service {
            message,
            code,
            status,
        }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "unknown permission: Nope");
            assert_eq!(code.as_deref(), Some("audit.permission.unknown"));
        }
        other => panic!("expected Service error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/audit/v1/permissions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client.list_permissions(0, 50).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/audit/v1/permissions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client.list_permissions(0, 50).await;

    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}
