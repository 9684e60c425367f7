mod common;

use axum::http::StatusCode;
use common::{ENGINEERING_ID, SALES_ID, TestApp, read_json};
use http_helpers::{authed_json_request, authed_request};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn list_ids(app: &TestApp, user: &str, uri: &str) -> Vec<String> {
    let response = app
        .router
        .clone()
        .oneshot(authed_request("GET", uri, &app.token(user)))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK, "listing {uri} as {user}");
    let body = read_json(response).await;
    let mut ids: Vec<String> = body["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|item| item["_id"].as_str().map(str::to_string))
        .collect();
    ids.sort();
    assert_eq!(body["count"], json!(ids.len()));
    ids
}

#[tokio::test]
async fn assigned_condition_limits_tasks_to_assignee() {
    let app = TestApp::new();
    assert_eq!(list_ids(&app, "u1", "/api/v1/data/tasks").await, vec!["t1"]);
    assert_eq!(list_ids(&app, "u2", "/api/v1/data/tasks").await, vec!["t2"]);
}

#[tokio::test]
async fn own_or_subordinates_covers_transitive_reports() {
    let app = TestApp::new();
    assert_eq!(
        list_ids(&app, "m1", "/api/v1/data/tasks").await,
        vec!["t1", "t2"]
    );
}

#[tokio::test]
async fn superadmin_and_unrestricted_roles_see_every_live_row() {
    let app = TestApp::new();
    let all = vec!["t1", "t2", "t3"];
    assert_eq!(list_ids(&app, "admin", "/api/v1/data/tasks").await, all);
    assert_eq!(list_ids(&app, "a1", "/api/v1/data/tasks").await, all);
}

#[tokio::test]
async fn department_condition_matches_stored_department_ids() {
    let app = TestApp::new();
    assert_eq!(list_ids(&app, "m1", "/api/v1/data/projects").await, vec!["p1"]);
    assert!(app.state.filters.departments().cache().is_empty());
}

#[tokio::test]
async fn department_names_resolve_once_through_the_directory() {
    let app = TestApp::new();
    assert_eq!(
        list_ids(&app, "l1", "/api/v1/data/projects").await,
        vec!["p2", "p3"]
    );
    let cached = app
        .state
        .filters
        .departments()
        .cache()
        .get(&"Sales".to_string())
        .expect("cached department");
    assert_eq!(cached.as_str(), SALES_ID);
}

#[tokio::test]
async fn department_condition_on_users_lists_colleagues() {
    let app = TestApp::new();
    assert_eq!(
        list_ids(&app, "m1", "/api/v1/data/users").await,
        vec!["m1", "u1"]
    );
}

#[tokio::test]
async fn array_assignee_matches_membership() {
    let app = TestApp::new();
    assert_eq!(
        list_ids(&app, "u1", "/api/v1/data/projects").await,
        vec!["p1", "p2"]
    );
    assert_eq!(list_ids(&app, "u2", "/api/v1/data/projects").await, vec!["p2"]);
}

#[tokio::test]
async fn users_default_to_self_scope() {
    let app = TestApp::new();
    assert_eq!(list_ids(&app, "u1", "/api/v1/data/users").await, vec!["u1"]);
}

#[tokio::test]
async fn own_condition_without_rows_returns_empty_list() {
    let app = TestApp::new();
    assert!(list_ids(&app, "u1", "/api/v1/data/clients").await.is_empty());
}

#[tokio::test]
async fn query_string_narrows_within_scope() {
    let app = TestApp::new();
    assert_eq!(
        list_ids(&app, "admin", "/api/v1/data/tasks?title=Review").await,
        vec!["t2"]
    );
    assert!(
        list_ids(&app, "u1", "/api/v1/data/tasks?title=Review")
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn rows_outside_scope_read_as_missing() {
    let app = TestApp::new();
    let token = app.token("u1");

    let visible = app
        .router
        .clone()
        .oneshot(authed_request("GET", "/api/v1/data/tasks/t1", &token))
        .await
        .expect("get");
    assert_eq!(visible.status(), StatusCode::OK);
    assert_eq!(read_json(visible).await["title"], json!("Ship"));

    for id in ["t3", "t4", "nope"] {
        let response = app
            .router
            .clone()
            .oneshot(authed_request(
                "GET",
                &format!("/api/v1/data/tasks/{id}"),
                &token,
            ))
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "task {id}");
    }
}

#[tokio::test]
async fn patch_is_scoped_and_protects_bookkeeping_fields() {
    let app = TestApp::new();
    let token = app.token("u1");

    let response = app
        .router
        .clone()
        .oneshot(authed_json_request(
            "PATCH",
            "/api/v1/data/tasks/t1",
            &token,
            json!({"title": "Shipped", "createdBy": "u1", "_id": "zz"}),
        ))
        .await
        .expect("patch");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["_id"], json!("t1"));
    assert_eq!(body["title"], json!("Shipped"));
    assert_eq!(body["createdBy"], json!("m1"));
    assert_eq!(body["updatedBy"], json!("u1"));

    let response = app
        .router
        .clone()
        .oneshot(authed_json_request(
            "PATCH",
            "/api/v1/data/tasks/t3",
            &token,
            json!({"title": "Hijacked"}),
        ))
        .await
        .expect("patch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .clone()
        .oneshot(authed_json_request(
            "PATCH",
            "/api/v1/data/tasks/t1",
            &token,
            json!({"isDeleted": true}),
        ))
        .await
        .expect("patch");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_stamps_owner_and_resolved_department() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/v1/data/tasks",
            &app.token("u1"),
            json!({"title": "New", "assignedTo": "u1", "createdBy": "someone-else"}),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["createdBy"], json!("u1"));
    assert_eq!(body["department"], json!(ENGINEERING_ID));
    assert_eq!(body["isDeleted"], json!(false));
    let id = body["_id"].as_str().expect("id").to_string();
    assert!(trellis_access::is_object_id(&id));

    let ids = list_ids(&app, "u1", "/api/v1/data/tasks").await;
    assert!(ids.contains(&id));
}

#[tokio::test]
async fn delete_requires_the_delete_action_and_soft_deletes() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "DELETE",
            "/api/v1/data/tasks/t1",
            &app.token("u1"),
        ))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "DELETE",
            "/api/v1/data/tasks/t3",
            &app.token("a1"),
        ))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        list_ids(&app, "admin", "/api/v1/data/tasks").await,
        vec!["t1", "t2"]
    );
}

#[tokio::test]
async fn resource_without_permission_entry_is_forbidden() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(authed_request("GET", "/api/v1/data/emails", &app.token("u1")))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert_eq!(body["code"], json!("forbidden"));
}

#[tokio::test]
async fn me_reports_context_and_permissions() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(authed_request("GET", "/api/v1/me", &app.token("m1")))
        .await
        .expect("me");
    assert_eq!(response.status(), StatusCode::OK);
    let me = read_json(response).await;
    assert_eq!(me["user_id"], json!("m1"));
    assert_eq!(me["department"], json!(ENGINEERING_ID));
    assert_eq!(me["subordinate_ids"], json!(["u1", "u2"]));
    assert_eq!(me["is_super_admin"], json!(false));

    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "GET",
            "/api/v1/me/permissions",
            &app.token("u1"),
        ))
        .await
        .expect("permissions");
    let summary = read_json(response).await;
    assert_eq!(
        summary["resources"]["tasks"],
        json!(["read", "create", "update"])
    );
    assert!(summary["resources"].get("emails").is_none());

    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "GET",
            "/api/v1/me/permissions",
            &app.token("admin"),
        ))
        .await
        .expect("permissions");
    let summary = read_json(response).await;
    assert_eq!(summary["is_super_admin"], json!(true));
    let emails: Vec<Value> = summary["resources"]["emails"]
        .as_array()
        .cloned()
        .expect("emails");
    assert!(emails.contains(&json!("delete")));
}
