mod common;

use chrono::{Duration, Utc};
use common::{Caller, TestApp};
use secrets_manager_service::jobs::{RetentionSweeper, SecretTrash};
use secrets_manager_service::models::NewSecret;
use secrets_manager_service::services::EntityStore;
use serde_json::{json, Value};
use uuid::Uuid;

async fn seed_secret(app: &TestApp, org: Uuid, key: &str, project_id: Option<Uuid>) -> Uuid {
    app.store
        .create_secret(
            org,
            NewSecret {
                key: key.to_string(),
                value: format!("{}-value", key),
                note: String::new(),
            },
            project_id,
        )
        .await
        .expect("Failed to seed secret")
        .id
}

fn keys(body: &Value) -> Vec<String> {
    body["secrets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn admins_list_everything_members_only_granted_projects() {
    let app = TestApp::spawn().await;
    let org = Uuid::new_v4();
    let granted = app.seed_project(org, "granted").await;
    let hidden = app.seed_project(org, "hidden").await;
    seed_secret(&app, org, "in-granted", Some(granted)).await;
    seed_secret(&app, org, "in-hidden", Some(hidden)).await;
    seed_secret(&app, org, "loose", None).await;

    let member = Caller::member(org);
    app.store
        .grant_project_access(member.user_id, granted)
        .await
        .unwrap();

    let admin_projects: Value = app
        .get(&Caller::owner(org), &format!("/sm/{}/projects", org))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(admin_projects["projects"].as_array().unwrap().len(), 2);

    let admin_secrets: Value = app
        .get(&Caller::owner(org), &format!("/sm/{}/secrets", org))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(keys(&admin_secrets), vec!["in-granted", "in-hidden", "loose"]);
    // listings never carry values
    assert!(admin_secrets["secrets"][0].get("value").is_none());

    let member_projects: Value = app
        .get(&member, &format!("/sm/{}/projects", org))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(member_projects["projects"].as_array().unwrap().len(), 1);
    assert_eq!(member_projects["projects"][0]["name"], "granted");

    let member_secrets: Value = app
        .get(&member, &format!("/sm/{}/secrets", org))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(keys(&member_secrets), vec!["in-granted"]);
}

#[tokio::test]
async fn trash_and_restore_round_trip() {
    let app = TestApp::spawn().await;
    let org = Uuid::new_v4();
    let owner = Caller::owner(org);
    let doomed = seed_secret(&app, org, "doomed", None).await;
    seed_secret(&app, org, "kept", None).await;

    let response = app
        .post(&owner, &format!("/sm/{}/secrets/delete", org))
        .json(&json!({ "ids": [doomed] }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["updated"], 1);

    let live: Value = app
        .get(&owner, &format!("/sm/{}/secrets", org))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(keys(&live), vec!["kept"]);

    let trash: Value = app
        .get(&owner, &format!("/sm/{}/trash", org))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(keys(&trash), vec!["doomed"]);
    assert!(trash["secrets"][0]["deleted_date"].is_string());

    let response = app
        .post(&owner, &format!("/sm/{}/trash/restore", org))
        .json(&json!({ "ids": [doomed] }))
        .send()
        .await
        .expect("Failed to execute request");
    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["updated"], 1);

    let live: Value = app
        .get(&owner, &format!("/sm/{}/secrets", org))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(keys(&live), vec!["doomed", "kept"]);
}

#[tokio::test]
async fn trash_ignores_other_organizations_secrets() {
    let app = TestApp::spawn().await;
    let org = Uuid::new_v4();
    let other = Uuid::new_v4();
    let foreign = seed_secret(&app, other, "foreign", None).await;

    let body: Value = app
        .post(&Caller::owner(org), &format!("/sm/{}/secrets/delete", org))
        .json(&json!({ "ids": [foreign] }))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(body["updated"], 0);
    assert!(app.store.all_secrets().await[0].deleted_date.is_none());
}

#[tokio::test]
async fn empty_id_list_fails_validation() {
    let app = TestApp::spawn().await;
    let org = Uuid::new_v4();

    let response = app
        .post(&Caller::owner(org), &format!("/sm/{}/secrets/delete", org))
        .json(&json!({ "ids": [] }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn members_cannot_manage_trash() {
    let app = TestApp::spawn().await;
    let org = Uuid::new_v4();
    let id = seed_secret(&app, org, "s", None).await;

    let response = app
        .post(&Caller::member(org), &format!("/sm/{}/secrets/delete", org))
        .json(&json!({ "ids": [id] }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn swept_trash_cannot_be_restored() {
    let app = TestApp::spawn().await;
    let org = Uuid::new_v4();
    let owner = Caller::owner(org);
    let old = seed_secret(&app, org, "old", None).await;
    let recent = seed_secret(&app, org, "recent", None).await;
    let now = Utc::now();
    app.store
        .set_deleted_date(old, Some(now - Duration::days(31)))
        .await;
    app.store
        .set_deleted_date(recent, Some(now - Duration::days(1)))
        .await;

    let report = RetentionSweeper::new(SecretTrash::new(app.store.clone()))
        .sweep(now)
        .await
        .unwrap();
    assert_eq!(report.removed, 1);

    let body: Value = app
        .post(&owner, &format!("/sm/{}/trash/restore", org))
        .json(&json!({ "ids": [old, recent] }))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(body["updated"], 1);

    let live: Value = app
        .get(&owner, &format!("/sm/{}/secrets", org))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(keys(&live), vec!["recent"]);
}

#[tokio::test]
async fn oversized_body_outside_import_gets_a_json_413() {
    let app = TestApp::spawn().await;
    let org = Uuid::new_v4();
    // over the default 2 MB limit that still applies to this route
    let ids: Vec<String> = (0..70_000).map(|_| Uuid::new_v4().to_string()).collect();

    let response = app
        .post(&Caller::owner(org), &format!("/sm/{}/secrets/delete", org))
        .json(&json!({ "ids": ids }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 413);
    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["error"].is_string());
}
