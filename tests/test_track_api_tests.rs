// tests/test_track_api_tests.rs

use std::sync::Arc;

use deneme_tracker::{
    config::Config, routes, state::AppState, store::MemoryExamStore, utils::jwt::sign_jwt,
};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";

/// Spawns the app on a random port, backed by the in-memory store.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let config = Config {
        database_url: None,
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        port: 0,
        log_dir: "logs".to_string(),
    };

    let state = AppState {
        store: Arc::new(MemoryExamStore::new()),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn bearer(user_id: i64) -> String {
    format!("Bearer {}", sign_jwt(user_id, SECRET, 600).unwrap())
}

fn tyt_payload() -> Value {
    json!({
        "examName": "Tonguç Akademi Denemeleri",
        "examType": "TYT",
        "subjects": {
            "Türkçe": { "correct": 10, "incorrect": 0, "empty": 30 }
        }
    })
}

fn ayt_payload() -> Value {
    json!({
        "examName": "Karekök Yayınları Denemeleri",
        "examType": "AYT",
        "aytField": "Sayısal",
        "subjects": {
            "Matematik": { "correct": 10, "incorrect": 0, "empty": 30 }
        }
    })
}

async fn create(client: &reqwest::Client, address: &str, user_id: i64, payload: Value) -> Value {
    let response = client
        .post(format!("{}/api/testtrack", address))
        .header("Authorization", bearer(user_id))
        .json(&payload)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn health_check_works() {
    let address = spawn_app().await;

    let response = reqwest::get(format!("{}/api/health", address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/testtrack", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn create_returns_derived_fields() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let created = create(&client, &address, 1, tyt_payload()).await;

    assert_eq!(created["subjects"]["Türkçe"]["net"], 10.0);
    assert_eq!(created["totalNet"], 10.0);
    assert_eq!(created["examScore"], 133.0);
    assert_eq!(created["finalScore"], Value::Null);
    assert_eq!(created["user"], 1);

    // Read back without drift
    let id = created["id"].as_i64().unwrap();
    let fetched: Value = client
        .get(format!("{}/api/testtrack/{}", address, id))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn create_ayt_without_field_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let mut payload = ayt_payload();
    payload.as_object_mut().unwrap().remove("aytField");

    let response = client
        .post(format!("{}/api/testtrack", address))
        .header("Authorization", bearer(1))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn create_with_missing_name_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/testtrack", address))
        .header("Authorization", bearer(1))
        .json(&json!({ "examType": "TYT", "subjects": {} }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn linked_flow_computes_final_score() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let tyt = create(&client, &address, 1, tyt_payload()).await;
    let tyt_id = tyt["id"].as_i64().unwrap();

    let mut ayt = ayt_payload();
    ayt["linkedExamId"] = json!(tyt_id);
    let ayt = create(&client, &address, 1, ayt).await;
    let ayt_id = ayt["id"].as_i64().unwrap();
    assert_eq!(ayt["linkedExamId"], tyt_id);

    let pairs: Vec<Value> = client
        .get(format!("{}/api/testtrack/linked", address))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0]["exam1"]["id"], tyt_id);
    assert_eq!(pairs[0]["exam2"]["id"], ayt_id);
    assert_eq!(pairs[0]["finalScore"], 131.2);

    // Another user sees nothing
    let others: Vec<Value> = client
        .get(format!("{}/api/testtrack/linked", address))
        .header("Authorization", bearer(2))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(others.is_empty());
}

#[tokio::test]
async fn delete_releases_counterpart() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let tyt = create(&client, &address, 1, tyt_payload()).await;
    let tyt_id = tyt["id"].as_i64().unwrap();
    let ayt = create(&client, &address, 1, ayt_payload()).await;
    let ayt_id = ayt["id"].as_i64().unwrap();

    let link = client
        .put(format!("{}/api/testtrack/{}/link", address, ayt_id))
        .header("Authorization", bearer(1))
        .json(&json!({ "linkedExamId": tyt_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(link.status().as_u16(), 200);

    // Someone else cannot delete it
    let forbidden = client
        .delete(format!("{}/api/testtrack/{}", address, tyt_id))
        .header("Authorization", bearer(2))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    let deleted = client
        .delete(format!("{}/api/testtrack/{}", address, tyt_id))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let remaining: Value = client
        .get(format!("{}/api/testtrack/{}", address, ayt_id))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(remaining["linkedExamId"], Value::Null);

    let missing = client
        .delete(format!("{}/api/testtrack/{}", address, tyt_id))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn update_refreshes_pair_score() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let tyt = create(&client, &address, 1, tyt_payload()).await;
    let tyt_id = tyt["id"].as_i64().unwrap();
    let mut ayt = ayt_payload();
    ayt["linkedExamId"] = json!(tyt_id);
    create(&client, &address, 1, ayt).await;

    let updated: Value = client
        .put(format!("{}/api/testtrack/{}", address, tyt_id))
        .header("Authorization", bearer(1))
        .json(&json!({
            "subjects": { "Türkçe": { "correct": 0, "incorrect": 0, "empty": 40 } }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(updated["examScore"], 100.0);
    // 100 * 0.4 + 130 * 0.6
    assert_eq!(updated["finalScore"], 118.0);
}

#[tokio::test]
async fn link_report_is_clean_after_normal_use() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let tyt = create(&client, &address, 1, tyt_payload()).await;
    let mut ayt = ayt_payload();
    ayt["linkedExamId"] = tyt["id"].clone();
    create(&client, &address, 1, ayt).await;

    let report: Value = client
        .get(format!("{}/api/testtrack/link-report", address))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        report,
        json!({ "asymmetric": [], "dangling": [], "sameType": [] })
    );
}
