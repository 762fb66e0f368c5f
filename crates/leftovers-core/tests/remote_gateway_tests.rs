//! Gateway tests against a mocked REST service.

use leftovers_core::gateway::{Gateway, GatewayError};
use leftovers_core::remote::{RemoteError, RemoteStore};
use leftovers_core::{
    Config, LeftoverPatch, LeftoverPreparation, Medication, NewLeftoverPreparation, PurchaseEntry,
    RemoteConfig, StatisticsReport, TimeRange,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn gateway_for(mock_server: &MockServer) -> Gateway {
    Gateway::remote(RemoteStore::new(&mock_server.uri(), KEY.to_string()))
}

fn medication_rows(range: std::ops::Range<usize>) -> Value {
    Value::Array(
        range
            .map(|i| {
                json!({
                    "id": format!("m{}", i),
                    "name": format!("Medication {:04}", i),
                    "created_at": "2024-01-01T00:00:00Z"
                })
            })
            .collect(),
    )
}

fn leftover_row(id: &str, name: &str, expiry: &str, resolved: bool) -> Value {
    json!({
        "id": id,
        "preparation_name": name,
        "dose": "100mg",
        "expiry_date": expiry,
        "used": false,
        "resolved": resolved,
        "created_at": "2024-03-01T10:00:00Z"
    })
}

// ── reads ────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_all_follows_pages_until_short_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medications"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "1000"))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", KEY))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(medication_rows(0..1000)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medications"))
        .and(query_param("offset", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(medication_rows(1000..1005)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetched = gateway_for(&mock_server).fetch_all::<Medication>().await;

    assert!(fetched.is_fresh());
    assert_eq!(fetched.data.len(), 1005);
    assert_eq!(fetched.data[1004].id, "m1004");
}

#[tokio::test]
async fn fetch_active_filters_unresolved_server_side() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leftover_preparations"))
        .and(query_param("resolved", "eq.false"))
        .and(query_param("order", "expiry_date.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            leftover_row("a", "Cisplatin 75mg/m²", "2024-03-02", false),
            leftover_row("b", "Etoposide 100mg/m²", "2024-03-09", false),
        ])))
        .mount(&mock_server)
        .await;

    let fetched = gateway_for(&mock_server).fetch_active().await;
    let ids: Vec<&str> = fetched.data.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn failed_refresh_returns_last_known_rows_with_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leftover_preparations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            leftover_row("open", "Cisplatin", "2024-03-02", false),
            leftover_row("done", "Etoposide", "2024-03-01", true),
        ])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leftover_preparations"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "service unavailable" })),
        )
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(&mock_server);
    assert!(gateway.fetch_all::<LeftoverPreparation>().await.is_fresh());

    let fetched = gateway.fetch_active().await;
    let ids: Vec<&str> = fetched.data.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["open"]);
    match fetched.error {
        Some(GatewayError::Remote(RemoteError::Status { status, message })) => {
            assert_eq!(status, 503);
            assert_eq!(message, "service unavailable");
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn filtered_reads_do_not_shrink_the_last_known_collection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leftover_preparations"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            leftover_row("open", "Cisplatin", "2024-03-02", false),
            leftover_row("done", "Etoposide", "2024-03-01", true),
        ])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leftover_preparations"))
        .and(query_param("resolved", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([leftover_row(
            "open",
            "Cisplatin",
            "2024-03-02",
            false
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leftover_preparations"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "service unavailable" })),
        )
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(&mock_server);
    assert_eq!(gateway.fetch_all::<LeftoverPreparation>().await.data.len(), 2);

    let active = gateway.fetch_active().await;
    assert!(active.is_fresh());
    assert_eq!(active.data.len(), 1);

    let stale = gateway.fetch_all::<LeftoverPreparation>().await;
    assert!(!stale.is_fresh());
    let mut ids: Vec<&str> = stale.data.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["done", "open"]);

    let report = StatisticsReport::build(
        &stale.data,
        &TimeRange::Custom {
            start: "2024-02-01".parse().ok(),
            end: "2024-04-01".parse().ok(),
        },
        &chrono::Utc::now(),
    );
    assert_eq!(report.counts.total, 2);
    assert_eq!(report.counts.resolved, 1);
}

#[tokio::test]
async fn filtered_read_refreshes_known_rows_by_id() {
    let mock_server = MockServer::start().await;

    let purchase = |id: &str, date: &str, stock: u32| {
        json!({
            "id": id,
            "medication_id": "m1",
            "medication_name": "Ondansetron 8mg",
            "current_stock": stock,
            "ordered": false,
            "order_date": date,
            "created_at": "2024-03-01T10:00:00Z"
        })
    };

    Mock::given(method("GET"))
        .and(path("/rest/v1/purchase_entries"))
        .and(query_param("order", "order_date.desc,created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            purchase("today", "2024-03-14", 5),
            purchase("before", "2024-03-13", 2),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/purchase_entries"))
        .and(query_param("order_date", "eq.2024-03-14"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            purchase("today", "2024-03-14", 1),
            purchase("later", "2024-03-14", 7),
        ])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/purchase_entries"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(&mock_server);
    assert!(gateway.purchase_history().await.is_fresh());
    let day = "2024-03-14".parse().unwrap();
    assert_eq!(gateway.purchases_on(day).await.data.len(), 2);

    let stale = gateway.fetch_all::<PurchaseEntry>().await;
    assert!(!stale.is_fresh());
    let mut known: Vec<(&str, u32)> = stale
        .data
        .iter()
        .map(|p| (p.id.as_str(), p.current_stock))
        .collect();
    known.sort();
    assert_eq!(known, vec![("before", 2), ("later", 7), ("today", 1)]);
}

#[tokio::test]
async fn search_sends_case_insensitive_contains_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medications"))
        .and(query_param("name", "ilike.*par*"))
        .and(query_param("order", "name.asc"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "m1", "name": "Paracetamol 1g", "created_at": "2024-01-01T00:00:00Z" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let matches = gateway_for(&mock_server)
        .search_medications("par", 20)
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "Paracetamol 1g");
}

#[tokio::test]
async fn search_treats_wildcard_characters_as_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medications"))
        .and(query_param("name", "ilike.*5\\%*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "m1", "name": "Glucose 5%", "created_at": "2024-01-01T00:00:00Z" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medications"))
        .and(query_param("name", "ilike.*nacl_0.9*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "m2", "name": "NaCl*0.9", "created_at": "2024-01-01T00:00:00Z" },
            { "id": "m3", "name": "NaCl 0.9%", "created_at": "2024-01-01T00:00:00Z" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(&mock_server);
    let percent = gateway.search_medications("5%", 20).await.unwrap();
    assert_eq!(percent.len(), 1);

    let star = gateway.search_medications("nacl*0.9", 20).await.unwrap();
    let ids: Vec<&str> = star.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m2"]);
}

// ── mutations ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_posts_draft_and_returns_stored_row() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/leftover_preparations"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(json!([{
            "preparation_name": "Paclitaxel 175mg/m²",
            "dose": "300mg",
            "expiry_date": "2024-03-20",
            "used": false,
            "resolved": false
        }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([leftover_row(
            "srv-1",
            "Paclitaxel 175mg/m²",
            "2024-03-20",
            false
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let draft = NewLeftoverPreparation::new(
        "Paclitaxel 175mg/m²".into(),
        "300mg".into(),
        "2024-03-20".parse().unwrap(),
    );
    let created = gateway_for(&mock_server)
        .create::<LeftoverPreparation>(draft)
        .await
        .unwrap();
    assert_eq!(created.id, "srv-1");
}

#[tokio::test]
async fn validation_happens_before_any_request() {
    let mock_server = MockServer::start().await;
    let gateway = gateway_for(&mock_server);

    let draft =
        NewLeftoverPreparation::new("".into(), "300mg".into(), "2024-03-20".parse().unwrap());
    let result = gateway.create::<LeftoverPreparation>(draft).await;

    assert!(matches!(result, Err(GatewayError::Validation(e)) if e.field == "preparation_name"));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_counts_returned_rows() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/leftover_preparations"))
        .and(query_param("id", "eq.a"))
        .and(body_json(json!({ "used": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([leftover_row(
            "a", "Cisplatin", "2024-03-02", false
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/leftover_preparations"))
        .and(query_param("id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(&mock_server);
    let hit = gateway
        .update::<LeftoverPreparation>("a", &LeftoverPatch::used(true))
        .await
        .unwrap();
    let miss = gateway
        .update::<LeftoverPreparation>("missing", &LeftoverPatch::used(true))
        .await
        .unwrap();

    assert_eq!(hit.affected, 1);
    assert_eq!(miss.affected, 0);
}

#[tokio::test]
async fn delete_and_clear_all() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/medications"))
        .and(query_param("id", "eq.m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(medication_rows(1..2)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/medications"))
        .and(query_param("id", "neq."))
        .respond_with(ResponseTemplate::new(200).set_body_json(medication_rows(2..5)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(&mock_server);
    assert_eq!(gateway.delete::<Medication>("m1").await.unwrap().affected, 1);
    assert_eq!(gateway.clear_all::<Medication>().await.unwrap().affected, 3);
}

#[tokio::test]
async fn failed_mutation_is_an_error_value() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/leftover_preparations"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "JWT expired" })),
        )
        .mount(&mock_server)
        .await;

    let err = gateway_for(&mock_server)
        .delete::<LeftoverPreparation>("a")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("JWT expired"), "unexpected error: {err}");
}

// ── backend selection ───────────────────────────────────────────────

#[tokio::test]
async fn connect_uses_remote_when_ping_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leftover_preparations"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        remote: Some(RemoteConfig {
            url: mock_server.uri(),
            api_key: KEY.into(),
        }),
        data_path: dir.path().join("leftovers.db"),
        seed_demo_data: true,
        access_secret: None,
    };

    let gateway = Gateway::connect(&config).await.unwrap();
    assert!(!gateway.is_demo_mode());
    assert!(!config.data_path.exists());
}

#[tokio::test]
async fn connect_falls_back_to_local_when_ping_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        remote: Some(RemoteConfig {
            url: mock_server.uri(),
            api_key: KEY.into(),
        }),
        data_path: dir.path().join("nested").join("leftovers.db"),
        seed_demo_data: true,
        access_secret: None,
    };

    let gateway = Gateway::connect(&config).await.unwrap();
    assert!(gateway.is_demo_mode());
    assert_eq!(gateway.fetch_active().await.data.len(), 3);
    assert!(config.data_path.exists());
}
