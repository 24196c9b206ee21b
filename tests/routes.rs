//! Router-level tests against a lazily-connected pool. Routing decisions,
//! request validation, and error mapping all happen before any database
//! access, so these run without a live server.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use pgforge::catalog::{
    ColumnDescriptor, EnumDescriptor, SchemaCatalog, SchemaDescriptor, TableDescriptor,
};
use pgforge::config::PoolSettings;
use pgforge::AppState;
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn column(name: &str, udt: &str, nullable: bool) -> ColumnDescriptor {
    ColumnDescriptor {
        name: name.to_string(),
        data_type: udt.to_string(),
        udt_schema: "pg_catalog".to_string(),
        udt_name: udt.to_string(),
        nullable,
        default: None,
        is_identity: false,
        is_enum: false,
        char_max_length: None,
    }
}

fn pharma_catalog() -> SchemaCatalog {
    let mut id = column("id", "int4", false);
    id.default = Some("nextval('drug_id_seq'::regclass)".into());
    let name = column("name", "varchar", false);
    let mut kind = column("type", "drug_type", true);
    kind.is_enum = true;
    kind.udt_schema = "pharma".into();

    let drug = TableDescriptor {
        schema: "pharma".into(),
        name: "drug".into(),
        is_view: false,
        columns: vec![id, name, kind],
        pk_columns: vec!["id".into()],
        foreign_keys: Vec::new(),
    };
    let stock_view = TableDescriptor {
        schema: "pharma".into(),
        name: "stock_view".into(),
        is_view: true,
        columns: vec![column("drug_name", "text", true), column("stock", "int4", true)],
        pk_columns: Vec::new(),
        foreign_keys: Vec::new(),
    };

    SchemaCatalog {
        schemas: vec![SchemaDescriptor {
            name: "pharma".into(),
            tables: vec![drug, stock_view],
        }],
        enums: vec![EnumDescriptor {
            schema: "pharma".into(),
            name: "drug_type".into(),
            labels: vec!["Patent".into(), "Generic".into()],
        }],
        degraded: Vec::new(),
    }
}

fn app() -> axum::Router {
    let pool = pgforge::connect_lazy(
        "postgres://localhost/pharmacy_test",
        &PoolSettings::default(),
    )
    .expect("lazy pool");
    let state = AppState::new(pool, pharma_catalog(), vec!["pharma".into()]);
    pgforge::build(state)
}

async fn send(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(v) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn error_kind(body: &Value) -> &str {
    body.get("kind").and_then(Value::as_str).unwrap_or("")
}

#[tokio::test]
async fn mutation_routes_do_not_exist_for_views() {
    let (status, body) = send("POST", "/pharma/stock_view", Some(json!({"stock": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "not_found");

    let (status, body) = send("PUT", "/pharma/stock_view/1", Some(json!({"stock": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "not_found");

    let (status, body) = send("DELETE", "/pharma/stock_view/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "not_found");
}

#[tokio::test]
async fn unknown_paths_fall_through_to_not_found() {
    let (status, body) = send("GET", "/pharma/no_such_table", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "not_found");
}

#[tokio::test]
async fn unknown_filter_column_is_a_validation_error() {
    let (status, body) = send("GET", "/pharma/drug?potency=9", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");
}

#[tokio::test]
async fn malformed_pagination_is_a_validation_error() {
    let (status, body) = send("GET", "/pharma/drug?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");

    let (status, _) = send("GET", "/pharma/drug?sort=potency", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send("GET", "/pharma/drug?sort=name&order=sideways", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_id_on_integer_pk_is_a_bad_request() {
    let (status, body) = send("DELETE", "/pharma/drug/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "bad_request");
}

#[tokio::test]
async fn create_payload_is_validated_before_any_database_access() {
    let (status, body) = send("POST", "/pharma/drug", Some(json!({"potency": 3}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");

    let (status, body) = send("POST", "/pharma/drug", Some(json!({"type": "Generic"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("name is required"));

    let (status, _) = send(
        "POST",
        "/pharma/drug",
        Some(json!({"name": "Aspirin", "type": "Imaginary"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // server-generated pk is not part of the mutation payload
    let (status, body) = send(
        "POST",
        "/pharma/drug",
        Some(json!({"id": 1, "name": "Aspirin"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("unknown field 'id'"));
}

#[tokio::test]
async fn metadata_router_serves_the_catalog_snapshot() {
    let (status, body) = send("GET", "/metadata", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schemas"][0]["name"], "pharma");
    let tables = body["schemas"][0]["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 2);

    let (status, body) = send("GET", "/metadata/pharma", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "pharma");

    let (status, body) = send("GET", "/metadata/warehouse", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "not_found");
}

#[tokio::test]
async fn enum_router_lists_allowed_values() {
    let (status, body) = send("GET", "/enums", None).await;
    assert_eq!(status, StatusCode::OK);
    let enums = body.as_array().unwrap();
    assert_eq!(enums.len(), 1);
    assert_eq!(enums[0]["name"], "drug_type");
    assert_eq!(enums[0]["labels"], json!(["Patent", "Generic"]));
}

#[tokio::test]
async fn health_and_version_respond_without_a_database() {
    let (status, body) = send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send("GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "pgforge");
}
