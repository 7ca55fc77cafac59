use poolbench_client::{HttpPool, TargetConfig, DEFAULT_MAX_WAIT};
use poolbench_common::{BenchError, ClientError, ResourceClient};
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

// Helper: a target aimed at the given mockito server URL.
fn target(server_url: &str) -> TargetConfig {
    TargetConfig { connection_url: server_url.to_string(), ..Default::default() }
}

// Helper: a pool pointed at localhost for tests that never actually connect.
fn localhost_pool() -> HttpPool {
    HttpPool::new(&target("http://127.0.0.1:8080/"), 4).unwrap()
}

// --- TargetConfig ---

#[test]
fn test_load_reads_json_target() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "connection_url": "http://db.internal:8080",
            "username": "bench",
            "password": "secret",
            "max_wait_millis": 1500,
            "validation_query": "/health",
            "connection_properties": {{ "X-Tenant": "a" }}
        }}"#
    )
    .unwrap();

    let config = TargetConfig::load(file.path()).unwrap();
    assert_eq!(config.connection_url, "http://db.internal:8080");
    assert_eq!(config.max_wait(), Duration::from_millis(1500));
    assert_eq!(config.validation_query.as_deref(), Some("/health"));
    assert_eq!(config.connection_properties.get("X-Tenant").map(String::as_str), Some("a"));
    assert_eq!(
        config.credentials(),
        Some(("bench".to_string(), Some("secret".to_string())))
    );
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = TargetConfig::load(&path).unwrap_err();
    assert!(matches!(&err, BenchError::Io(msg) if msg.contains("does not exist")));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_load_requires_connection_url() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "username": "bench", "connection_url": "   " }}"#).unwrap();

    let err = TargetConfig::load(file.path()).unwrap_err();
    assert_eq!(
        err,
        BenchError::InvalidConfig("Property 'connection_url' is required".to_string())
    );
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_load_malformed_json_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "connection_url = http://x").unwrap();
    assert!(matches!(TargetConfig::load(file.path()), Err(BenchError::InvalidConfig(_))));
}

#[test]
fn test_defaults_when_optional_fields_absent() {
    let config = target("http://127.0.0.1:8080");
    assert_eq!(config.max_wait(), DEFAULT_MAX_WAIT);
    assert_eq!(config.credentials(), None);
}

#[test]
fn test_connection_properties_override_credentials() {
    let mut props = BTreeMap::new();
    props.insert("user".to_string(), "root".to_string());
    props.insert("password".to_string(), "override".to_string());
    let config = TargetConfig {
        connection_url: "http://127.0.0.1:8080".to_string(),
        username: Some("bench".to_string()),
        password: Some("secret".to_string()),
        connection_properties: props,
        ..Default::default()
    };
    assert_eq!(
        config.credentials(),
        Some(("root".to_string(), Some("override".to_string())))
    );
}

#[test]
fn test_invalid_header_property_rejected() {
    let mut props = BTreeMap::new();
    props.insert("bad header".to_string(), "x".to_string());
    let config = TargetConfig {
        connection_url: "http://127.0.0.1:8080".to_string(),
        connection_properties: props,
        ..Default::default()
    };
    assert!(matches!(HttpPool::new(&config, 1), Err(BenchError::InvalidConfig(_))));
}

// --- build_url ---

#[test]
fn test_build_url_joins_paths() {
    let pool = localhost_pool();
    assert_eq!(pool.build_url("/items"), "http://127.0.0.1:8080/items");
    assert_eq!(pool.build_url("items?limit=5"), "http://127.0.0.1:8080/items?limit=5");
    assert_eq!(pool.build_url(""), "http://127.0.0.1:8080/");
}

// --- acquire / execute ---

#[tokio::test]
async fn test_execute_drains_body_and_releases_connection() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/items")
        .with_status(200)
        .with_body(vec![b'x'; 64 * 1024])
        .create_async()
        .await;

    let pool = HttpPool::new(&target(&server.url()), 2).unwrap();
    let handle = pool.acquire().await.unwrap();
    assert_eq!(pool.available(), 1);

    pool.execute(handle, "/items").await.unwrap();
    assert_eq!(pool.available(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_execute_reports_status_error() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/broken").with_status(500).create_async().await;

    let pool = HttpPool::new(&target(&server.url()), 1).unwrap();
    let handle = pool.acquire().await.unwrap();
    let result = pool.execute(handle, "/broken").await;

    assert_eq!(result, Err(ClientError::Status(500, "Internal Server Error".to_string())));
    assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn test_execute_reports_network_error() {
    // Port 1 is reserved and nothing listens there.
    let pool = HttpPool::new(&target("http://127.0.0.1:1"), 1).unwrap();
    let handle = pool.acquire().await.unwrap();
    assert!(matches!(pool.execute(handle, "/").await, Err(ClientError::Network(_))));
}

#[tokio::test]
async fn test_acquire_times_out_when_pool_exhausted() {
    let config = TargetConfig { max_wait_millis: Some(50), ..target("http://127.0.0.1:8080") };
    let pool = HttpPool::new(&config, 1).unwrap();

    let _held = pool.acquire().await.unwrap();
    assert_eq!(pool.acquire().await.unwrap_err(), ClientError::AcquireTimeout(50));
}

#[tokio::test]
async fn test_acquire_runs_validation_query() {
    let mut server = mockito::Server::new_async().await;
    let health = server.mock("GET", "/health").with_status(200).create_async().await;

    let config = TargetConfig {
        validation_query: Some("/health".to_string()),
        ..target(&server.url())
    };
    let pool = HttpPool::new(&config, 1).unwrap();
    let handle = pool.acquire().await;

    assert!(handle.is_ok());
    health.assert_async().await;
}

#[tokio::test]
async fn test_acquire_fails_when_validation_fails() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/health").with_status(503).create_async().await;

    let config = TargetConfig {
        validation_query: Some("/health".to_string()),
        ..target(&server.url())
    };
    let pool = HttpPool::new(&config, 1).unwrap();
    let err = pool.acquire().await.unwrap_err();

    assert_eq!(
        err,
        ClientError::Validation("HTTP 503: Service Unavailable".to_string())
    );
    // The failed checkout must not leak its slot.
    assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn test_execute_sends_auth_and_property_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/q")
        .match_header("authorization", "Basic YmVuY2g6c2VjcmV0")
        .match_header("x-tenant", "a")
        .match_header("x-request-id", mockito::Matcher::Any)
        .with_status(200)
        .create_async()
        .await;

    let mut props = BTreeMap::new();
    props.insert("X-Tenant".to_string(), "a".to_string());
    let config = TargetConfig {
        username: Some("bench".to_string()),
        password: Some("secret".to_string()),
        connection_properties: props,
        ..target(&server.url())
    };
    let pool = HttpPool::new(&config, 1).unwrap();
    let handle = pool.acquire().await.unwrap();
    pool.execute(handle, "/q").await.unwrap();

    mock.assert_async().await;
}
