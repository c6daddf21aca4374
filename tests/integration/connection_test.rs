//! Connection integration tests.
//!
//! Tests database connectivity and the provider's failure sentinel.

use sqlrun::config::ConnectionConfig;
use sqlrun::connection::ConnectionProvider;
use sqlrun::db::{DatabaseClient, PostgresClient};
use sqlrun::report::{BatchEvent, RecordingReporter};
use std::time::{Duration, Instant};

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

#[tokio::test]
async fn test_connect_with_valid_credentials() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let config = ConnectionConfig::from_connection_string(&url).unwrap();

    let provider = ConnectionProvider::postgres(config);
    let mut reporter = RecordingReporter::new();

    let db = provider.acquire(&mut reporter).await.expect("session");
    let result = db.execute_query("SELECT 1 AS one").await.unwrap();
    assert_eq!(result.row_count, 1);
    db.close().await.unwrap();

    assert!(matches!(reporter.events(), [BatchEvent::Connected { .. }]));
}

#[tokio::test]
async fn test_wrong_password_returns_sentinel() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let mut config = ConnectionConfig::from_connection_string(&url).unwrap();
    config.password = Some("definitely-not-the-password".to_string());
    config.user = Some(config.user.unwrap_or_else(|| "postgres".to_string()));

    let provider = ConnectionProvider::postgres(config);
    let mut reporter = RecordingReporter::new();

    // Trust-authenticated servers accept any password; only check that
    // nothing is raised and that a failure is reported when refused.
    match provider.acquire(&mut reporter).await {
        Some(db) => db.close().await.unwrap(),
        None => assert!(matches!(
            reporter.events(),
            [BatchEvent::ConnectionFailed { .. }]
        )),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_invalid_host() {
    let config = ConnectionConfig {
        host: Some("invalid.host.that.does.not.exist.local".to_string()),
        port: 5432,
        database: Some("testdb".to_string()),
        user: Some("testuser".to_string()),
        password: Some("testpass".to_string()),
    };

    let result = PostgresClient::connect(&config).await;
    assert!(result.is_err());

    let error_msg = result.unwrap_err().to_string().to_lowercase();
    assert!(
        error_msg.contains("connect")
            || error_msg.contains("resolve")
            || error_msg.contains("lookup")
            || error_msg.contains("error"),
        "Expected connection error, got: {}",
        error_msg
    );
}

#[tokio::test(flavor = "current_thread")]
async fn test_provider_with_invalid_port_reports_failure() {
    let config = ConnectionConfig {
        host: Some("127.0.0.1".to_string()),
        port: 59999, // Unlikely to be in use
        database: Some("testdb".to_string()),
        user: Some("testuser".to_string()),
        password: Some("testpass".to_string()),
    };

    let provider = ConnectionProvider::postgres(config);
    let mut reporter = RecordingReporter::new();

    let started = Instant::now();
    assert!(provider.acquire(&mut reporter).await.is_none());
    let elapsed = started.elapsed();

    // One attempt against a closed local port is refused at once.
    assert!(elapsed < Duration::from_secs(5), "acquire took {elapsed:?}");
    match reporter.events() {
        [BatchEvent::ConnectionFailed { target, cause }] => {
            assert_eq!(target, "testdb @ 127.0.0.1:59999");
            assert!(
                cause.to_lowercase().contains("refused"),
                "cause was: {cause}"
            );
            assert!(!cause.contains("testpass"));
        }
        other => panic!("Expected ConnectionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_special_characters_in_password_reach_the_server() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let mut config = ConnectionConfig::from_connection_string(&url).unwrap();
    config.password = Some("pa/ss#1?%".to_string());

    // The options must build; whether the server accepts the password
    // depends on its authentication method.
    assert!(config.to_connect_options().is_ok());

    let provider = ConnectionProvider::postgres(config);
    let mut reporter = RecordingReporter::new();
    if let Some(db) = provider.acquire(&mut reporter).await {
        db.close().await.unwrap();
    } else {
        match reporter.events() {
            [BatchEvent::ConnectionFailed { cause, .. }] => {
                assert!(!cause.contains("Configuration"), "cause was: {cause}");
            }
            other => panic!("Expected ConnectionFailed, got {:?}", other),
        }
    }
}
