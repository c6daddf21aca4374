//! Export integration tests.
//!
//! Runs whole SQL folders through the runner and exporter.

use pretty_assertions::assert_eq;
use sqlrun::config::ConnectionConfig;
use sqlrun::connection::ConnectionProvider;
use sqlrun::db::{ColumnInfo, MockConnector, QueryResult, Value};
use sqlrun::export::Exporter;
use sqlrun::query::QueryRunner;
use sqlrun::report::{BatchEvent, RecordingReporter};
use std::fs;
use std::path::Path;

/// Helper to get a provider for the test database, if configured.
fn get_test_provider() -> Option<ConnectionProvider> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    Some(ConnectionProvider::postgres(config))
}

fn write_project_sql(dir: &Path) {
    fs::write(
        dir.join("1_titles.sql"),
        "-- job titles\nSELECT *\nFROM (VALUES (1, 'Engineer'), (2, 'Analyst')) AS t(id, title)\nORDER BY id;\n",
    )
    .unwrap();
    fs::write(
        dir.join("2_broken.sql"),
        "SELECT * FROM table_that_does_not_exist_xyz;",
    )
    .unwrap();
    fs::write(
        dir.join("3_comma.sql"),
        "SELECT 'Senior, Engineer' AS title, NULL::text AS note;",
    )
    .unwrap();
    fs::write(dir.join("4_empty.sql"), "SELECT 1 AS n WHERE false;").unwrap();
    fs::write(dir.join("notes.txt"), "SELECT 'not a query unit';").unwrap();
}

fn artifact_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_export_against_postgres() {
    let Some(provider) = get_test_provider() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let sql_dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let output_dir = out.path().join("csv_files");
    write_project_sql(sql_dir.path());

    let mut reporter = RecordingReporter::new();
    let summary = Exporter::new(&provider)
        .export_all(sql_dir.path(), &output_dir, &mut reporter)
        .await
        .unwrap();

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.exported, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.empty, 1);
    assert_eq!(artifact_names(&output_dir), vec!["1_titles.csv", "3_comma.csv"]);

    let titles = fs::read_to_string(output_dir.join("1_titles.csv")).unwrap();
    assert_eq!(
        titles.lines().collect::<Vec<_>>(),
        vec!["id,title", "1,Engineer", "2,Analyst"]
    );

    let comma = fs::read_to_string(output_dir.join("3_comma.csv")).unwrap();
    assert_eq!(comma, "title,note\r\n\"Senior, Engineer\",\r\n");

    // Second run overwrites with identical content.
    Exporter::new(&provider)
        .export_all(sql_dir.path(), &output_dir, &mut reporter)
        .await
        .unwrap();
    assert_eq!(
        fs::read_to_string(output_dir.join("1_titles.csv")).unwrap(),
        titles
    );
}

#[tokio::test]
async fn test_runner_against_postgres() {
    let Some(provider) = get_test_provider() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let sql_dir = tempfile::tempdir().unwrap();
    write_project_sql(sql_dir.path());

    let mut reporter = RecordingReporter::new();
    let summary = QueryRunner::new(&provider, 5)
        .run_all(sql_dir.path(), &mut reporter)
        .await
        .unwrap();

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.succeeded, 2);
    assert!(reporter
        .events_for("2_broken.sql")
        .iter()
        .any(|e| matches!(e, BatchEvent::QueryFailed { .. })));
    assert!(reporter.events_for("1_titles.sql").contains(&&BatchEvent::SampleRows {
        file: "1_titles.sql".to_string(),
        rows: vec!["(1, Engineer)".to_string(), "(2, Analyst)".to_string()],
    }));
}

#[tokio::test]
async fn test_export_with_mock_database() {
    let sql_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    fs::write(sql_dir.path().join("b.sql"), "SELECT title FROM b").unwrap();
    fs::write(sql_dir.path().join("a.sql"), "SELECT title FROM a").unwrap();

    let title = |t: &str| {
        QueryResult::with_data(
            vec![ColumnInfo::new("title", "text")],
            vec![vec![Value::from(t)]],
        )
    };
    let connector = MockConnector::new()
        .with_result("SELECT title FROM a", title("Line one\nLine two"))
        .with_result("SELECT title FROM b", title("Plain"));
    let provider = ConnectionProvider::new(ConnectionConfig::default(), connector.clone());
    let mut reporter = RecordingReporter::new();

    Exporter::new(&provider)
        .export_all(sql_dir.path(), output_dir.path(), &mut reporter)
        .await
        .unwrap();

    assert_eq!(
        connector.executed(),
        vec!["SELECT title FROM a", "SELECT title FROM b"]
    );
    assert_eq!(
        fs::read_to_string(output_dir.path().join("a.csv")).unwrap(),
        "title\r\n\"Line one\nLine two\"\r\n"
    );
    assert_eq!(connector.stats().max_live, 1);
}
