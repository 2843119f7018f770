#![cfg(unix)]

use clidrive::{
    Db2Cli, Db2Pd, Engine, EngineConfig, EngineError, Outcome, Profile, RawLines, RequestOptions,
    Stream, db2, db2pd,
};
use std::time::Duration;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn config() -> EngineConfig {
    EngineConfig::default()
        .with_startup_timeout(Duration::from_secs(5))
        .with_idle_backoff(Duration::from_millis(10))
        .with_settle(Duration::from_millis(300))
}

async fn fake_db2() -> Db2Cli {
    let profile = db2::profile('@').command_line_override("sh", [fixture("fake_db2.sh")]);
    Db2Cli::with_profile(profile, '@', config()).await.unwrap()
}

async fn fake_db2pd() -> Db2Pd {
    let profile = db2pd::profile().command_line_override("sh", [fixture("fake_db2pd.sh")]);
    Db2Pd::with_profile(profile, config()).await.unwrap()
}

#[tokio::test]
async fn test_database_aliases() {
    let mut db2 = fake_db2().await;
    assert_eq!(db2.database_aliases().await.unwrap(), vec!["SAMPLE", "TOOLSDB"]);
    db2.close().unwrap();
}

#[tokio::test]
async fn test_connect_defaults_to_first_alias() {
    let mut db2 = fake_db2().await;
    assert_eq!(db2.connect(None).await.unwrap(), "SAMPLE");
    assert_eq!(db2.connect(Some("TOOLSDB")).await.unwrap(), "TOOLSDB");
}

#[tokio::test]
async fn test_query() {
    let mut db2 = fake_db2().await;
    let table = db2.query("select tabname, card from syscat.tables").await.unwrap();
    assert_eq!(table.names, vec!["TABNAME", "CARD"]);
    assert_eq!(
        table.rows,
        vec![vec!["SYSTABLES", "120"], vec!["SYSCOLUMNS", "1450"]]
    );
    assert_eq!(table.row_count, 2);
}

#[tokio::test]
async fn test_query_into_sink() {
    let mut db2 = fake_db2().await;
    let mut rows: Vec<Vec<String>> = Vec::new();
    let table = db2
        .query_into("select tabname, card from syscat.tables", &mut rows)
        .await
        .unwrap();
    assert!(table.rows.is_empty());
    assert_eq!(table.row_count, 2);
    assert_eq!(rows[1], vec!["SYSCOLUMNS", "1450"]);
}

#[tokio::test]
async fn test_application_handle_and_snapshot() {
    let mut db2 = fake_db2().await;
    let handle = db2.application_handle().await.unwrap();
    assert_eq!(handle.as_deref(), Some("42"));

    let snapshot = db2.snapshot_for_application("42").await.unwrap();
    assert_eq!(snapshot["Application handle"], "42");
    assert_eq!(snapshot["agent[12].Lock timeout (seconds)"], "-1");
    assert_eq!(
        snapshot["agent[12].mem.Application_Heap.Current size (bytes)"],
        "65536"
    );
    assert_eq!(
        snapshot["agent[12].mem.Other_Memory.Current size (bytes)"],
        "196608"
    );
    assert!(!snapshot.contains_key("Authorization level granted"));
    assert!(!snapshot.contains_key("agent[12].Buffer pool data logical reads"));
}

#[tokio::test]
async fn test_sql_error_is_raised() {
    let mut db2 = fake_db2().await;
    let err = db2.query("select * from missing").await.unwrap_err();
    let remote = err.remote().expect("remote error");
    assert_eq!(remote.code, Some(-204));
    assert_eq!(remote.state.as_deref(), Some("42704"));
}

#[tokio::test]
async fn test_sql_error_as_value_keeps_session_usable() {
    let mut db2 = fake_db2().await;
    let options = RequestOptions::new().errors_as_values(true);
    match db2.execute("selec 1", &options).await.unwrap() {
        Outcome::Failed(err) => {
            assert_eq!(err.code, Some(-104));
            assert_eq!(err.state.as_deref(), Some("42601"));
            assert_eq!(err.lines.len(), 3);
        }
        Outcome::Success(lines) => panic!("expected a failure, got {lines:?}"),
    }

    let lines = db2.execute("commit", &options).await.unwrap().into_result().unwrap();
    assert!(lines.iter().any(|l| l.starts_with("DB20000I")), "got {lines:?}");
}

#[tokio::test]
async fn test_stderr_output_is_unclassified() {
    let mut db2 = fake_db2().await;
    let err = db2
        .execute("stderr warning", &RequestOptions::new())
        .await
        .unwrap_err();
    match err {
        EngineError::Unclassified { lines } => {
            assert_eq!(lines.len(), 2);
            assert!(lines[0].starts_with("DB21034E"));
        }
        other => panic!("expected unclassified output, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_leaves_child_running() {
    let mut db2 = fake_db2().await;
    let options = RequestOptions::new().timeout(Duration::from_millis(300));
    let err = db2.execute("hang", &options).await.unwrap_err();
    assert!(matches!(err, EngineError::Timeout(d) if d == Duration::from_millis(300)));
    assert!(db2.engine_mut().is_alive());
}

#[tokio::test]
async fn test_missing_prompt_times_out() {
    let profile = Profile::new("silent", "sh", "db2 => ")
        .args(["-c", "printf 'db2 => '; exec sleep 5"]);
    let mut engine = Engine::spawn(profile, config()).await.unwrap();
    let options = RequestOptions::new().timeout(Duration::from_millis(200));
    let err = engine
        .get_response("values 1@", RawLines::new(), &options)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Timeout(_)), "got {err:?}");
    assert!(engine.is_alive());
}

#[tokio::test]
async fn test_exit_is_reported_as_disconnect() {
    let mut db2 = fake_db2().await;
    let err = db2.execute("quit", &RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::ProcessUnavailable(_)), "got {err:?}");

    let err = db2.execute("commit", &RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::ProcessUnavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn test_stdout_mirror() {
    let mirror = tempfile::NamedTempFile::new().unwrap();
    let mut db2 = fake_db2().await;
    db2.engine()
        .set_mirror(Stream::Stdout, Some(Box::new(mirror.reopen().unwrap())))
        .unwrap();
    db2.execute("commit", &RequestOptions::new()).await.unwrap();
    db2.close().unwrap();

    let content = std::fs::read_to_string(mirror.path()).unwrap();
    assert!(content.contains("DB20000I"), "mirror: {content:?}");
    assert!(content.ends_with("db2 => "), "mirror: {content:?}");
}

#[tokio::test]
async fn test_db2pd_options() {
    let mut pd = fake_db2pd().await;
    let lines = pd.run("-osinfo").await.unwrap();
    assert!(lines.iter().any(|l| l == "OSName:   Linux"), "got {lines:?}");

    match pd.run("-bogus").await.unwrap_err() {
        EngineError::Unclassified { lines } => {
            assert!(lines[0].starts_with("Invalid command"), "got {lines:?}");
        }
        other => panic!("expected unclassified output, got {other:?}"),
    }
    pd.close().unwrap();
}
