use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SUITE: &str = r#"
configVersion: 1
suite: genres
snapshot:
  dir: snapshots
  file: "movies-{stage}.db"
  from: "06"
  to: "07"
tables:
  GENRES: genres
scenarios:
  - id: genre_count
    query: SELECT COUNT(*) AS count FROM {{GENRES}}
    expect:
      row: { count: 3 }
  - id: sorted_genres
    tags: [ordering]
    query: SELECT genre FROM {{GENRES}} ORDER BY genre
    expect:
      rows:
        - { genre: Crime }
        - { genre: Drama }
        - { genre: Music }
"#;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("snapshots")).unwrap();
    let conn = rusqlite::Connection::open(dir.path().join("snapshots/movies-06.db")).unwrap();
    conn.execute_batch(
        "CREATE TABLE genres (id INTEGER PRIMARY KEY, genre TEXT);
         INSERT INTO genres (genre) VALUES ('Drama'), ('Music'), ('Crime');",
    )
    .unwrap();
    fs::write(dir.path().join("sqlcheck.yaml"), SUITE).unwrap();
    dir
}

fn sqlcheck(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sqlcheck").unwrap();
    cmd.current_dir(dir).env_remove("SQLCHECK_LOG");
    cmd
}

#[test]
fn test_run_passing_suite_writes_reports() {
    let dir = workspace();

    sqlcheck(dir.path())
        .args(["run", "--junit", "reports/junit.xml"])
        .assert()
        .code(0)
        .stderr(contains("Summary: 2 passed, 0 failed, 0 error"));

    let run_json = fs::read_to_string(dir.path().join("run.json")).unwrap();
    let artifacts: serde_json::Value = serde_json::from_str(&run_json).unwrap();
    assert_eq!(artifacts["suite"], "genres");
    assert_eq!(artifacts["snapshot"], "06->07");
    assert_eq!(artifacts["results"][0]["status"], "pass");

    let junit = fs::read_to_string(dir.path().join("reports/junit.xml")).unwrap();
    assert!(junit.contains(r#"tests="2" failures="0" errors="0""#));
    assert!(dir.path().join(".sqlcheck/history.db").is_file());
}

#[test]
fn test_run_failing_scenario_exits_one() {
    let dir = workspace();
    let broken = SUITE.replace("row: { count: 3 }", "row: { count: 4 }");
    fs::write(dir.path().join("sqlcheck.yaml"), broken).unwrap();

    sqlcheck(dir.path())
        .arg("run")
        .assert()
        .code(1)
        .stderr(contains("Summary: 1 passed, 1 failed, 0 error"))
        .stderr(contains("Expected: [{\"count\":4}]"))
        .stderr(contains("Actual:   [{\"count\":3}]"));
}

#[test]
fn test_run_missing_snapshot_is_scenario_error() {
    let dir = workspace();
    fs::remove_file(dir.path().join("snapshots/movies-06.db")).unwrap();

    sqlcheck(dir.path())
        .arg("run")
        .assert()
        .code(1)
        .stderr(contains("Summary: 0 passed, 0 failed, 2 error"))
        .stderr(contains("snapshot not found"));
}

#[test]
fn test_run_filter_and_tag() {
    let dir = workspace();

    sqlcheck(dir.path())
        .args(["run", "--tag", "ordering"])
        .assert()
        .code(0)
        .stderr(contains("Running 1 scenarios from genres"))
        .stderr(contains("sorted_genres"));

    sqlcheck(dir.path())
        .args(["run", "--filter", "nothing_matches"])
        .assert()
        .code(2)
        .stderr(contains("no scenario in 'genres' matches"));
}

#[test]
fn test_run_invalid_config_exits_two() {
    let dir = workspace();
    fs::write(
        dir.path().join("sqlcheck.yaml"),
        SUITE.replace("id: sorted_genres", "id: genre_count"),
    )
    .unwrap();

    sqlcheck(dir.path())
        .arg("run")
        .assert()
        .code(2)
        .stderr(contains("duplicate scenario id 'genre_count'"));
}

#[test]
fn test_history_lists_recent_runs() {
    let dir = workspace();
    sqlcheck(dir.path()).arg("run").assert().code(0);
    sqlcheck(dir.path()).arg("run").assert().code(0);

    sqlcheck(dir.path())
        .args(["history", "--suite", "genres", "--last", "1"])
        .assert()
        .success()
        .stdout(contains("run #2"))
        .stdout(contains("run #1").not())
        .stdout(contains("genre_count"))
        .stdout(contains("history: 2 run(s), 4 result(s) stored; last run #2 at "));

    sqlcheck(dir.path())
        .args(["history", "--suite", "genres", "--format", "json"])
        .assert()
        .success()
        .stdout(contains("\"scenario_id\": \"sorted_genres\""));
}

#[test]
fn test_validate_clean_and_json() {
    let dir = workspace();

    sqlcheck(dir.path())
        .args(["validate", "--check-queries"])
        .assert()
        .code(0)
        .stderr(contains("Validation OK"));

    sqlcheck(dir.path())
        .args(["validate", "--format", "json"])
        .assert()
        .code(0)
        .stdout(contains("\"ok\": true"));
}

#[test]
fn test_validate_reports_unknown_table_identifier() {
    let dir = workspace();
    fs::write(
        dir.path().join("sqlcheck.yaml"),
        SUITE.replace("FROM {{GENRES}} ORDER BY", "FROM {{GENRE}} ORDER BY"),
    )
    .unwrap();

    sqlcheck(dir.path())
        .arg("validate")
        .assert()
        .code(2)
        .stderr(contains("[E_TEMPLATE]"))
        .stderr(contains("did you mean 'GENRES'"));
}

#[test]
fn test_init_then_validate_sample() {
    let dir = TempDir::new().unwrap();

    sqlcheck(dir.path())
        .arg("init")
        .assert()
        .success()
        .stderr(contains("created sqlcheck.yaml"));
    assert!(dir.path().join("sqlcheck.yaml").is_file());

    sqlcheck(dir.path())
        .arg("init")
        .assert()
        .success()
        .stderr(contains("already exists"));

    // the sample points at a snapshot that does not exist yet
    sqlcheck(dir.path())
        .arg("validate")
        .assert()
        .code(2)
        .stderr(contains("[E_SNAPSHOT_MISSING]"));
}

#[test]
fn test_version() {
    Command::cargo_bin("sqlcheck")
        .unwrap()
        .arg("version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}
