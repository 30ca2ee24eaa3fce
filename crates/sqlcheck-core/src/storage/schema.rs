pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  suite TEXT NOT NULL,
  snapshot TEXT NOT NULL,
  started_at TEXT NOT NULL,
  finished_at TEXT,
  status TEXT NOT NULL,
  config_json TEXT
);

CREATE TABLE IF NOT EXISTS results (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  run_id INTEGER NOT NULL REFERENCES runs(id),
  scenario_id TEXT NOT NULL,
  outcome TEXT NOT NULL,
  error_kind TEXT,
  message TEXT NOT NULL,
  duration_ms INTEGER,
  fingerprint TEXT,
  rows_digest TEXT,
  details_json TEXT
);

CREATE INDEX IF NOT EXISTS idx_results_run ON results(run_id);
CREATE INDEX IF NOT EXISTS idx_results_fingerprint ON results(fingerprint);
"#;
