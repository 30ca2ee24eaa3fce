use crate::model::{ScenarioResult, ScenarioStatus, SuiteConfig};
use anyhow::Context;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Run history. Separate from the snapshots under test, which are never
/// written to.
#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

pub struct StoreStats {
    pub runs: Option<u64>,
    pub results: Option<u64>,
    pub last_run_id: Option<i64>,
    pub last_run_at: Option<String>,
}

/// One stored scenario outcome joined with its run.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub run_id: i64,
    pub started_at: String,
    pub snapshot: String,
    pub scenario_id: String,
    pub status: ScenarioStatus,
    pub error_kind: Option<String>,
    pub message: String,
    pub duration_ms: Option<u64>,
    pub fingerprint: Option<String>,
    pub rows_digest: Option<String>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open history db {}", path.display()))?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("history store lock poisoned"))
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    pub fn create_run(&self, cfg: &SuiteConfig) -> anyhow::Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO runs(suite, snapshot, started_at, status, config_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                cfg.suite,
                cfg.snapshot.label(),
                now_rfc3339(),
                "running",
                serde_json::to_string(cfg)?
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn finalize_run(&self, run_id: i64, status: &str) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE runs SET status=?1, finished_at=?2 WHERE id=?3",
            params![status, now_rfc3339(), run_id],
        )?;
        Ok(())
    }

    pub fn insert_result(&self, run_id: i64, r: &ScenarioResult) -> anyhow::Result<()> {
        let details = serde_json::json!({
            "name": r.name,
            "query": r.query,
            "expected": r.expected,
            "actual": r.actual,
        });
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO results(run_id, scenario_id, outcome, error_kind, message, duration_ms,
                                 fingerprint, rows_digest, details_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                r.scenario_id,
                r.status.as_str(),
                r.error_kind,
                r.message,
                r.duration_ms.map(|v| v as i64),
                r.fingerprint,
                r.rows_digest,
                serde_json::to_string(&details)?
            ],
        )?;
        Ok(())
    }

    /// Most recent results for a suite across its last `runs` runs, newest first.
    pub fn fetch_results_for_last_n_runs(
        &self,
        suite: &str,
        runs: u32,
    ) -> anyhow::Result<Vec<HistoryEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT
                r.run_id, runs.started_at, runs.snapshot, r.scenario_id, r.outcome,
                r.error_kind, r.message, r.duration_ms, r.fingerprint, r.rows_digest
             FROM results r
             JOIN runs ON r.run_id = runs.id
             WHERE runs.id IN (
                 SELECT id FROM runs WHERE suite = ?1 ORDER BY id DESC LIMIT ?2
             )
             ORDER BY r.run_id DESC, r.id ASC",
        )?;

        let rows = stmt.query_map(params![suite, runs], |row| {
            Ok(HistoryEntry {
                run_id: row.get(0)?,
                started_at: row.get(1)?,
                snapshot: row.get(2)?,
                scenario_id: row.get(3)?,
                status: ScenarioStatus::parse(&row.get::<_, String>(4)?),
                error_kind: row.get(5)?,
                message: row.get(6)?,
                duration_ms: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
                fingerprint: row.get(8)?,
                rows_digest: row.get(9)?,
            })
        })?;

        let mut results = Vec::new();
        for r in rows {
            results.push(r?);
        }
        Ok(results)
    }

    pub fn run_status(&self, run_id: i64) -> anyhow::Result<Option<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT status FROM runs WHERE id = ?1")?;
        let mut rows = stmt.query(params![run_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn stats_best_effort(&self) -> anyhow::Result<StoreStats> {
        let conn = self.lock()?;

        let count = |sql: &str| -> Option<u64> {
            conn.query_row(sql, [], |r| r.get::<_, i64>(0).map(|x| x as u64))
                .ok()
        };
        let runs = count("SELECT COUNT(*) FROM runs");
        let results = count("SELECT COUNT(*) FROM results");

        let (last_run_id, last_run_at) = conn
            .query_row(
                "SELECT id, started_at FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)),
            )
            .map(|(id, at)| (Some(id), Some(at)))
            .unwrap_or((None, None));

        Ok(StoreStats {
            runs,
            results,
            last_run_id,
            last_run_at,
        })
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
