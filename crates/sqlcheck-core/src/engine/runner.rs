use crate::compare::{diff_rows, Comparison};
use crate::errors::{HarnessError, HarnessResult};
use crate::fingerprint;
use crate::model::{Scenario, ScenarioResult, ScenarioStatus, SuiteConfig};
use crate::report::RunArtifacts;
use crate::snapshot::{Database, SqliteSnapshot};
use crate::storage::Store;
use crate::tables::render_query;
use crate::value::Row;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteState {
    Uninitialized,
    Ready,
    TornDown,
}

impl SuiteState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuiteState::Uninitialized => "uninitialized",
            SuiteState::Ready => "ready",
            SuiteState::TornDown => "torn down",
        }
    }
}

/// One suite's connection lifecycle: `Uninitialized -> Ready -> TornDown`.
///
/// The snapshot handle is owned here and lent to each scenario in turn.
pub struct SuiteSession<'a> {
    cfg: &'a SuiteConfig,
    state: SuiteState,
    db: Option<Arc<dyn Database>>,
    repeat: u32,
}

impl<'a> SuiteSession<'a> {
    pub fn new(cfg: &'a SuiteConfig) -> Self {
        Self {
            cfg,
            state: SuiteState::Uninitialized,
            db: None,
            repeat: cfg.settings.repeat(),
        }
    }

    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat.max(1);
        self
    }

    pub fn state(&self) -> SuiteState {
        self.state
    }

    /// Opens the configured SQLite snapshot.
    pub async fn setup(&mut self) -> HarnessResult<()> {
        let spec = self.cfg.snapshot.clone();
        self.setup_with(move || {
            SqliteSnapshot::open_existing(&spec).map(|s| Arc::new(s) as Arc<dyn Database>)
        })
        .await
    }

    /// Runs `open` on the blocking pool, bounded by the setup timeout.
    pub async fn setup_with<F>(&mut self, open: F) -> HarnessResult<()>
    where
        F: FnOnce() -> HarnessResult<Arc<dyn Database>> + Send + 'static,
    {
        if self.state != SuiteState::Uninitialized {
            return Err(HarnessError::Lifecycle(self.state.as_str()));
        }
        let limit = self.cfg.settings.setup_timeout();
        let started = Instant::now();

        let db = match timeout(limit, tokio::task::spawn_blocking(open)).await {
            Err(_) => return Err(HarnessError::SetupTimeout(limit)),
            Ok(Err(join)) => {
                return Err(HarnessError::SnapshotOpen {
                    path: self.cfg.snapshot.source_path().display().to_string(),
                    message: format!("setup task failed: {}", join),
                })
            }
            Ok(Ok(opened)) => opened?,
        };

        tracing::info!(
            event = "suite_setup",
            suite = %self.cfg.suite,
            snapshot = %db.label(),
            elapsed_ms = started.elapsed().as_millis() as u64
        );
        self.db = Some(db);
        self.state = SuiteState::Ready;
        Ok(())
    }

    pub fn teardown(&mut self) {
        self.db = None;
        self.state = SuiteState::TornDown;
    }

    /// Executes one scenario and asserts its result. Never panics or returns
    /// early with an error: every failure is folded into the result.
    pub async fn run_scenario(&self, sc: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        let mut result = pending_result(sc);

        let outcome = self.check(sc, &mut result).await;
        result.duration_ms = Some(start.elapsed().as_millis() as u64);

        match outcome {
            Ok(()) => {
                tracing::info!(event = "scenario_finish", scenario = %sc.id, status = "pass");
            }
            Err(e) => {
                if matches!(e, HarnessError::Timeout(_)) {
                    tracing::warn!(event = "scenario_timeout", scenario = %sc.id, error = %e);
                } else {
                    tracing::info!(event = "scenario_finish", scenario = %sc.id, status = "fail", kind = e.kind());
                }
                apply_error(&mut result, &e);
            }
        }
        result
    }

    async fn check(&self, sc: &Scenario, result: &mut ScenarioResult) -> HarnessResult<()> {
        let db = match (&self.state, &self.db) {
            (SuiteState::Ready, Some(db)) => db.clone(),
            _ => return Err(HarnessError::Lifecycle(self.state.as_str())),
        };

        let sql = render_query(&sc.query, &self.cfg.tables)?;
        result.query = sql.clone();
        result.fingerprint = Some(
            fingerprint::compute(fingerprint::Context {
                suite: &self.cfg.suite,
                scenario_id: &sc.id,
                query: &sql,
                expected_canonical: &serde_json::to_string(&sc.expect).unwrap_or_default(),
                snapshot_label: db.label(),
            })
            .hex,
        );

        let limit = self.cfg.scenario_timeout(sc);
        tracing::debug!(event = "scenario_start", scenario = %sc.id, timeout_s = limit.as_secs());

        let rows = observe(db.as_ref(), sc, &sql, limit).await?;
        let digest = fingerprint::rows_digest(&rows);
        result.rows_digest = Some(digest.clone());
        result.actual = Some(rows);

        let cmp = Comparison::resolve(sc.order, &sql);
        if let Some(diff) = diff_rows(sc.expect.rows(), result.actual.as_deref().unwrap_or(&[]), cmp)
        {
            return Err(HarnessError::AssertionMismatch(diff));
        }

        for run in 2..=self.repeat {
            let again = observe(db.as_ref(), sc, &sql, limit).await?;
            let d = fingerprint::rows_digest(&again);
            if d != digest {
                result.actual = Some(again);
                return Err(HarnessError::Nondeterministic {
                    run,
                    expected: digest,
                    actual: d,
                });
            }
        }
        Ok(())
    }
}

/// One bounded execution. On timeout the in-flight query is asked to stop and
/// the scenario fails regardless of whether it does. The abandoned statement
/// keeps the connection until it stops; the next query re-sends the interrupt
/// while it waits, and that wait counts against its own timeout.
async fn observe(
    db: &dyn Database,
    sc: &Scenario,
    sql: &str,
    limit: Duration,
) -> HarnessResult<Vec<Row>> {
    let fut = async {
        if sc.expect.is_single() {
            db.select_single_row(sql).await.map(|r| vec![r])
        } else {
            db.select_multiple_rows(sql).await
        }
    };
    match timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => {
            db.interrupt();
            Err(HarnessError::Timeout(limit))
        }
    }
}

fn pending_result(sc: &Scenario) -> ScenarioResult {
    ScenarioResult {
        scenario_id: sc.id.clone(),
        name: sc.name.clone(),
        status: ScenarioStatus::Pass,
        message: "ok".into(),
        error_kind: None,
        query: String::new(),
        expected: sc.expect.rows().to_vec(),
        actual: None,
        duration_ms: None,
        fingerprint: None,
        rows_digest: None,
    }
}

fn apply_error(result: &mut ScenarioResult, e: &HarnessError) {
    result.status = if e.is_assertion() {
        ScenarioStatus::Fail
    } else {
        ScenarioStatus::Error
    };
    result.message = e.to_string();
    result.error_kind = Some(e.kind().to_string());
    if let HarnessError::QueryExecution { query, .. } = e {
        if result.query.is_empty() {
            result.query = query.clone();
        }
    }
}

/// Which scenarios of a suite to run.
#[derive(Debug, Clone, Default)]
pub struct RunPolicy {
    /// Substring match on scenario id.
    pub filter: Option<String>,
    /// Scenario must carry at least one of these tags (empty: no constraint).
    pub tags: Vec<String>,
    /// Overrides `settings.repeat`.
    pub repeat: Option<u32>,
}

impl RunPolicy {
    pub fn selects(&self, sc: &Scenario) -> bool {
        let by_id = self
            .filter
            .as_deref()
            .map_or(true, |f| sc.id.contains(f));
        let by_tag = self.tags.is_empty() || sc.tags.iter().any(|t| self.tags.contains(t));
        by_id && by_tag
    }
}

pub struct Runner {
    pub store: Store,
    pub policy: RunPolicy,
}

impl Runner {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            policy: RunPolicy::default(),
        }
    }

    pub async fn run_suite(&self, cfg: &SuiteConfig) -> anyhow::Result<RunArtifacts> {
        let spec = cfg.snapshot.clone();
        self.run_suite_with(cfg, move || {
            SqliteSnapshot::open_existing(&spec).map(|s| Arc::new(s) as Arc<dyn Database>)
        })
        .await
    }

    /// Runs the selected scenarios sequentially against the database `open`
    /// yields. A setup failure marks every selected scenario as an error.
    pub async fn run_suite_with<F>(&self, cfg: &SuiteConfig, open: F) -> anyhow::Result<RunArtifacts>
    where
        F: FnOnce() -> HarnessResult<Arc<dyn Database>> + Send + 'static,
    {
        let selected: Vec<&Scenario> = cfg
            .scenarios
            .iter()
            .filter(|sc| self.policy.selects(sc))
            .collect();
        let run_id = self.store.create_run(cfg)?;

        let mut session = SuiteSession::new(cfg);
        if let Some(n) = self.policy.repeat {
            session = session.with_repeat(n);
        }

        let mut results = Vec::with_capacity(selected.len());
        match session.setup_with(open).await {
            Ok(()) => {
                for sc in selected {
                    let row = session.run_scenario(sc).await;
                    self.store.insert_result(run_id, &row)?;
                    results.push(row);
                }
            }
            Err(e) => {
                tracing::error!(event = "suite_setup_failed", suite = %cfg.suite, error = %e);
                for sc in selected {
                    let mut row = pending_result(sc);
                    apply_error(&mut row, &e);
                    self.store.insert_result(run_id, &row)?;
                    results.push(row);
                }
            }
        }
        session.teardown();

        let any_fail = results.iter().any(|r| r.is_failure());
        self.store
            .finalize_run(run_id, if any_fail { "failed" } else { "passed" })?;

        Ok(RunArtifacts {
            run_id,
            suite: cfg.suite.clone(),
            snapshot: cfg.snapshot.label(),
            results,
        })
    }
}
