use crate::errors::{HarnessError, HarnessResult};
use crate::model::SnapshotSpec;
use crate::value::{Row, Scalar};
use async_trait::async_trait;
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

/// Read-only query surface over a database snapshot.
#[async_trait]
pub trait Database: Send + Sync {
    /// Stage label, e.g. `06->07`.
    fn label(&self) -> &str;

    /// All rows in the order the engine produced them.
    async fn select_multiple_rows(&self, query: &str) -> HarnessResult<Vec<Row>>;

    /// Exactly one row; 0 or more than one is a cardinality error.
    async fn select_single_row(&self, query: &str) -> HarnessResult<Row> {
        let mut rows = self.select_multiple_rows(query).await?;
        if rows.len() != 1 {
            return Err(HarnessError::ResultCardinality {
                expected: 1,
                actual: rows.len(),
            });
        }
        Ok(rows.remove(0))
    }

    /// Best-effort cancellation of whatever query is in flight.
    fn interrupt(&self) {}
}

#[derive(Clone)]
pub struct SqliteSnapshot {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
    label: String,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSnapshot")
            .field("label", &self.label)
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteSnapshot {
    /// Opens the snapshot produced by `spec.from`, labelled `from->to`.
    pub fn open_existing(spec: &SnapshotSpec) -> HarnessResult<Self> {
        let path = spec.source_path();
        if !path.is_file() {
            return Err(HarnessError::SnapshotNotFound {
                stage: spec.from.clone(),
                path: path.display().to_string(),
            });
        }
        Self::open_path(&path, &spec.label())
    }

    pub fn open_path(path: &Path, label: &str) -> HarnessResult<Self> {
        let open_err = |e: rusqlite::Error| HarnessError::SnapshotOpen {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_err)?;
        // forces the header to be read so a non-database file fails at setup
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |r| {
            r.get::<_, i64>(0)
        })
        .map_err(open_err)?;

        let interrupt = Arc::new(conn.get_interrupt_handle());
        tracing::debug!(event = "snapshot_open", path = %path.display(), label = %label);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
            label: label.to_string(),
            path: path.to_path_buf(),
        })
    }

    /// Compiles `sql` without stepping it: catches syntax errors and missing
    /// tables or columns.
    pub fn prepare_check(&self, sql: &str) -> HarnessResult<()> {
        let conn = acquire(&self.conn, &self.interrupt, sql)?;
        let checked = conn.prepare(sql).map(|_| ()).map_err(|e| HarnessError::QueryExecution {
            query: sql.to_string(),
            message: e.to_string(),
        });
        checked
    }

    /// Runs `sql` on the blocking pool, keeping at most `keep` rows.
    async fn scan(&self, query: &str, keep: Option<usize>) -> HarnessResult<(Vec<Row>, usize)> {
        let conn = self.conn.clone();
        let interrupt = self.interrupt.clone();
        let sql = query.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = acquire(&conn, &interrupt, &sql)?;
            scan_rows(&conn, &sql, keep)
        })
        .await
        .map_err(|e| HarnessError::QueryExecution {
            query: query.to_string(),
            message: format!("query task failed: {}", e),
        })?
    }
}

#[async_trait]
impl Database for SqliteSnapshot {
    fn label(&self) -> &str {
        &self.label
    }

    async fn select_multiple_rows(&self, query: &str) -> HarnessResult<Vec<Row>> {
        self.scan(query, None).await.map(|(rows, _)| rows)
    }

    /// Keeps only the first row in memory; the rest are stepped and counted.
    async fn select_single_row(&self, query: &str) -> HarnessResult<Row> {
        let (mut rows, total) = self.scan(query, Some(1)).await?;
        if total != 1 {
            return Err(HarnessError::ResultCardinality {
                expected: 1,
                actual: total,
            });
        }
        Ok(rows.remove(0))
    }

    fn interrupt(&self) {
        self.interrupt.interrupt();
    }
}

/// Locks the connection. Queries run one at a time, so a held lock means a
/// statement abandoned by an earlier timeout is still stepping. SQLite drops
/// an interrupt that arrives before a statement starts, so it is re-sent
/// until the holder lets go.
fn acquire<'a>(
    conn: &'a Mutex<Connection>,
    interrupt: &InterruptHandle,
    sql: &str,
) -> HarnessResult<MutexGuard<'a, Connection>> {
    let mut waited = false;
    loop {
        match conn.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::WouldBlock) => {
                if !waited {
                    tracing::debug!(event = "snapshot_busy", "interrupting abandoned statement");
                    waited = true;
                }
                interrupt.interrupt();
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(TryLockError::Poisoned(_)) => {
                return Err(HarnessError::QueryExecution {
                    query: sql.to_string(),
                    message: "connection lock poisoned".into(),
                })
            }
        }
    }
}

/// Runs `sql` and marshals every row into a column-alias keyed record.
pub fn query_rows(conn: &Connection, sql: &str) -> HarnessResult<Vec<Row>> {
    scan_rows(conn, sql, None).map(|(rows, _)| rows)
}

/// Steps every row of `sql`, marshalling the first `keep` (all when `None`).
/// Returns the marshalled rows and the total row count.
pub fn scan_rows(
    conn: &Connection,
    sql: &str,
    keep: Option<usize>,
) -> HarnessResult<(Vec<Row>, usize)> {
    let exec_err = |e: rusqlite::Error| HarnessError::QueryExecution {
        query: sql.to_string(),
        message: e.to_string(),
    };

    let mut stmt = conn.prepare(sql).map_err(exec_err)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query([]).map_err(exec_err)?;

    let mut out = Vec::new();
    let mut total = 0usize;
    while let Some(row) = rows.next().map_err(exec_err)? {
        total += 1;
        if keep.is_some_and(|k| out.len() >= k) {
            continue;
        }
        let mut rec = Row::new();
        for (i, name) in names.iter().enumerate() {
            // duplicate aliases: last column wins
            rec.insert(name.clone(), Scalar::from_sqlite(row.get_ref(i).map_err(exec_err)?));
        }
        out.push(rec);
    }
    Ok((out, total))
}
