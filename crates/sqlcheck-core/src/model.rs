use crate::tables::TableRegistry;
use crate::value::Row;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(default, rename = "configVersion", alias = "version")]
    pub version: u32,
    pub suite: String,
    pub snapshot: SnapshotSpec,
    #[serde(default, skip_serializing_if = "is_default_settings")]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "TableRegistry::is_empty")]
    pub tables: TableRegistry,
    pub scenarios: Vec<Scenario>,
}

impl SuiteConfig {
    pub fn is_legacy(&self) -> bool {
        self.version == 0
    }

    pub fn scenario_timeout(&self, sc: &Scenario) -> Duration {
        let secs = sc
            .timeout_seconds
            .or(self.settings.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        Duration::from_secs(secs)
    }
}

/// Where the snapshot lives and which stage transition the suite covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSpec {
    #[serde(default = "default_snapshot_dir")]
    pub dir: PathBuf,
    /// File name template; `{stage}` is replaced by the stage label.
    #[serde(default = "default_snapshot_file")]
    pub file: String,
    pub from: String,
    pub to: String,
}

impl SnapshotSpec {
    pub fn path_for(&self, stage: &str) -> PathBuf {
        self.dir.join(self.file.replace("{stage}", stage))
    }

    pub fn source_path(&self) -> PathBuf {
        self.path_for(&self.from)
    }

    pub fn label(&self) -> String {
        format!("{}->{}", self.from, self.to)
    }
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_snapshot_file() -> String {
    "{stage}.db".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_timeout_seconds: Option<u64>,
    /// Executions per scenario; results must agree across all of them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,
}

impl Settings {
    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(
            self.setup_timeout_seconds
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        )
    }

    pub fn repeat(&self) -> u32 {
        self.repeat.unwrap_or(1).max(1)
    }
}

fn is_default_settings(s: &Settings) -> bool {
    s == &Settings::default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    /// Free-form description, e.g. "should select top 3 most common categories".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// SQL text with `{{IDENT}}` table placeholders.
    pub query: String,
    /// Written as `expect: { row: {...} }` or `expect: { rows: [...] }`.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub expect: Expectation,
    #[serde(default, skip_serializing_if = "OrderMode::is_auto")]
    pub order: OrderMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Expected outcome: a single row (`select_single_row`) or a sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Row(Row),
    Rows(Vec<Row>),
}

impl Expectation {
    pub fn rows(&self) -> &[Row] {
        match self {
            Expectation::Row(r) => std::slice::from_ref(r),
            Expectation::Rows(rs) => rs,
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Expectation::Row(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderMode {
    /// Strict when the query has a top-level `ORDER BY`, unordered otherwise.
    #[default]
    Auto,
    Strict,
    Unordered,
}

impl OrderMode {
    fn is_auto(&self) -> bool {
        matches!(self, OrderMode::Auto)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Pass,
    Fail,
    Error,
}

impl ScenarioStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "pass" => ScenarioStatus::Pass,
            "fail" => ScenarioStatus::Fail,
            _ => ScenarioStatus::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioStatus::Pass => "pass",
            ScenarioStatus::Fail => "fail",
            ScenarioStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_id: String,
    #[serde(default)]
    pub name: String,
    pub status: ScenarioStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Rendered SQL that ran (empty when rendering failed).
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub expected: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Vec<Row>>,
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub rows_digest: Option<String>,
}

impl ScenarioResult {
    pub fn is_failure(&self) -> bool {
        !matches!(self.status, ScenarioStatus::Pass)
    }
}
