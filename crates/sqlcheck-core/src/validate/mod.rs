use crate::compare::Comparison;
use crate::model::{Expectation, OrderMode, SuiteConfig};
use crate::snapshot::SqliteSnapshot;
use crate::tables::QueryTemplate;
use serde::Serialize;
use std::collections::BTreeSet;

pub mod codes {
    pub const E_CFG_PARSE: &str = "E_CFG_PARSE";
    pub const E_SNAPSHOT_MISSING: &str = "E_SNAPSHOT_MISSING";
    pub const E_SNAPSHOT_OPEN: &str = "E_SNAPSHOT_OPEN";
    pub const E_TEMPLATE: &str = "E_TEMPLATE";
    pub const E_QUERY_INVALID: &str = "E_QUERY_INVALID";
    pub const W_UNUSED_TABLE: &str = "W_UNUSED_TABLE";
    pub const W_UNORDERED_COMPARE: &str = "W_UNORDERED_COMPARE";
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fix_steps: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: "error",
            message: message.into(),
            scenario: None,
            fix_steps: vec![],
        }
    }

    pub fn warn(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: "warn",
            ..Self::error(code, message)
        }
    }

    pub fn with_scenario(mut self, id: &str) -> Self {
        self.scenario = Some(id.to_string());
        self
    }

    pub fn with_fix_step(mut self, step: impl Into<String>) -> Self {
        self.fix_steps.push(step.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == "error"
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(id) = &self.scenario {
            write!(f, " (scenario: {})", id)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidateReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidateReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Also compile each rendered query against the snapshot.
    pub check_queries: bool,
}

/// Static checks that need no query execution.
pub fn validate(cfg: &SuiteConfig, opts: &ValidateOptions) -> ValidateReport {
    let mut diags = Vec::new();
    let mut used = BTreeSet::new();
    let mut rendered = Vec::new();

    for sc in &cfg.scenarios {
        let sql = QueryTemplate::parse(&sc.query).and_then(|t| {
            used.extend(t.identifiers().map(str::to_string));
            t.render(&cfg.tables)
        });
        match sql {
            Ok(sql) => {
                if needs_order_warning(&sc.expect, sc.order, &sql) {
                    diags.push(
                        Diagnostic::warn(
                            codes::W_UNORDERED_COMPARE,
                            "several rows expected but the query has no ORDER BY; rows are compared as a multiset",
                        )
                        .with_scenario(&sc.id)
                        .with_fix_step("add an ORDER BY clause, or set `order: unordered` to make the intent explicit"),
                    );
                }
                rendered.push((sc.id.as_str(), sql));
            }
            Err(e) => diags.push(Diagnostic::error(codes::E_TEMPLATE, e.to_string()).with_scenario(&sc.id)),
        }
    }

    for (ident, table) in cfg.tables.iter() {
        if !used.contains(ident) {
            diags.push(Diagnostic::warn(
                codes::W_UNUSED_TABLE,
                format!("table identifier '{}' ({}) is never referenced", ident, table),
            ));
        }
    }

    let path = cfg.snapshot.source_path();
    if !path.is_file() {
        diags.push(
            Diagnostic::error(
                codes::E_SNAPSHOT_MISSING,
                format!(
                    "snapshot for stage '{}' not found: {}",
                    cfg.snapshot.from,
                    path.display()
                ),
            )
            .with_fix_step("check snapshot.dir and snapshot.file, or build the snapshot for this stage"),
        );
    } else if opts.check_queries {
        match SqliteSnapshot::open_path(&path, &cfg.snapshot.label()) {
            Ok(db) => {
                for (id, sql) in &rendered {
                    if let Err(e) = db.prepare_check(sql) {
                        diags.push(
                            Diagnostic::error(codes::E_QUERY_INVALID, e.to_string()).with_scenario(id),
                        );
                    }
                }
            }
            Err(e) => diags.push(Diagnostic::error(codes::E_SNAPSHOT_OPEN, e.to_string())),
        }
    }

    ValidateReport { diagnostics: diags }
}

fn needs_order_warning(expect: &Expectation, order: OrderMode, sql: &str) -> bool {
    order == OrderMode::Auto
        && expect.rows().len() > 1
        && Comparison::resolve(order, sql) == Comparison::Multiset
}
