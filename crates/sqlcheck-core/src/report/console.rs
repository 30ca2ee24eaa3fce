use crate::model::{ScenarioResult, ScenarioStatus};
use crate::value::render_rows;
use std::fmt::Write;

pub fn print_summary(suite: &str, results: &[ScenarioResult]) {
    eprint!("{}", render_summary(suite, results));
}

pub fn render_summary(suite: &str, results: &[ScenarioResult]) -> String {
    let mut out = String::new();
    let mut pass = 0;
    let mut fail = 0;
    let mut error = 0;

    let _ = writeln!(out, "\nRunning {} scenarios from {}...", results.len(), suite);

    for r in results {
        let duration = r
            .duration_ms
            .map(|d| format!("({:.1}s)", d as f64 / 1000.0))
            .unwrap_or_default();

        match r.status {
            ScenarioStatus::Pass => {
                pass += 1;
                let _ = writeln!(out, "✅ {:<32} {}", r.scenario_id, duration);
            }
            ScenarioStatus::Fail => {
                fail += 1;
                let _ = writeln!(out, "❌ {:<32} {}  {}", r.scenario_id, r.message, duration);
                write_diagnosis(&mut out, r);
            }
            ScenarioStatus::Error => {
                error += 1;
                let _ = writeln!(out, "💥 {:<32} ERROR: {}", r.scenario_id, r.message);
                write_diagnosis(&mut out, r);
            }
        }
    }

    let _ = writeln!(out, "\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let _ = writeln!(
        out,
        "Summary: {} passed, {} failed, {} error",
        pass, fail, error
    );
    out
}

fn write_diagnosis(out: &mut String, r: &ScenarioResult) {
    if !r.name.is_empty() {
        let _ = writeln!(out, "      Scenario: {}", r.name);
    }
    if !r.query.is_empty() {
        let query = r.query.split_whitespace().collect::<Vec<_>>().join(" ");
        let _ = writeln!(out, "      Query:    {}", query);
    }
    let _ = writeln!(out, "      Expected: {}", render_rows(&r.expected));
    match &r.actual {
        Some(actual) => {
            let _ = writeln!(out, "      Actual:   {}", render_rows(actual));
        }
        None => {
            let _ = writeln!(out, "      Actual:   (no rows observed)");
        }
    }
}
