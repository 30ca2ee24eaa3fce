use crate::model::{ScenarioResult, ScenarioStatus};
use crate::value::render_rows;
use std::path::Path;

pub fn write_junit(suite: &str, results: &[ScenarioResult], out: &Path) -> anyhow::Result<()> {
    std::fs::write(out, render_junit(suite, results))?;
    Ok(())
}

pub fn render_junit(suite: &str, results: &[ScenarioResult]) -> String {
    let failures = results
        .iter()
        .filter(|r| r.status == ScenarioStatus::Fail)
        .count();
    let errors = results
        .iter()
        .filter(|r| r.status == ScenarioStatus::Error)
        .count();

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<testsuite name="{}" tests="{}" failures="{}" errors="{}">"#,
        escape(suite),
        results.len(),
        failures,
        errors
    ));
    xml.push('\n');

    for r in results {
        let secs = r.duration_ms.unwrap_or(0) as f64 / 1000.0;
        xml.push_str(&format!(
            r#"  <testcase name="{}" classname="{}" time="{:.3}">"#,
            escape(&r.scenario_id),
            escape(suite),
            secs
        ));
        match r.status {
            ScenarioStatus::Pass => {}
            ScenarioStatus::Fail => xml.push_str(&format!(
                r#"<failure message="{}">{}</failure>"#,
                escape(&r.message),
                escape(&detail(r))
            )),
            ScenarioStatus::Error => xml.push_str(&format!(
                r#"<error message="{}">{}</error>"#,
                escape(&r.message),
                escape(&detail(r))
            )),
        }
        xml.push_str("</testcase>\n");
    }

    xml.push_str("</testsuite>\n");
    xml
}

fn detail(r: &ScenarioResult) -> String {
    let actual = r
        .actual
        .as_deref()
        .map(render_rows)
        .unwrap_or_else(|| "(none)".into());
    format!(
        "query: {}\nexpected: {}\nactual: {}",
        r.query,
        render_rows(&r.expected),
        actual
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
