use crate::model::OrderMode;
use crate::sqltext::blank_inert;
use crate::value::{render_rows, Row};
use regex::Regex;
use std::sync::OnceLock;

/// How observed rows are matched against the expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Same rows, same order.
    Ordered,
    /// Same rows with the same multiplicities, any order.
    Multiset,
}

impl Comparison {
    pub fn resolve(mode: OrderMode, sql: &str) -> Self {
        match mode {
            OrderMode::Strict => Comparison::Ordered,
            OrderMode::Unordered => Comparison::Multiset,
            OrderMode::Auto if has_top_level_order_by(sql) => Comparison::Ordered,
            OrderMode::Auto => Comparison::Multiset,
        }
    }
}

/// True when the outermost statement carries an `ORDER BY`.
///
/// String literals, quoted identifiers, comments and parenthesised
/// subexpressions (subqueries, window specs) are ignored.
pub fn has_top_level_order_by(sql: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\border\s+by\b").expect("static regex"));
    re.is_match(&top_level_text(sql))
}

fn top_level_text(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut depth = 0usize;

    for c in blank_inert(sql).chars() {
        match c {
            '(' => {
                depth += 1;
                out.push(' ');
            }
            ')' => {
                depth = depth.saturating_sub(1);
                out.push(' ');
            }
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Returns a human-readable description of the first difference, or `None`
/// when `actual` satisfies `expected`.
pub fn diff_rows(expected: &[Row], actual: &[Row], cmp: Comparison) -> Option<String> {
    match cmp {
        Comparison::Ordered => diff_ordered(expected, actual),
        Comparison::Multiset => diff_multiset(expected, actual),
    }
}

fn diff_ordered(expected: &[Row], actual: &[Row]) -> Option<String> {
    for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
        if e != a {
            return Some(format!(
                "row {} differs{}: expected {} but got {}",
                i,
                first_cell_diff(e, a),
                render_rows(std::slice::from_ref(e)),
                render_rows(std::slice::from_ref(a))
            ));
        }
    }
    if expected.len() != actual.len() {
        return Some(format!(
            "expected {} row(s), got {}",
            expected.len(),
            actual.len()
        ));
    }
    None
}

fn first_cell_diff(expected: &Row, actual: &Row) -> String {
    for (col, want) in expected {
        match actual.get(col) {
            None => return format!(" (column '{}' missing)", col),
            Some(got) if got != want => {
                return format!(
                    " at '{}' ({} {} vs {} {})",
                    col,
                    want.type_name(),
                    want,
                    got.type_name(),
                    got
                )
            }
            Some(_) => {}
        }
    }
    match actual.keys().find(|k| !expected.contains_key(*k)) {
        Some(extra) => format!(" (unexpected column '{}')", extra),
        None => String::new(),
    }
}

fn diff_multiset(expected: &[Row], actual: &[Row]) -> Option<String> {
    let mut used = vec![false; actual.len()];
    let mut missing = Vec::new();

    for e in expected {
        match (0..actual.len()).find(|&j| !used[j] && actual[j] == *e) {
            Some(j) => used[j] = true,
            None => missing.push(e.clone()),
        }
    }
    let unexpected: Vec<Row> = actual
        .iter()
        .zip(&used)
        .filter(|(_, u)| !**u)
        .map(|(a, _)| a.clone())
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing {}", render_rows(&missing)));
    }
    if !unexpected.is_empty() {
        parts.push(format!("unexpected {}", render_rows(&unexpected)));
    }
    Some(format!("unordered comparison failed: {}", parts.join("; ")))
}
