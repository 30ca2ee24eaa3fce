use crate::value::Row;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub hex: String,
    pub components: Vec<String>,
}

pub fn sha256_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    hex::encode(h.finalize())
}

/// Digest of an observed result set; row maps serialize with sorted keys.
pub fn rows_digest(rows: &[Row]) -> String {
    sha256_hex(&serde_json::to_string(rows).unwrap_or_default())
}

pub struct Context<'a> {
    pub suite: &'a str,
    pub scenario_id: &'a str,
    pub query: &'a str,
    pub expected_canonical: &'a str,
    pub snapshot_label: &'a str,
}

/// Identifies a scenario definition; changes whenever the query, the
/// expectation or the snapshot it runs against changes.
pub fn compute(ctx: Context<'_>) -> Fingerprint {
    let parts = vec![
        format!("suite={}", ctx.suite),
        format!("scenario_id={}", ctx.scenario_id),
        format!("query={}", ctx.query),
        format!("expected={}", ctx.expected_canonical),
        format!("snapshot={}", ctx.snapshot_label),
        format!("sqlcheck_version={}", env!("CARGO_PKG_VERSION")),
    ];

    let hex = sha256_hex(&parts.join("\n"));
    Fingerprint {
        hex,
        components: parts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn ctx(query: &str) -> Context<'_> {
        Context {
            suite: "shopify",
            scenario_id: "free_plan_count",
            query,
            expected_canonical: r#"[{"count":1112}]"#,
            snapshot_label: "03->04",
        }
    }

    #[test]
    fn test_fingerprint_tracks_query_text() {
        let a = compute(ctx("SELECT 1"));
        let b = compute(ctx("SELECT 1"));
        let c = compute(ctx("SELECT 2"));
        assert_eq!(a.hex, b.hex);
        assert_ne!(a.hex, c.hex);
        assert_eq!(a.hex.len(), 64);
        assert!(a.components.contains(&"snapshot=03->04".to_string()));
    }

    #[test]
    fn test_rows_digest_is_order_sensitive() {
        let a = row! { "genre" => "Drama", "n" => 1 };
        let b = row! { "genre" => "Crime", "n" => 2 };
        assert_eq!(
            rows_digest(&[a.clone(), b.clone()]),
            rows_digest(&[a.clone(), b.clone()])
        );
        assert_ne!(rows_digest(&[a.clone(), b.clone()]), rows_digest(&[b, a]));
    }
}
