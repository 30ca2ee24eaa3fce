use sqlcheck_core::storage::Store;

use super::exit_codes;
use crate::cli::args::HistoryArgs;

pub fn run(args: HistoryArgs) -> anyhow::Result<i32> {
    // opening would create an empty database
    if !args.db.exists() {
        eprintln!("no run history at {}", args.db.display());
        return Ok(exit_codes::OK);
    }

    let store = Store::open(&args.db)?;
    store.init_schema()?;
    let entries = store.fetch_results_for_last_n_runs(&args.suite, args.last)?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(exit_codes::OK);
    }

    if entries.is_empty() {
        eprintln!("no runs recorded for suite '{}'", args.suite);
        return Ok(exit_codes::OK);
    }

    let mut current = None;
    for e in &entries {
        if current != Some(e.run_id) {
            println!("run #{}  {}  snapshot {}", e.run_id, e.started_at, e.snapshot);
            current = Some(e.run_id);
        }
        let duration = e
            .duration_ms
            .map(|d| format!("{}ms", d))
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<5} {:<32} {:>8}  {}",
            e.status.as_str(),
            e.scenario_id,
            duration,
            e.message
        );
    }

    let stats = store.stats_best_effort()?;
    let count = |n: Option<u64>| n.map_or_else(|| "?".to_string(), |n| n.to_string());
    print!(
        "\nhistory: {} run(s), {} result(s) stored",
        count(stats.runs),
        count(stats.results)
    );
    match (stats.last_run_id, stats.last_run_at) {
        (Some(id), Some(at)) => println!("; last run #{} at {}", id, at),
        _ => println!(),
    }
    Ok(exit_codes::OK)
}
