use super::args::*;
use sqlcheck_core::config::{load_config, write_sample_config};
use sqlcheck_core::engine::{RunPolicy, Runner};
use sqlcheck_core::model::ScenarioResult;
use sqlcheck_core::report::{console, json, junit};
use sqlcheck_core::storage::Store;
use std::path::Path;

pub mod history;
pub mod validate;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const TEST_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Init(args) => cmd_init(args),
        Command::Run(args) => cmd_run(args).await,
        Command::Validate(args) => validate::run(args),
        Command::History(args) => history::run(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if args.config.exists() {
        eprintln!("note: {} already exists", args.config.display());
        return Ok(exit_codes::OK);
    }
    ensure_parent_dir(&args.config)?;
    write_sample_config(&args.config)?;
    eprintln!("created {}", args.config.display());
    Ok(exit_codes::OK)
}

async fn cmd_run(args: RunArgs) -> anyhow::Result<i32> {
    let cfg = match load_config(&args.config, args.strict) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let policy = RunPolicy {
        filter: args.filter,
        tags: args.tags,
        repeat: args.repeat,
    };
    if !cfg.scenarios.iter().any(|sc| policy.selects(sc)) {
        eprintln!("config error: no scenario in '{}' matches the given --filter/--tag", cfg.suite);
        return Ok(exit_codes::CONFIG_ERROR);
    }

    tracing::info!(
        event = "run_start",
        suite = %cfg.suite,
        snapshot = %cfg.snapshot.label(),
        history = %args.db.display()
    );
    ensure_parent_dir(&args.db)?;
    let store = Store::open(&args.db)?;
    store.init_schema()?;
    let mut runner = Runner::new(store);
    runner.policy = policy;

    let artifacts = runner.run_suite(&cfg).await?;

    ensure_parent_dir(&args.json)?;
    json::write_json(&artifacts, &args.json)?;
    if let Some(path) = &args.junit {
        ensure_parent_dir(path)?;
        junit::write_junit(&artifacts.suite, &artifacts.results, path)?;
    }
    console::print_summary(&artifacts.suite, &artifacts.results);

    Ok(decide_exit_code(&artifacts.results))
}

fn decide_exit_code(results: &[ScenarioResult]) -> i32 {
    if results.iter().any(ScenarioResult::is_failure) {
        exit_codes::TEST_FAILED
    } else {
        exit_codes::OK
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlcheck_core::model::ScenarioStatus;

    fn result(status: ScenarioStatus) -> ScenarioResult {
        ScenarioResult {
            scenario_id: "s".into(),
            name: String::new(),
            status,
            message: String::new(),
            error_kind: None,
            query: String::new(),
            expected: vec![],
            actual: None,
            duration_ms: None,
            fingerprint: None,
            rows_digest: None,
        }
    }

    #[test]
    fn test_exit_code_policy() {
        assert_eq!(decide_exit_code(&[]), exit_codes::OK);
        assert_eq!(
            decide_exit_code(&[result(ScenarioStatus::Pass), result(ScenarioStatus::Pass)]),
            exit_codes::OK
        );
        assert_eq!(
            decide_exit_code(&[result(ScenarioStatus::Pass), result(ScenarioStatus::Fail)]),
            exit_codes::TEST_FAILED
        );
        assert_eq!(
            decide_exit_code(&[result(ScenarioStatus::Error)]),
            exit_codes::TEST_FAILED
        );
    }
}
