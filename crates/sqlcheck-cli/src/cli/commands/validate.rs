use sqlcheck_core::config::load_config;
use sqlcheck_core::validate::{codes, validate, Diagnostic, ValidateOptions, ValidateReport};
use serde_json::json;

use super::exit_codes;
use crate::cli::args::ValidateArgs;

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let cfg = match load_config(&args.config, true) {
        Ok(c) => c,
        Err(e) => {
            // nothing to validate without a config; report the load failure itself
            let diag = Diagnostic::error(codes::E_CFG_PARSE, format!("failed to load config: {}", e))
                .with_fix_step("run `sqlcheck init` for a sample config");
            print_report(
                &ValidateReport {
                    diagnostics: vec![diag],
                },
                &args.format,
            )?;
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let opts = ValidateOptions {
        check_queries: args.check_queries,
    };
    let report = validate(&cfg, &opts);
    print_report(&report, &args.format)?;

    // warnings alone do not fail validation
    if report.has_errors() {
        Ok(exit_codes::CONFIG_ERROR)
    } else {
        Ok(exit_codes::OK)
    }
}

fn print_report(report: &ValidateReport, format: &str) -> anyhow::Result<()> {
    let errors: Vec<&Diagnostic> = report.diagnostics.iter().filter(|d| d.is_error()).collect();
    let warnings: Vec<&Diagnostic> = report.diagnostics.iter().filter(|d| !d.is_error()).collect();

    if format == "json" {
        let output = json!({
            "schema_version": 1,
            "ok": errors.is_empty(),
            "errors": errors,
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let plural = |n: usize| if n == 1 { "" } else { "s" };
    if !errors.is_empty() {
        eprintln!(
            "✖ Validation failed ({} error{}, {} warning{})",
            errors.len(),
            plural(errors.len()),
            warnings.len(),
            plural(warnings.len())
        );
    } else if !warnings.is_empty() {
        eprintln!(
            "⚠️  Validation passed with warnings ({} warning{})",
            warnings.len(),
            plural(warnings.len())
        );
    } else {
        eprintln!("✔ Validation OK");
    }

    for d in &report.diagnostics {
        eprintln!("{}", d);
        for step in &d.fix_steps {
            eprintln!("    fix: {}", step);
        }
    }
    Ok(())
}
