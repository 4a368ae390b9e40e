//! CLI command for `magick-forge doctor`
//!
//! Checks host tools, the SDK, loader scripts and source pins, and reports
//! issues with suggestions.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::output::{is_quiet, print_detail, print_info, print_success, print_warning, status};
use crate::core::config::ForgeConfig;
use crate::core::doctor::run_doctor;
use crate::error::ForgeError;

/// Execute the doctor command
pub fn execute(project_dir: &Path, json: bool) -> Result<()> {
    let config = ForgeConfig::load(project_dir).map_err(ForgeError::from)?;
    let report = run_doctor(&config.layout(project_dir));
    let failed_required = report.failed_required();

    if json {
        let json_result = serde_json::json!({
            "status": if report.all_passed() { "success" } else if failed_required.is_empty() { "warning" } else { "error" },
            "checks": report.checks,
            "passed_count": report.passed_count(),
            "total_count": report.checks.len()
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json_result).context("Failed to encode report")?
        );
    } else if is_quiet() {
        for check in &failed_required {
            eprintln!("{} Missing required: {}", status::ERROR, check.name);
        }
    } else {
        print_info("Checking build host...");
        println!();

        for check in &report.checks {
            let version_str = check
                .version
                .as_ref()
                .map(|v| format!(" ({v})"))
                .unwrap_or_default();
            let required_str = if check.required { "" } else { " [optional]" };

            if check.passed {
                println!("  {} {}{version_str}{required_str}", status::SUCCESS, check.name);
            } else {
                println!("  {} {}{required_str}", status::ERROR, check.name);
                if let Some(error) = &check.error {
                    print_detail(&format!("Error: {error}"));
                }
                if let Some(suggestion) = &check.suggestion {
                    print_detail(&format!("Suggestion: {suggestion}"));
                }
            }
        }

        println!();
        let passed = report.passed_count();
        let total = report.checks.len();
        if report.all_passed() {
            print_success(&format!("All checks passed ({passed}/{total})"));
        } else if failed_required.is_empty() {
            print_warning(&format!("{passed}/{total} checks passed (optional checks failed)"));
        } else {
            println!("{} {passed}/{total} checks passed", status::ERROR);
        }
    }

    if !failed_required.is_empty() {
        anyhow::bail!(
            "{} required check(s) failed. Run 'magick-forge doctor' for details.",
            failed_required.len()
        );
    }
    Ok(())
}
