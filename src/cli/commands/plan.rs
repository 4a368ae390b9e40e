//! CLI implementation for `magick-forge plan`
//!
//! Prints what `build` would run, in order, without touching the tree.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::commands::build::{host_or_placeholder, Project};
use crate::cli::output::status;
use crate::core::orchestrator::BuildPlan;

/// Execute the plan command
pub fn execute(project_dir: &Path, jobs: Option<usize>, json: bool) -> Result<()> {
    let project = Project::load(project_dir, jobs, &host_or_placeholder())?;
    let plan = project.orchestrator().plan();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("Failed to encode plan")?
        );
    } else {
        print!("{}", render(&plan));
    }
    Ok(())
}

/// Human-readable plan
fn render(plan: &BuildPlan) -> String {
    let mut out = format!(
        "{} {} profile, {} jobs, prefix {}\n",
        status::INFO,
        plan.profile,
        plan.jobs,
        plan.prefix.display()
    );

    for (index, recipe) in plan.recipes.iter().enumerate() {
        out.push_str(&format!(
            "\n[{}/{}] {} ({}) in {}\n",
            index + 1,
            plan.recipes.len(),
            recipe.name,
            recipe.strategy,
            recipe.source_dir.display()
        ));
        out.push_str(&format!("    reset: {}\n", recipe.reset));
        for planned in &recipe.steps {
            out.push_str(&format!("    {}: {}\n", planned.phase, planned.step));
        }
    }

    out.push_str(&format!("\nlink: {}\n", plan.link.command_line()));
    out
}
