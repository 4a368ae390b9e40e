//! Doctor command logic
//!
//! Checks that the host can run the pipeline: build tools on PATH, an
//! activated Emscripten SDK, the loader scripts, and every pinned source
//! tree checked out at its pinned revision.

use std::path::Path;

use crate::core::build_env::HostToolchain;
use crate::core::config::ProjectLayout;
use crate::core::dependency::{PinnedSource, PINNED_SOURCES};
use crate::infra::{git, toolchain};

/// Result of a single check
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckResult {
    /// What was checked
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Version or revision, if known
    pub version: Option<String>,
    /// Error message if the check failed
    pub error: Option<String>,
    /// How to fix it
    pub suggestion: Option<String>,
    /// Whether a failure blocks the build
    pub required: bool,
}

impl CheckResult {
    /// Create a passing check result
    pub fn pass(name: &str, version: Option<String>, required: bool) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            version,
            error: None,
            suggestion: None,
            required,
        }
    }

    /// Create a failing check result
    pub fn fail(name: &str, error: &str, suggestion: Option<&str>, required: bool) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            version: None,
            error: Some(error.to_string()),
            suggestion: suggestion.map(String::from),
            required,
        }
    }
}

/// Overall doctor report
#[derive(Debug, Default, serde::Serialize)]
pub struct DoctorReport {
    /// Individual check results
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a check result
    pub fn add_check(&mut self, result: CheckResult) {
        self.checks.push(result);
    }

    /// Check if all checks passed (including optional)
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Count passed checks
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Get all failed required checks
    pub fn failed_required(&self) -> Vec<&CheckResult> {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .collect()
    }
}

/// Version reported by `<tool> --version`
pub fn tool_version(tool: &Path) -> Option<String> {
    std::process::Command::new(tool)
        .arg("--version")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| {
            let combined = format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            extract_version(&combined)
        })
}

/// Extract a version string from command output
fn extract_version(output: &str) -> Option<String> {
    let version_regex = regex::Regex::new(r"v?(\d+\.\d+(?:\.\d+)?(?:-\w+)?)").ok()?;
    version_regex
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Check a host tool is on PATH
pub fn check_tool(tool: &str) -> CheckResult {
    match toolchain::locate(tool) {
        Ok(path) => CheckResult::pass(tool, tool_version(&path), true),
        Err(e) => CheckResult::fail(
            tool,
            &e.to_string(),
            Some("Install it, or activate the Emscripten SDK for the em* wrappers"),
            true,
        ),
    }
}

/// Check the SDK is activated and ships the CMake toolchain descriptor
pub fn check_emsdk(host: Result<HostToolchain, String>) -> CheckResult {
    const NAME: &str = "Emscripten SDK";
    match host {
        Ok(host) if host.toolchain_file().is_file() => {
            CheckResult::pass(NAME, Some(host.emsdk().display().to_string()), true)
        }
        Ok(host) => CheckResult::fail(
            NAME,
            &format!(
                "Toolchain descriptor not found at {}",
                host.toolchain_file().display()
            ),
            Some("Check that EMSDK points at an installed SDK"),
            true,
        ),
        Err(error) => CheckResult::fail(
            NAME,
            &error,
            Some("Run `source <emsdk>/emsdk_env.sh`"),
            true,
        ),
    }
}

/// Check the loader scripts the link embeds
pub fn check_scripts(layout: &ProjectLayout) -> CheckResult {
    const NAME: &str = "Loader scripts";
    let missing: Vec<String> = ["pre.js", "post.js"]
        .iter()
        .map(|name| layout.js_dir.join(name))
        .filter(|path| !path.is_file())
        .map(|path| path.display().to_string())
        .collect();
    if missing.is_empty() {
        CheckResult::pass(NAME, None, true)
    } else {
        CheckResult::fail(NAME, &format!("Missing {}", missing.join(", ")), None, true)
    }
}

/// Check one pinned source tree
///
/// A missing tree or a non-checkout blocks the build; a checkout sitting at
/// another commit only warns.
pub fn check_source(layout: &ProjectLayout, pin: &PinnedSource) -> CheckResult {
    let path = layout.source_dir(pin.name);
    let fetch_hint = format!("git clone {} {}", pin.repository, path.display());

    if !path.is_dir() {
        return CheckResult::fail(
            pin.name,
            &format!("Source tree not found at {}", path.display()),
            Some(&fetch_hint),
            true,
        );
    }
    if !git::is_checkout(&path) {
        return CheckResult::fail(
            pin.name,
            &format!("{} is not a git checkout", path.display()),
            Some(&fetch_hint),
            true,
        );
    }

    match git::head_revision(&path) {
        Ok(head) if head == pin.revision => CheckResult::pass(pin.name, Some(short(&head)), true),
        Ok(head) => CheckResult::fail(
            pin.name,
            &format!("HEAD is {} but {} is pinned", short(&head), short(pin.revision)),
            Some(&format!("git -C {} checkout {}", path.display(), pin.revision)),
            false,
        ),
        Err(e) => CheckResult::fail(pin.name, &e.to_string(), None, false),
    }
}

fn short(revision: &str) -> String {
    revision.chars().take(12).collect()
}

/// Run all doctor checks
pub fn run_doctor(layout: &ProjectLayout) -> DoctorReport {
    let mut report = DoctorReport::new();

    for tool in toolchain::REQUIRED_TOOLS {
        report.add_check(check_tool(tool));
    }
    report.add_check(check_emsdk(
        HostToolchain::from_env().map_err(|e| e.to_string()),
    ));
    report.add_check(check_scripts(layout));
    for pin in PINNED_SOURCES {
        report.add_check(check_source(layout, pin));
    }

    report
}
