use super::{Session, render};
use crate::cli::OutputFormat;
use crate::errors::CliResult;
use minions_core::{Dependency, DependencyDrift, DependencyOption};
use serde_json::json;
use std::fmt::Write;

pub async fn add(
    session: &Session,
    owner: &str,
    dependency: &str,
    max: Option<usize>,
    format: OutputFormat,
) -> CliResult<String> {
    let manager = session.manager();
    let max = max.unwrap_or_else(|| manager.max_dependencies());
    let pinned = manager.add_dependency(owner, dependency, max).await?;
    render(format, &pinned, |d| {
        format!("{} now depends on {} at {}", d.minion_id, d.id, d.version)
    })
}

pub async fn remove(
    session: &Session,
    owner: &str,
    dependency: &str,
    format: OutputFormat,
) -> CliResult<String> {
    let removed = session.manager().remove_dependency(owner, dependency).await?;
    let value = json!({ "owner": owner, "dependency": dependency, "removed": removed });
    render(format, &value, |_| {
        if removed {
            format!("{owner} no longer depends on {dependency}")
        } else {
            format!("{owner} did not depend on {dependency}")
        }
    })
}

pub async fn pin(
    session: &Session,
    owner: &str,
    dependency: &str,
    version: &str,
    format: OutputFormat,
) -> CliResult<String> {
    let pinned: Dependency = session
        .manager()
        .change_version(owner, dependency, version)
        .await?;
    render(format, &pinned, |d| {
        format!("{} -> {} pinned at {} (live {})", d.minion_id, d.id, d.version, d.current_version)
    })
}

pub async fn candidates(
    session: &Session,
    owner: &str,
    search: &str,
    format: OutputFormat,
) -> CliResult<String> {
    let options = session.manager().available_dependencies(owner, search).await?;
    render(format, options.as_slice(), candidates_text)
}

fn candidates_text(options: &[DependencyOption]) -> String {
    if options.is_empty() {
        return "No available dependencies".to_string();
    }
    let mut out = String::new();
    for option in options {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            option.id, option.label, option.version, option.status, option.priority
        );
    }
    out.trim_end().to_string()
}

pub async fn outdated(
    session: &Session,
    owner: &str,
    only_outdated: bool,
    format: OutputFormat,
) -> CliResult<String> {
    let mut report = session.manager().drift(owner).await?;
    if only_outdated {
        report.retain(|d| d.is_outdated);
    }
    render(format, report.as_slice(), drift_text)
}

fn drift_text(report: &[DependencyDrift]) -> String {
    if report.is_empty() {
        return "No dependencies to report".to_string();
    }
    let mut out = String::new();
    for drift in report {
        let _ = write!(out, "{}\t{}\tpinned {}\tlive {}", drift.id, drift.title, drift.pinned, drift.live);
        if drift.is_outdated {
            let _ = write!(out, "\toutdated: {}", drift.diff);
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}
