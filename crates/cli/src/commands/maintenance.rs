//! Audit, reconciliation and deletion.

use super::{Session, render};
use crate::cli::OutputFormat;
use crate::errors::{CliError, CliResult};
use minions_core::{AuditReport, Error, ReconciliationPlan, TaskStore, plan_reconciliation};
use serde_json::json;
use std::fmt::Write;

/// Audit the snapshot. Findings are printed and then reported as
/// [`CliError::CheckFailed`] so the process exits non-zero.
pub async fn check(session: &Session, format: OutputFormat) -> CliResult<String> {
    let report = session.manager().audit().await?;
    if report.is_clean() {
        return render(format, &report, |_| "No problems found".to_string());
    }

    let findings = report.finding_count();
    let output = render(format, &report, audit_text)?;
    crate::print_output(&output);
    Err(CliError::CheckFailed { findings })
}

fn pairs(out: &mut String, heading: &str, entries: &[(String, String)], arrow: &str) {
    for (from, to) in entries {
        let _ = writeln!(out, "{heading}: {from} {arrow} {to}");
    }
}

fn audit_text(report: &AuditReport) -> String {
    let mut out = String::new();
    for id in &report.self_dependencies {
        let _ = writeln!(out, "self dependency: {id}");
    }
    pairs(&mut out, "dangling", &report.dangling, "->");
    pairs(
        &mut out,
        "missing back reference",
        &report.missing_back_references,
        "->",
    );
    pairs(
        &mut out,
        "orphaned back reference",
        &report.orphaned_back_references,
        "<-",
    );
    for cycle in &report.cycles {
        let _ = writeln!(out, "cycle: {}", cycle.join(" -> "));
    }
    pairs(
        &mut out,
        "hierarchy mismatch",
        &report.hierarchy_mismatches,
        "/",
    );
    out.trim_end().to_string()
}

pub async fn reconcile(session: &Session, dry_run: bool, format: OutputFormat) -> CliResult<String> {
    if dry_run {
        let minions = session
            .manager()
            .store()
            .list()
            .await
            .map_err(|e| Error::store("list", "*", e))?;
        let plan = plan_reconciliation(&minions);
        return render(format, &plan, plan_text);
    }

    let report = session.manager().reconcile().await?;
    render(format, &report, |r| {
        if r.updated.is_empty() {
            "Back references already consistent".to_string()
        } else {
            format!("Updated {}", r.updated.join(", "))
        }
    })
}

fn plan_text(plan: &ReconciliationPlan) -> String {
    if plan.is_empty() {
        return "Back references already consistent".to_string();
    }
    let mut out = String::new();
    for change in &plan.changes {
        let mut fields = Vec::new();
        if change.dependencies.is_some() {
            fields.push("dependencies");
        }
        if change.dependent_on.is_some() {
            fields.push("dependentOn");
        }
        if change.children.is_some() {
            fields.push("children");
        }
        if change.clear_parent {
            fields.push("parentId");
        }
        let _ = writeln!(out, "{}: {}", change.minion_id, fields.join(", "));
    }
    out.trim_end().to_string()
}

pub async fn delete(session: &Session, task: &str, format: OutputFormat) -> CliResult<String> {
    session.manager().delete_minion(task).await?;
    render(format, &json!({ "deleted": task }), |_| format!("Deleted {task}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::session_with;
    use minions_core::{Dependency, Minion};

    fn inconsistent() -> Vec<Minion> {
        let mut a = Minion::new("a", "A");
        a.dependencies.push(Dependency::pinned("b", "a", "0.0.0"));
        vec![a, Minion::new("b", "B")]
    }

    #[tokio::test]
    async fn test_check_clean() {
        let (_dir, session) = session_with(&[Minion::new("a", "A")]);
        assert_eq!(
            check(&session, OutputFormat::Text).await.unwrap(),
            "No problems found"
        );
    }

    #[tokio::test]
    async fn test_check_reports_findings() {
        let (_dir, session) = session_with(&inconsistent());
        let err = check(&session, OutputFormat::Text).await.unwrap_err();
        assert!(matches!(err, CliError::CheckFailed { findings: 1 }));
        assert_eq!(
            audit_text(&session.manager().audit().await.unwrap()),
            "missing back reference: a -> b"
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let (_dir, session) = session_with(&inconsistent());

        let text = reconcile(&session, true, OutputFormat::Text).await.unwrap();
        assert_eq!(text, "b: dependentOn");
        assert!(!session.manager().audit().await.unwrap().is_clean());

        let text = reconcile(&session, false, OutputFormat::Text).await.unwrap();
        assert_eq!(text, "Updated b");
        assert!(session.manager().audit().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, session) = session_with(&[Minion::new("a", "A"), Minion::new("b", "B")]);
        session.manager().add_dependency("a", "b", 10).await.unwrap();

        assert_eq!(delete(&session, "b", OutputFormat::Text).await.unwrap(), "Deleted b");
        let a = session.manager().store().get("a").await.unwrap().unwrap();
        assert!(a.dependencies.is_empty());
        assert!(delete(&session, "b", OutputFormat::Text).await.is_err());
    }
}
