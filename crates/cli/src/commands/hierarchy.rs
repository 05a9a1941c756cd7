use super::{Session, render};
use crate::cli::OutputFormat;
use crate::errors::CliResult;
use minions_core::ParentOption;
use serde_json::json;
use std::fmt::Write;

pub async fn parents(
    session: &Session,
    task: &str,
    search: &str,
    format: OutputFormat,
) -> CliResult<String> {
    let options = session.manager().available_parents(task, search).await?;
    render(format, options.as_slice(), parents_text)
}

fn parents_text(options: &[ParentOption]) -> String {
    if options.is_empty() {
        return "No available parents".to_string();
    }
    let mut out = String::new();
    for option in options {
        let _ = write!(
            out,
            "{}\t{}\t{}\t{} children",
            option.id, option.label, option.status, option.children
        );
        if option.has_parent {
            out.push_str("\tnested");
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

pub async fn set_parent(
    session: &Session,
    task: &str,
    parent: Option<&str>,
    format: OutputFormat,
) -> CliResult<String> {
    session.manager().set_parent(task, parent).await?;
    let value = json!({ "task": task, "parent": parent });
    render(format, &value, |_| match parent {
        Some(parent) => format!("{task} moved under {parent}"),
        None => format!("{task} moved to the top level"),
    })
}
