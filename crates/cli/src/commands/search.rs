use super::{Session, render};
use crate::cli::OutputFormat;
use crate::errors::CliResult;
use minions_core::{Error, TaskStore, search_minions};
use serde::Serialize;
use std::fmt::Write;

/// One search hit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub version: String,
}

pub async fn execute(session: &Session, term: &str, format: OutputFormat) -> CliResult<String> {
    let minions = session
        .manager()
        .store()
        .list()
        .await
        .map_err(|e| Error::store("list", "*", e))?;
    let hits: Vec<SearchHit> = search_minions(&minions, term)
        .into_iter()
        .map(|m| SearchHit {
            id: m.id.clone(),
            title: m.title.clone(),
            version: m.version.to_string(),
        })
        .collect();
    tracing::debug!(term, hits = hits.len(), "Search finished");

    render(format, hits.as_slice(), |hits| {
        if hits.is_empty() {
            return format!("No minions match '{term}'");
        }
        let mut out = String::new();
        for hit in hits {
            let _ = writeln!(out, "{}\t{}\t{}", hit.id, hit.title, hit.version);
        }
        out.trim_end().to_string()
    })
}
