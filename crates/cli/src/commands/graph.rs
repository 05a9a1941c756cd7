use super::{Session, render};
use crate::cli::OutputFormat;
use crate::errors::CliResult;
use minions_task_graph::{EdgeKind, RelationshipGraph};
use std::fmt::Write;

pub async fn execute(session: &Session, root: &str, format: OutputFormat) -> CliResult<String> {
    let graph = session
        .manager()
        .relationships(root, &session.config().layout)
        .await?;
    tracing::debug!(
        root,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "Relationship graph built"
    );
    render(format, &graph, |g| render_text(root, g))
}

const fn edge_label(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Dependency => "depends on",
        EdgeKind::ParentChild => "parent of",
        EdgeKind::ParentDependency => "depends on (hierarchy)",
    }
}

fn render_text(root: &str, graph: &RelationshipGraph) -> String {
    if graph.nodes.is_empty() {
        return format!("No relationships for '{root}'");
    }
    let mut out = String::from("Nodes:\n");
    for node in &graph.nodes {
        let _ = writeln!(out, "  {} ({}, {})", node.id, node.position.x, node.position.y);
    }
    if !graph.edges.is_empty() {
        out.push_str("Edges:\n");
        for edge in &graph.edges {
            let _ = writeln!(out, "  {} {} {}", edge.source, edge_label(edge.kind), edge.target);
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::session_with;
    use minions_core::Minion;

    #[tokio::test]
    async fn test_text_output() {
        let (_dir, session) = session_with(&[
            Minion::new("root", "Root").with_children(&["kid"]),
            Minion::new("kid", "Kid").with_parent("root"),
            Minion::new("dep", "Dep"),
        ]);
        session.manager().add_dependency("root", "dep", 10).await.unwrap();

        let text = execute(&session, "root", OutputFormat::Text).await.unwrap();
        assert!(text.starts_with("Nodes:\n  root (0, 0)"));
        assert!(text.contains("root depends on dep"));
        assert!(text.contains("root parent of kid"));
    }

    #[tokio::test]
    async fn test_json_output() {
        let (_dir, session) = session_with(&[Minion::new("a", "A"), Minion::new("b", "B")]);
        session.manager().add_dependency("a", "b", 10).await.unwrap();

        let json = execute(&session, "a", OutputFormat::Json).await.unwrap();
        let graph: RelationshipGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges[0].kind, EdgeKind::Dependency);
    }

    #[tokio::test]
    async fn test_unknown_root() {
        let (_dir, session) = session_with(&[Minion::new("a", "A")]);
        let text = execute(&session, "ghost", OutputFormat::Text).await.unwrap();
        assert_eq!(text, "No relationships for 'ghost'");
    }
}
