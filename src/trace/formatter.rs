use crate::compiler::GraphDiagnostic;
use crate::flow::{Action, ActionOutcome, FlowGraph, FlowNode, NodeKind, START_NODE_ID};
use crate::interpreter::{RunOutcome, RunReport};
use ahash::AHashSet;
use std::fmt::Write;

/// Formats flows and run reports into human-readable strings
pub struct TraceFormatter;

impl TraceFormatter {
    /// Renders the chain from `start`, one node per line, stopping at the first
    /// missing edge or repeated node.
    pub fn format_chain(graph: &FlowGraph) -> String {
        let mut out = String::new();
        let mut seen = AHashSet::new();
        let mut current = Some(START_NODE_ID);
        let mut position = 0;
        while let Some(id) = current {
            if !seen.insert(id) {
                let _ = writeln!(out, "  ... cycle back to '{}'", id);
                break;
            }
            let Some(node) = graph.node(id) else {
                let _ = writeln!(out, "  ... missing node '{}'", id);
                break;
            };
            let _ = writeln!(out, "{:>3}. {}", position, Self::format_node(node));
            position += 1;
            current = graph.next_id(id);
        }
        out
    }

    fn format_node(node: &FlowNode) -> String {
        match node.kind {
            NodeKind::Start => match node.start.as_ref() {
                Some(cfg) if cfg.new_tab => format!(
                    "start (new tab: {})",
                    cfg.url.as_deref().unwrap_or("<no url>")
                ),
                _ => "start".to_string(),
            },
            NodeKind::End => "end (paste)".to_string(),
            NodeKind::Step => {
                let action = node
                    .action
                    .as_ref()
                    .map(Self::format_action)
                    .unwrap_or_else(|| "<skipped>".to_string());
                match node.label.as_deref() {
                    Some(label) if !label.is_empty() => {
                        format!("{} [{}] {}", node.id, label, action)
                    }
                    _ => format!("{} {}", node.id, action),
                }
            }
        }
    }

    fn format_action(action: &Action) -> String {
        match action {
            Action::Click { xpath } => format!("click {}", xpath),
            Action::Input { xpath, value } => format!("input {:?} into {}", value, xpath),
            Action::KeyDown { xpath, key_code } => format!("keydown {} on {}", key_code, xpath),
            Action::Select { xpath } => format!("select {}", xpath),
            Action::Paste => "paste".to_string(),
        }
    }

    pub fn format_diagnostics(diagnostics: &[GraphDiagnostic]) -> String {
        diagnostics
            .iter()
            .map(|d| format!("  - {}", d))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Summarizes a run: its outcome line, then each executed step.
    pub fn format_report(report: &RunReport) -> String {
        let mut out = String::new();
        let headline = match &report.outcome {
            RunOutcome::Completed if report.reached_end => "completed".to_string(),
            RunOutcome::Completed => "completed without reaching end".to_string(),
            RunOutcome::Handoff { tab_id } => format!("handed off to tab {}", tab_id),
            RunOutcome::ElementNotFound { node_id } => {
                format!("aborted: element for '{}' not found", node_id)
            }
            RunOutcome::SynthesisFailed { node_id } => {
                format!("aborted: events for '{}' could not be dispatched", node_id)
            }
        };
        let status = report
            .status_code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "task {}: {} (status {})", report.task_id, headline, status);
        for step in &report.steps {
            let _ = writeln!(
                out,
                "  {:<10} {:<8} {}",
                step.node_id,
                step.kind.to_string(),
                Self::format_outcome(step.outcome)
            );
        }
        out
    }

    fn format_outcome(outcome: ActionOutcome) -> &'static str {
        match outcome {
            ActionOutcome::Success => "ok",
            ActionOutcome::NotFound => "not found",
            ActionOutcome::Failed => "failed",
        }
    }
}
