use crate::compiler::parsing::ActionParser;
use crate::error::CompileError;
use crate::flow::{
    END_NODE_ID, FlowData, FlowDefinition, FlowEdge, FlowGraph, FlowNode, FlowNodeDefinition,
    NodeKind, START_NODE_ID, StartConfig,
};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use std::fmt;
use tracing::warn;

/// A structural problem found while checking the chain from `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphDiagnostic {
    /// The chain stops at `node_id` without reaching `end`.
    NoOutgoingEdge { node_id: String },
    /// An edge points at a node that does not exist.
    DanglingEdge { edge_id: String, target: String },
    /// `node_id` has several outgoing edges; only the first is ever followed.
    Branch { node_id: String, count: usize },
    /// The chain returns to `node_id`.
    Cycle { node_id: String },
    /// `node_id` is not on the chain and will never run.
    Unreachable { node_id: String },
    /// A step node whose editor type has no parser; it is skipped at run time.
    UnknownAction { node_id: String, type_name: String },
}

impl GraphDiagnostic {
    /// Whether the diagnostic breaks the single start-to-end path.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            GraphDiagnostic::NoOutgoingEdge { .. }
                | GraphDiagnostic::DanglingEdge { .. }
                | GraphDiagnostic::Branch { .. }
                | GraphDiagnostic::Cycle { .. }
        )
    }
}

impl fmt::Display for GraphDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphDiagnostic::NoOutgoingEdge { node_id } => {
                write!(f, "chain stops at '{}' before reaching '{}'", node_id, END_NODE_ID)
            }
            GraphDiagnostic::DanglingEdge { edge_id, target } => {
                write!(f, "edge '{}' points at missing node '{}'", edge_id, target)
            }
            GraphDiagnostic::Branch { node_id, count } => {
                write!(f, "node '{}' has {} outgoing edges", node_id, count)
            }
            GraphDiagnostic::Cycle { node_id } => write!(f, "chain loops back to '{}'", node_id),
            GraphDiagnostic::Unreachable { node_id } => {
                write!(f, "node '{}' is not reachable from '{}'", node_id, START_NODE_ID)
            }
            GraphDiagnostic::UnknownAction { node_id, type_name } => {
                write!(f, "node '{}' has unknown action type '{}'", node_id, type_name)
            }
        }
    }
}

/// Responsible for turning a `FlowDefinition` into typed nodes and checking the chain.
pub(super) struct GraphBuilder<'a> {
    flow: &'a FlowDefinition,
    registry: &'a AHashMap<String, Box<dyn ActionParser>>,
    reject_unknown_actions: bool,
    diagnostics: Vec<GraphDiagnostic>,
}

impl<'a> GraphBuilder<'a> {
    pub(super) fn new(
        flow: &'a FlowDefinition,
        registry: &'a AHashMap<String, Box<dyn ActionParser>>,
        reject_unknown_actions: bool,
    ) -> Self {
        Self {
            flow,
            registry,
            reject_unknown_actions,
            diagnostics: Vec::new(),
        }
    }

    /// Builds the graph and returns it together with every diagnostic found.
    pub(super) fn build(mut self) -> Result<(FlowGraph, Vec<GraphDiagnostic>), CompileError> {
        let flow = self.flow;
        if let Some(duplicate) = flow.nodes.iter().map(|n| n.id.as_str()).duplicates().next() {
            return Err(CompileError::DuplicateNode(duplicate.to_string()));
        }
        if !flow.nodes.iter().any(|n| n.id == START_NODE_ID) {
            return Err(CompileError::MissingTerminal(START_NODE_ID.to_string()));
        }

        let nodes = flow
            .nodes
            .iter()
            .map(|node| self.build_node(node))
            .collect::<Result<Vec<_>, _>>()?;
        let edges = flow
            .edges
            .iter()
            .map(|edge| FlowEdge {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
            })
            .collect();

        let graph = FlowGraph::new(FlowData {
            name: flow.name.clone(),
            domain: flow.domain.clone(),
            nodes,
            edges,
        });
        self.check_chain(&graph);
        Ok((graph, self.diagnostics))
    }

    fn build_node(&mut self, node: &FlowNodeDefinition) -> Result<FlowNode, CompileError> {
        match node.id.as_str() {
            START_NODE_ID => Ok(FlowNode {
                label: node.label.clone(),
                ..FlowNode::start(StartConfig {
                    new_tab: matches!(node.new_tab.as_deref(), Some("1") | Some("true")),
                    url: node.new_tab_url.clone().filter(|u| !u.trim().is_empty()),
                })
            }),
            END_NODE_ID => Ok(FlowNode {
                label: node.label.clone(),
                ..FlowNode::end()
            }),
            _ => {
                let type_name = node.handle_type.clone().unwrap_or_default();
                let action = match self.registry.get(&type_name) {
                    Some(parser) => Some(parser.parse(node)?),
                    None if self.reject_unknown_actions => {
                        return Err(CompileError::InvalidActionType {
                            node_id: node.id.clone(),
                            type_name,
                        });
                    }
                    None => {
                        self.diagnostics.push(GraphDiagnostic::UnknownAction {
                            node_id: node.id.clone(),
                            type_name,
                        });
                        None
                    }
                };
                Ok(FlowNode {
                    id: node.id.clone(),
                    kind: NodeKind::Step,
                    label: node.label.clone(),
                    action,
                    start: None,
                })
            }
        }
    }

    /// Walks the chain the interpreter will walk and records where it deviates from
    /// a single `start`-to-`end` path.
    fn check_chain(&mut self, graph: &FlowGraph) {
        for (source, count) in graph.edges().iter().map(|e| e.source.as_str()).counts() {
            if count > 1 {
                self.diagnostics.push(GraphDiagnostic::Branch {
                    node_id: source.to_string(),
                    count,
                });
            }
        }

        let mut visited: AHashSet<&str> = AHashSet::new();
        let mut current = START_NODE_ID;
        visited.insert(current);
        loop {
            if current == END_NODE_ID {
                break;
            }
            let Some(edge) = graph.edge_from(current) else {
                self.diagnostics.push(GraphDiagnostic::NoOutgoingEdge {
                    node_id: current.to_string(),
                });
                break;
            };
            if graph.node(&edge.target).is_none() {
                self.diagnostics.push(GraphDiagnostic::DanglingEdge {
                    edge_id: edge.id.clone(),
                    target: edge.target.clone(),
                });
                break;
            }
            if !visited.insert(edge.target.as_str()) {
                self.diagnostics.push(GraphDiagnostic::Cycle {
                    node_id: edge.target.clone(),
                });
                break;
            }
            current = edge.target.as_str();
        }

        for node in graph.nodes() {
            if !visited.contains(node.id.as_str()) {
                self.diagnostics.push(GraphDiagnostic::Unreachable {
                    node_id: node.id.clone(),
                });
            }
        }

        for diagnostic in &self.diagnostics {
            warn!(flow = graph.name().unwrap_or("<unnamed>"), "{}", diagnostic);
        }
    }
}
