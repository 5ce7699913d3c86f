use super::action::{Action, NodeKind, StartConfig};
use super::definition::{END_NODE_ID, START_NODE_ID};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A compiled node: its role, and for step nodes the parsed interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: Option<String>,
    /// `None` on step nodes whose editor type was not recognized; those are paced and skipped.
    pub action: Option<Action>,
    pub start: Option<StartConfig>,
}

impl FlowNode {
    pub fn start(config: StartConfig) -> Self {
        Self {
            id: START_NODE_ID.to_string(),
            kind: NodeKind::Start,
            label: None,
            action: None,
            start: Some(config),
        }
    }

    pub fn end() -> Self {
        Self {
            id: END_NODE_ID.to_string(),
            kind: NodeKind::End,
            label: None,
            action: None,
            start: None,
        }
    }

    pub fn step(id: &str, action: Action) -> Self {
        Self {
            id: id.to_string(),
            kind: NodeKind::Step,
            label: None,
            action: Some(action),
            start: None,
        }
    }

    pub fn requests_new_tab(&self) -> bool {
        self.start.as_ref().is_some_and(|s| s.new_tab)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// The serializable form of a compiled flow, as carried between contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowData {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

/// An immutable, indexed snapshot of a flow for the duration of one run.
///
/// Lookups follow first-match semantics: if two nodes share an id, or a node has
/// more than one outgoing edge, the one declared first wins.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    data: FlowData,
    node_index: AHashMap<String, usize>,
    edge_index: AHashMap<String, usize>,
}

impl FlowGraph {
    pub fn new(data: FlowData) -> Self {
        let mut node_index = AHashMap::with_capacity(data.nodes.len());
        for (i, node) in data.nodes.iter().enumerate() {
            node_index.entry(node.id.clone()).or_insert(i);
        }
        let mut edge_index = AHashMap::with_capacity(data.edges.len());
        for (i, edge) in data.edges.iter().enumerate() {
            edge_index.entry(edge.source.clone()).or_insert(i);
        }
        Self {
            data,
            node_index,
            edge_index,
        }
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.node_index.get(id).map(|&i| &self.data.nodes[i])
    }

    /// The edge leaving `source`, if any.
    pub fn edge_from(&self, source: &str) -> Option<&FlowEdge> {
        self.edge_index.get(source).map(|&i| &self.data.edges[i])
    }

    /// Id of the node that follows `source` in the chain.
    pub fn next_id(&self, source: &str) -> Option<&str> {
        self.edge_from(source).map(|e| e.target.as_str())
    }

    pub fn start_node(&self) -> Option<&FlowNode> {
        self.node(START_NODE_ID)
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.data.nodes
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.data.edges
    }

    pub fn name(&self) -> Option<&str> {
        self.data.name.as_deref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.data.domain.as_deref()
    }

    pub fn data(&self) -> &FlowData {
        &self.data
    }

    pub fn into_data(self) -> FlowData {
        self.data
    }

    /// A copy of the flow whose start node no longer asks for a new tab, so a
    /// handed-off run cannot trigger another handoff.
    pub fn handoff_snapshot(&self) -> FlowData {
        let mut data = self.data.clone();
        for node in data.nodes.iter_mut().filter(|n| n.kind == NodeKind::Start) {
            if let Some(start) = node.start.as_mut() {
                start.new_tab = false;
            }
        }
        data
    }
}

impl From<FlowData> for FlowGraph {
    fn from(data: FlowData) -> Self {
        Self::new(data)
    }
}
