/// Id of the node every fresh run begins from.
pub const START_NODE_ID: &str = "start";
/// Id of the terminal node that triggers the final paste.
pub const END_NODE_ID: &str = "end";

/// The complete, canonical definition of a recorded flow, ready for compilation.
/// This is the target structure for any custom data model conversion.
#[derive(Debug, Clone, Default)]
pub struct FlowDefinition {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub nodes: Vec<FlowNodeDefinition>,
    pub edges: Vec<FlowEdgeDefinition>,
}

/// Defines a single node as recorded by the flow editor, before action parsing.
#[derive(Debug, Clone, Default)]
pub struct FlowNodeDefinition {
    pub id: String,
    pub label: Option<String>,
    /// Editor name of the interaction (`click`, `input`, `keydownevent`, ...).
    pub handle_type: Option<String>,
    pub xpath: Option<String>,
    /// Literal text for `input`, key code for `keydownevent`.
    pub input_value: Option<String>,
    /// `"1"` when the run must begin in a freshly opened tab.
    pub new_tab: Option<String>,
    pub new_tab_url: Option<String>,
}

/// Defines a connection between two nodes in the flow.
#[derive(Debug, Clone)]
pub struct FlowEdgeDefinition {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl FlowEdgeDefinition {
    pub fn new(id: &str, source: &str, target: &str) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}
