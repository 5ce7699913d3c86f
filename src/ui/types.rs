use crate::error::FlowConversionError;
use crate::flow::{FlowDefinition, FlowEdgeDefinition, FlowNodeDefinition, IntoFlow};
use serde::Deserialize;
use serde_json::Value;

/// Editor node data: label, interaction type and its parameters
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UiNodeData {
    pub label: Option<String>,
    #[serde(alias = "handleType")]
    pub handle_type: Option<String>,
    #[serde(alias = "xPath")]
    pub xpath: Option<String>,
    #[serde(alias = "inputValue")]
    pub input_value: Option<Value>,
    pub newtab: Option<Value>,
    pub newtaburl: Option<String>,
}

/// Editor node with ID and data. Layout fields are ignored.
#[derive(Debug, Deserialize, Clone)]
pub struct UiNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub data: UiNodeData,
}

/// Editor edge connecting nodes
#[derive(Debug, Deserialize, Clone)]
pub struct UiEdge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
}

/// The node/edge lists of an exported flow
#[derive(Debug, Deserialize, Clone)]
pub struct UiRecipe {
    pub nodes: Vec<UiNode>,
    pub edges: Vec<UiEdge>,
}

/// Complete flow document as exported by the flow editor
#[derive(Debug, Deserialize, Clone)]
pub struct UiFlowDocument {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub datas: UiRecipe,
}

/// Either a full document or a bare node/edge recipe.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnyFlowDocument {
    Document(UiFlowDocument),
    Recipe(UiRecipe),
}

/// Parses editor JSON in either of its exported shapes.
pub fn parse_flow_document(json: &str) -> Result<FlowDefinition, FlowConversionError> {
    let document: AnyFlowDocument = serde_json::from_str(json)
        .map_err(|e| FlowConversionError::JsonParseError(e.to_string()))?;
    match document {
        AnyFlowDocument::Document(doc) => doc.into_flow(),
        AnyFlowDocument::Recipe(recipe) => recipe.into_flow(),
    }
}

/// Editor values are loosely typed: `"13"` and `13` mean the same key code.
fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl IntoFlow for UiRecipe {
    fn into_flow(self) -> Result<FlowDefinition, FlowConversionError> {
        let nodes = self
            .nodes
            .into_iter()
            .map(|ui_node| {
                if ui_node.id.is_empty() {
                    return Err(FlowConversionError::ValidationError(
                        "node without an id".to_string(),
                    ));
                }
                Ok(FlowNodeDefinition {
                    id: ui_node.id,
                    label: ui_node.data.label,
                    handle_type: ui_node.data.handle_type,
                    xpath: ui_node.data.xpath,
                    input_value: ui_node.data.input_value.and_then(scalar_to_string),
                    new_tab: ui_node.data.newtab.and_then(scalar_to_string),
                    new_tab_url: ui_node.data.newtaburl,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let edges = self
            .edges
            .into_iter()
            .enumerate()
            .map(|(i, ui_edge)| FlowEdgeDefinition {
                id: if ui_edge.id.is_empty() {
                    format!("edge-{}", i)
                } else {
                    ui_edge.id
                },
                source: ui_edge.source,
                target: ui_edge.target,
            })
            .collect();

        Ok(FlowDefinition {
            name: None,
            domain: None,
            nodes,
            edges,
        })
    }
}

impl IntoFlow for UiFlowDocument {
    fn into_flow(self) -> Result<FlowDefinition, FlowConversionError> {
        let mut flow = self.datas.into_flow()?;
        flow.name = self.name;
        flow.domain = self.domain;
        Ok(flow)
    }
}
