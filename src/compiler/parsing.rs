use crate::error::CompileError;
use crate::flow::{Action, FlowNodeDefinition};
use ahash::AHashMap;

/// Defines the contract for parsing a specific editor `handle_type` into an `Action`.
pub trait ActionParser: Send + Sync {
    fn handle_type(&self) -> &str;
    fn parse(&self, node: &FlowNodeDefinition) -> Result<Action, CompileError>;
}

/// Helper to fetch a field every element-targeting action needs.
fn require_xpath(node: &FlowNodeDefinition, action: &str) -> Result<String, CompileError> {
    match node.xpath.as_deref().map(str::trim) {
        Some(xpath) if !xpath.is_empty() => Ok(xpath.to_string()),
        _ => Err(CompileError::MissingField {
            node_id: node.id.clone(),
            action: action.to_string(),
            field: "xPath".to_string(),
        }),
    }
}

fn parse_key_code(node: &FlowNodeDefinition) -> Result<u32, CompileError> {
    let raw = node.input_value.as_deref().unwrap_or("").trim();
    raw.parse().map_err(|_| CompileError::InvalidKeyCode {
        node_id: node.id.clone(),
        value: raw.to_string(),
    })
}

/// Master macro to define all standard action parsers, their registration, and their creation.
macro_rules! define_action_parsers {
    ( $( ($struct_name:ident, $handle_type:expr, |$node:ident| $body:expr) ),* $(,)? ) => {
        $(
            struct $struct_name;
            impl ActionParser for $struct_name {
                fn handle_type(&self) -> &str { $handle_type }
                fn parse(&self, $node: &FlowNodeDefinition) -> Result<Action, CompileError> {
                    $body
                }
            }
        )*

        pub(super) fn register_default_parsers(
            registry: &mut AHashMap<String, Box<dyn ActionParser>>,
        ) {
            $( registry.insert($handle_type.to_string(), Box::new($struct_name)); )*
        }

        pub(super) fn create_parser_by_name(name: &str) -> Option<Box<dyn ActionParser>> {
            match name {
                $( $handle_type => Some(Box::new($struct_name)), )*
                _ => None,
            }
        }
    };
}

define_action_parsers! {
    (ClickParser, "click", |node| Ok(Action::Click {
        xpath: require_xpath(node, "click")?,
    })),
    (InputParser, "input", |node| Ok(Action::Input {
        xpath: require_xpath(node, "input")?,
        value: node.input_value.clone().unwrap_or_default(),
    })),
    (KeyDownParser, "keydownevent", |node| Ok(Action::KeyDown {
        xpath: require_xpath(node, "keydownevent")?,
        key_code: parse_key_code(node)?,
    })),
    (SelectParser, "select", |node| Ok(Action::Select {
        xpath: require_xpath(node, "select")?,
    })),
    (PasteParser, "paste", |_node| Ok(Action::Paste)),
}
