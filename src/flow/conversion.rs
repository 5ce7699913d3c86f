use super::definition::FlowDefinition;
use crate::error::FlowConversionError;

/// A trait for custom data models that can be converted into a `FlowDefinition`.
///
/// Flow editors export their graphs in their own shape. Implementing this trait on
/// those structs is how a format becomes runnable: the compiler only ever sees the
/// canonical definition.
///
/// # Example
///
/// ```rust,no_run
/// use bugflow::error::FlowConversionError;
/// use bugflow::flow::{FlowDefinition, FlowEdgeDefinition, FlowNodeDefinition, IntoFlow};
///
/// struct Recording { steps: Vec<String> }
///
/// impl IntoFlow for Recording {
///     fn into_flow(self) -> Result<FlowDefinition, FlowConversionError> {
///         let mut nodes = vec![FlowNodeDefinition { id: "start".into(), ..Default::default() }];
///         let mut edges = Vec::new();
///         let mut previous = "start".to_string();
///         for (index, xpath) in self.steps.into_iter().enumerate() {
///             let id = format!("step-{index}");
///             edges.push(FlowEdgeDefinition::new(&format!("e{index}"), &previous, &id));
///             nodes.push(FlowNodeDefinition {
///                 id: id.clone(),
///                 handle_type: Some("click".into()),
///                 xpath: Some(xpath),
///                 ..Default::default()
///             });
///             previous = id;
///         }
///         nodes.push(FlowNodeDefinition { id: "end".into(), ..Default::default() });
///         edges.push(FlowEdgeDefinition::new("e-end", &previous, "end"));
///         Ok(FlowDefinition { name: None, domain: None, nodes, edges })
///     }
/// }
/// ```
pub trait IntoFlow {
    /// Consumes the object and converts it into a runnable flow definition.
    fn into_flow(self) -> Result<FlowDefinition, FlowConversionError>;
}

impl IntoFlow for FlowDefinition {
    fn into_flow(self) -> Result<FlowDefinition, FlowConversionError> {
        Ok(self)
    }
}
