use crate::config::{EngineConfig, MalformedGraphPolicy};
use crate::error::CompileError;
use crate::flow::{FlowDefinition, FlowGraph};
use ahash::AHashMap;
use tracing::debug;

mod builder;
pub mod parsing;

pub use builder::GraphDiagnostic;
use builder::GraphBuilder;
use parsing::*;

/// The result of compiling a flow: the runnable graph plus everything noticed on the way.
#[derive(Debug, Clone)]
pub struct CompiledFlow {
    pub graph: FlowGraph,
    pub diagnostics: Vec<GraphDiagnostic>,
}

impl CompiledFlow {
    /// Whether the graph is a single start-to-end chain.
    pub fn is_well_formed(&self) -> bool {
        !self.diagnostics.iter().any(GraphDiagnostic::is_structural)
    }
}

pub struct Compiler {
    flow: FlowDefinition,
    registry: AHashMap<String, Box<dyn ActionParser>>,
    policy: MalformedGraphPolicy,
    reject_unknown_actions: bool,
}

pub struct CompilerBuilder {
    flow: FlowDefinition,
    registry: AHashMap<String, Box<dyn ActionParser>>,
    policy: MalformedGraphPolicy,
    reject_unknown_actions: bool,
}

impl CompilerBuilder {
    pub fn new(flow: FlowDefinition) -> Self {
        let mut registry: AHashMap<String, Box<dyn ActionParser>> = AHashMap::new();
        register_default_parsers(&mut registry);
        Self {
            flow,
            registry,
            policy: MalformedGraphPolicy::default(),
            reject_unknown_actions: false,
        }
    }

    /// Lets an editor-specific type name reuse a built-in parser,
    /// e.g. `with_type_mapping("keydown", "keydownevent")`.
    pub fn with_type_mapping(mut self, user_type_name: &str, builtin_type_name: &str) -> Self {
        if let Some(parser) = create_parser_by_name(builtin_type_name) {
            self.registry.insert(user_type_name.to_string(), parser);
        }
        self
    }

    pub fn with_custom_parser(mut self, parser: Box<dyn ActionParser>) -> Self {
        self.registry
            .insert(parser.handle_type().to_string(), parser);
        self
    }

    pub fn with_policy(mut self, policy: MalformedGraphPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn reject_unknown_actions(mut self, reject: bool) -> Self {
        self.reject_unknown_actions = reject;
        self
    }

    /// Applies the compile-relevant parts of an engine configuration.
    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.with_policy(config.malformed_graph)
            .reject_unknown_actions(config.reject_unknown_actions)
    }

    pub fn build(self) -> Compiler {
        Compiler {
            flow: self.flow,
            registry: self.registry,
            policy: self.policy,
            reject_unknown_actions: self.reject_unknown_actions,
        }
    }
}

impl Compiler {
    pub fn builder(flow: FlowDefinition) -> CompilerBuilder {
        CompilerBuilder::new(flow)
    }

    /// Parses every node's action and checks the chain.
    ///
    /// Under [`MalformedGraphPolicy::Reject`] any structural diagnostic fails compilation;
    /// otherwise the diagnostics are returned alongside the graph and logged.
    pub fn compile(self) -> Result<CompiledFlow, CompileError> {
        let builder = GraphBuilder::new(&self.flow, &self.registry, self.reject_unknown_actions);
        let (graph, diagnostics) = builder.build()?;

        if self.policy == MalformedGraphPolicy::Reject {
            if let Some(fatal) = diagnostics.iter().find(|d| d.is_structural()) {
                return Err(CompileError::GraphMalformed(fatal.to_string()));
            }
        }

        debug!(
            flow = graph.name().unwrap_or("<unnamed>"),
            nodes = graph.nodes().len(),
            edges = graph.edges().len(),
            diagnostics = diagnostics.len(),
            "flow compiled"
        );
        Ok(CompiledFlow { graph, diagnostics })
    }
}
