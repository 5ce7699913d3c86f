//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the bugflow crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use bugflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let document = std::fs::read_to_string("path/to/flow.json")?;
//! let flow = parse_flow_document(&document)?;
//!
//! let compiled = Compiler::builder(flow).build().compile()?;
//! println!("{}", TraceFormatter::format_chain(&compiled.graph));
//! # Ok(())
//! # }
//! ```

// Flow model and compilation
pub use crate::compiler::{CompiledFlow, Compiler, GraphDiagnostic};
pub use crate::flow::{
    Action, ActionOutcome, BugTemplate, FlowDefinition, FlowEdgeDefinition, FlowGraph,
    FlowNodeDefinition, IntoFlow, TabId, TaskId, TemplateKind, TemplateStore,
};
pub use crate::ui::{UiFlowDocument, parse_flow_document};

// Running
pub use crate::config::{EngineConfig, MalformedGraphPolicy};
pub use crate::interpreter::{Cursor, Interpreter, RunOutcome, RunReport, RunRequest};
pub use crate::relay::{BackgroundLink, BackgroundService, ContentScript};

// Simulation
pub use crate::data::{BrowserFixture, PageFixture, Simulation};

// Error types
pub use crate::error::{CompileError, FlowConversionError, RunError};

// Trace formatting
pub use crate::trace::TraceFormatter;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
