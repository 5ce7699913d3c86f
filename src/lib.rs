//! # Bugflow - Action-Replay Engine for Bug Reports
//!
//! **Bugflow** replays a recorded sequence of UI interactions against a live page to
//! file a bug report in an external tracker. A flow is a chain of nodes from `start`
//! to `end`; each step node carries one interaction (click, input, keydown, select),
//! and reaching `end` pastes the captured screenshot from the clipboard.
//!
//! Runs can cross tab boundaries. When a flow's start node asks for a new tab, the
//! run is parked in a process-wide registry owned by the background process and
//! resumed by the new tab's content script once the page has loaded.
//!
//! ## Core Workflow
//!
//! 1.  **Load a Flow**: Parse an editor export with [`ui::parse_flow_document`], expand a
//!     [`flow::BugTemplate`], or implement [`flow::IntoFlow`] for your own format.
//! 2.  **Compile**: [`compiler::Compiler`] turns the `FlowDefinition` into a typed
//!     [`flow::FlowGraph`] and reports structural diagnostics.
//! 3.  **Run**: an [`interpreter::Interpreter`] walks the graph against a [`dom::Page`],
//!     talking to the background process through a [`relay::BackgroundLink`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bugflow::prelude::*;
//!
//! # async fn run_example() -> Result<()> {
//! let template = BugTemplate {
//!     id: "1".to_string(),
//!     name: "tracker".to_string(),
//!     kind: TemplateKind::Feishu,
//!     command: "https://tracker.example/new".to_string(),
//! };
//!
//! let fixture = BrowserFixture::new("https://app.example/");
//! let simulation = Simulation::new(fixture, EngineConfig::default());
//! let tab = simulation.open_tab("https://app.example/").await;
//!
//! for report in simulation.submit_bug(tab, &template).await? {
//!     println!("{}", TraceFormatter::format_report(&report));
//! }
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod config;
pub mod data;
pub mod dom;
pub mod driver;
pub mod error;
pub mod flow;
pub mod interpreter;
pub mod prelude;
pub mod registry;
pub mod relay;
pub mod synthesizer;
pub mod trace;
pub mod ui;
