use bugflow::prelude::*;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Check, simulate and manage bug-report replay flows
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional engine configuration JSON file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a flow and print its chain and diagnostics
    Check {
        #[command(flatten)]
        source: FlowSource,
    },
    /// Run a flow against a simulated browser
    Run {
        #[command(flatten)]
        source: FlowSource,
        /// Browser fixture JSON describing the pages the run will meet
        #[arg(short, long)]
        fixture: String,
        /// Save pending runs left in the registry to this file
        #[arg(long)]
        snapshot: Option<String>,
    },
    /// Manage the template store
    Templates {
        /// Path to the template store JSON file
        #[arg(short, long, default_value = "templates.json")]
        store: String,
        #[command(subcommand)]
        action: TemplateAction,
    },
}

#[derive(clap::Args, Debug)]
struct FlowSource {
    /// Path to a flow document exported from the flow editor
    #[arg(long, conflicts_with = "template")]
    flow: Option<String>,
    /// Name or id of a stored template
    #[arg(long)]
    template: Option<String>,
    /// Template store to look the template up in
    #[arg(long, default_value = "templates.json")]
    store: String,
}

#[derive(Subcommand, Debug)]
enum TemplateAction {
    List,
    Add {
        name: String,
        #[arg(value_enum)]
        kind: KindCli,
        /// Issue page URL for `feishu`, path to a flow document for `custom`
        command: String,
    },
    Remove {
        id: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindCli {
    Feishu,
    Custom,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Check { source } => run_check(&source, &config),
        Command::Run {
            source,
            fixture,
            snapshot,
        } => run_simulation(&source, &fixture, snapshot.as_deref(), config).await,
        Command::Templates { store, action } => run_templates(&store, action),
    }
}

fn load_flow(source: &FlowSource) -> FlowDefinition {
    match (&source.flow, &source.template) {
        (Some(path), _) => {
            let json = fs::read_to_string(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to read flow file '{}': {}", path, e))
            });
            parse_flow_document(&json)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to convert flow: {}", e)))
        }
        (None, Some(key)) => {
            let store = TemplateStore::open(&source.store)
                .unwrap_or_else(|e| exit_with_error(&e.to_string()));
            let template = store
                .get(key)
                .unwrap_or_else(|e| exit_with_error(&e.to_string()));
            template
                .into_flow()
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to expand template: {}", e)))
        }
        (None, None) => exit_with_error("Either --flow or --template is required."),
    }
}

fn compile(flow: FlowDefinition, config: &EngineConfig) -> CompiledFlow {
    Compiler::builder(flow)
        .with_config(config)
        .build()
        .compile()
        .unwrap_or_else(|e| exit_with_error(&format!("Compilation failed: {}", e)))
}

fn run_check(source: &FlowSource, config: &EngineConfig) {
    let compiled = compile(load_flow(source), config);
    println!(
        "Flow '{}' ({} nodes, {} edges)",
        compiled.graph.name().unwrap_or("<unnamed>"),
        compiled.graph.nodes().len(),
        compiled.graph.edges().len()
    );
    print!("{}", TraceFormatter::format_chain(&compiled.graph));
    if compiled.diagnostics.is_empty() {
        println!("\nNo diagnostics.");
    } else {
        println!("\nDiagnostics:");
        println!("{}", TraceFormatter::format_diagnostics(&compiled.diagnostics));
    }
    if !compiled.is_well_formed() {
        std::process::exit(2);
    }
}

async fn run_simulation(
    source: &FlowSource,
    fixture_path: &str,
    snapshot: Option<&str>,
    config: EngineConfig,
) {
    let total_start = Instant::now();
    let compiled = compile(load_flow(source), &config);
    let fixture = BrowserFixture::from_file(fixture_path)
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    let start_url = fixture.start_url.clone();

    let simulation = Simulation::new(fixture, config);
    let tab = simulation.open_tab(&start_url).await;
    let reports = simulation
        .run_flow(tab, &compiled.graph)
        .await
        .unwrap_or_else(|e| exit_with_error(&format!("Run failed: {}", e)));

    for report in &reports {
        print!("{}", TraceFormatter::format_report(report));
    }
    if let Some(path) = snapshot {
        simulation
            .background()
            .persist(path)
            .await
            .unwrap_or_else(|e| exit_with_error(&e.to_string()));
        println!("Registry snapshot written to {}", path);
    }
    println!("\nSimulated in {:?}", total_start.elapsed());

    let final_status = reports.last().and_then(RunReport::status_code).unwrap_or(0);
    if final_status != 1 {
        std::process::exit(1);
    }
}

fn run_templates(path: &str, action: TemplateAction) {
    let mut store = TemplateStore::open(path).unwrap_or_else(|e| exit_with_error(&e.to_string()));
    match action {
        TemplateAction::List => {
            if store.list().is_empty() {
                println!("No templates in {}", path);
            }
            for template in store.list() {
                let kind = match template.kind {
                    TemplateKind::Feishu => "feishu",
                    TemplateKind::Custom => "custom",
                };
                println!("{:<16} {:<8} {}", template.id, kind, template.name);
            }
        }
        TemplateAction::Add {
            name,
            kind,
            command,
        } => {
            let (kind, command) = match kind {
                KindCli::Feishu => (TemplateKind::Feishu, command),
                KindCli::Custom => {
                    let document = fs::read_to_string(&command).unwrap_or_else(|e| {
                        exit_with_error(&format!("Failed to read flow file '{}': {}", command, e))
                    });
                    (TemplateKind::Custom, document)
                }
            };
            let template = store
                .add(&name, kind, &command)
                .unwrap_or_else(|e| exit_with_error(&e.to_string()));
            println!("Added template '{}' with id {}", template.name, template.id);
        }
        TemplateAction::Remove { id } => {
            let removed = store
                .remove(&id)
                .unwrap_or_else(|e| exit_with_error(&e.to_string()));
            if removed {
                println!("Removed template {}", id);
            } else {
                exit_with_error(&format!("No template with id '{}'", id));
            }
        }
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
