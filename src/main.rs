use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde_json::Value;

use flow_studio::graph::ValueMap;
use flow_studio::{
    validate, ClientConfig, ExecutionOrchestrator, FileFlowStore, FlowEditor, FlowLifecycle,
    HttpExecutionBackend, SharedEditor,
};

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a stored flow for dangling edges and orphaned nodes
    Validate {
        /// Directory holding flow documents
        #[arg(short, long)]
        dir: PathBuf,

        /// Flow id
        #[arg(short, long)]
        flow: String,
    },
    /// Create and save an empty flow
    New {
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(short, long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,
    },
    /// Execute a stored flow on the execution service
    Run {
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(short, long)]
        flow: String,

        /// Global input as key=value (value parsed as JSON when possible)
        #[arg(short, long = "input", value_parser = parse_input)]
        inputs: Vec<(String, Value)>,
    },
    /// Execute a single node of a stored flow
    Step {
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(short, long)]
        flow: String,

        /// Node id
        #[arg(short, long)]
        node: String,
    },
}

fn parse_input(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

async fn open_flow(dir: PathBuf, flow_id: &str) -> anyhow::Result<(SharedEditor, FlowLifecycle)> {
    let editor = FlowEditor::new().into_shared();
    let lifecycle = FlowLifecycle::new(editor.clone(), Arc::new(FileFlowStore::new(dir)));
    if !lifecycle.load_flow(flow_id).await {
        let message = editor.lock().error().unwrap_or("unknown error").to_string();
        bail!(message);
    }
    Ok((editor, lifecycle))
}

fn orchestrator(editor: SharedEditor) -> anyhow::Result<ExecutionOrchestrator> {
    let config = ClientConfig::from_env().context("Invalid execution service configuration")?;
    log::info!("Using execution service at {}", config.base_url);
    let backend = HttpExecutionBackend::new(config)?;
    Ok(ExecutionOrchestrator::new(editor, Arc::new(backend)))
}

fn print_node_statuses(editor: &SharedEditor) {
    let editor = editor.lock();
    for node in editor.nodes() {
        let timing = node
            .data
            .execution_time
            .map(|ms| format!(" ({:.0} ms)", ms))
            .unwrap_or_default();
        match &node.data.error {
            Some(error) => println!("{:<24} {}{}: {}", node.id, node.data.status, timing, error),
            None => println!("{:<24} {}{}", node.id, node.data.status, timing),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Validate { dir, flow } => {
            let (editor, _) = open_flow(dir, &flow).await?;
            let report = {
                let editor = editor.lock();
                validate(editor.nodes(), editor.edges())
            };

            for message in report.messages() {
                println!("{}", message);
            }
            if !report.is_valid() {
                bail!("Flow {} is invalid", flow);
            }
            println!("Flow {} is valid", flow);
        }
        Commands::New {
            dir,
            name,
            description,
        } => {
            let editor = FlowEditor::new().into_shared();
            let lifecycle = FlowLifecycle::new(editor.clone(), Arc::new(FileFlowStore::new(dir)));
            let id = lifecycle.create_new_flow(&name, &description);
            if !lifecycle.save_flow().await {
                let message = editor.lock().error().unwrap_or("unknown error").to_string();
                bail!(message);
            }
            println!("{}", id);
        }
        Commands::Run { dir, flow, inputs } => {
            let (editor, _) = open_flow(dir, &flow).await?;
            let orchestrator = orchestrator(editor.clone())?;
            let global_inputs: ValueMap = inputs.into_iter().collect();

            let run = orchestrator.execute_flow(global_inputs);
            tokio::pin!(run);
            let execution = tokio::select! {
                execution = &mut run => execution,
                _ = tokio::signal::ctrl_c() => {
                    orchestrator.cancel_execution();
                    run.await
                }
            };

            let Some(execution) = execution else {
                let message = editor.lock().error().unwrap_or("unknown error").to_string();
                bail!("Flow {} did not start: {}", flow, message);
            };

            print_node_statuses(&editor);
            println!("Execution {}: {}", execution.id, execution.status);
            if let Some(error) = execution.error {
                bail!(error);
            }
        }
        Commands::Step { dir, flow, node } => {
            let (editor, _) = open_flow(dir, &flow).await?;
            let orchestrator = orchestrator(editor.clone())?;

            let result = orchestrator
                .step_execute(&node)
                .await
                .ok_or_else(|| anyhow!("Node {} not found in flow {}", node, flow))?;

            print_node_statuses(&editor);
            if let Some(outputs) = result.outputs {
                println!("{}", serde_json::to_string_pretty(&outputs)?);
            }
            if let Some(error) = result.error {
                bail!(error);
            }
        }
    }

    Ok(())
}
