// SPDX-License-Identifier: MIT

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use relay_rs::relay::catalog::{RunReport, RunRequest, Runtime, WorkflowKind};
use relay_rs::relay::config::RuntimeConfig;
use relay_rs::relay::server;
use relay_rs::relay::workflow::loader::RouteTableLoader;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the built-in workflows
    List,
    /// Run a workflow to completion
    Run {
        /// Workflow name, e.g. credit-underwriting
        #[arg(short, long)]
        workflow: String,

        /// Initial state as a JSON object
        #[arg(short, long, default_value = "{}")]
        input: String,

        /// Run id (generated when omitted)
        #[arg(long)]
        run_id: Option<String>,

        /// Step budget for this run
        #[arg(long)]
        max_steps: Option<usize>,

        /// YAML route table replacing the built-in one
        #[arg(long)]
        routes: Option<PathBuf>,
    },
    /// Continue a checkpointed run
    Resume {
        #[arg(short, long)]
        workflow: String,

        #[arg(long)]
        run_id: String,

        /// New step budget, counted from the start of the run
        #[arg(long)]
        max_steps: Option<usize>,
    },
    /// Start the HTTP API
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = RuntimeConfig::from_env()?;

    match args.command {
        Commands::List => {
            for kind in WorkflowKind::all() {
                println!("{:<24} {}", kind.as_str(), kind.description());
                println!("{:<24} workers: {}", "", kind.workers().join(" -> "));
                println!("{:<24} decision: {}", "", kind.decision_field());
            }
        }
        Commands::Run {
            workflow,
            input,
            run_id,
            max_steps,
            routes,
        } => {
            let kind: WorkflowKind = workflow.parse()?;
            let inputs = match serde_json::from_str::<Value>(&input)
                .context("--input must be valid JSON")?
            {
                Value::Object(map) => map,
                _ => bail!("--input must be a JSON object"),
            };

            let mut request = RunRequest::new(kind, inputs);
            if let Some(run_id) = run_id {
                request = request.with_run_id(run_id);
            }
            if let Some(max_steps) = max_steps {
                request = request.with_max_steps(max_steps);
            }
            if let Some(path) = routes {
                request = request.with_routes(RouteTableLoader::load(&path)?);
            }

            let runtime = Runtime::from_config(config)?;
            let cancel = cancel_on_ctrl_c();
            let report = runtime.invoke(request, &cancel).await?;
            print_report(&report)?;
        }
        Commands::Resume {
            workflow,
            run_id,
            max_steps,
        } => {
            let kind: WorkflowKind = workflow.parse()?;
            let runtime = Runtime::from_config(config)?;
            let cancel = cancel_on_ctrl_c();
            let report = runtime
                .resume(kind, &run_id, max_steps, &cancel, None)
                .await?;
            print_report(&report)?;
        }
        Commands::Serve { port } => {
            let runtime = Arc::new(Runtime::from_config(config)?);
            server::serve(runtime, port)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    Ok(())
}

/// A token that is cancelled on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; stopping, the in-flight step is discarded");
            token.cancel();
        }
    });
    cancel
}

fn print_report(report: &RunReport) -> anyhow::Result<()> {
    println!("\n--- Transcript ---");
    for record in report.state.transcript() {
        println!("[{}] {}\n{}\n", record.seq, record.worker, record.summary);
    }

    println!("--- Result ---");
    println!("Run: {} ({:?})", report.run_id, report.status);
    match &report.decision {
        Some(Value::String(text)) => println!("{}: {}", report.workflow.decision_field(), text),
        Some(value) => println!("{}: {}", report.workflow.decision_field(), value),
        None => println!("{}: <unset>", report.workflow.decision_field()),
    }
    println!(
        "\n{}",
        serde_json::to_string_pretty(&report.state.fields())?
    );
    Ok(())
}
