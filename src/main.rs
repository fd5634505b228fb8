use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use conveyor_config::WorkflowDef;
use conveyor_engine::{EngineConfig, WorkflowRuntime};
use conveyor_task::TaskInvoker;
use conveyor_task::backends::{
  BuildOutput, FilterLabels, FixtureDetector, FsObjectStore, Label, StaticTextModel,
};
use conveyor_trigger::{ObjectCreated, TriggerAdapter};
use conveyor_workflow::Workflow;

/// Conveyor - a declarative linear-workflow execution engine
#[derive(Parser)]
#[command(name = "conveyor")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.conveyor)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Lock a workflow definition and report the result
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Run a workflow for one trigger event
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Path to the trigger event JSON (default: read from stdin)
    #[arg(long)]
    event: Option<PathBuf>,

    /// Path to a detection fixture file (object key -> labels)
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Confidence threshold for the label filter
    #[arg(long, default_value_t = FilterLabels::DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Text the local inference backend answers with
    #[arg(long, default_value = "A concise summary of the detected scene.")]
    model_text: String,
  },
}

fn main() -> Result<()> {
  init_tracing();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".conveyor")
  });

  match cli.command {
    Some(Commands::Validate { workflow_file }) => {
      validate_workflow(&workflow_file)?;
    }
    Some(Commands::Run {
      workflow_file,
      event,
      labels,
      threshold,
      model_text,
    }) => {
      run_workflow(workflow_file, event, labels, threshold, model_text, data_dir)?;
    }
    None => {
      println!("conveyor - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing() {
  use tracing_subscriber::EnvFilter;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();
}

fn validate_workflow(workflow_file: &Path) -> Result<()> {
  let workflow = load_workflow(workflow_file)?;

  println!(
    "workflow '{}' is valid: {} states, chain {}",
    workflow.name,
    workflow.chain().len(),
    workflow.chain().order().join(" -> ")
  );

  Ok(())
}

fn run_workflow(
  workflow_file: PathBuf,
  event: Option<PathBuf>,
  labels: Option<PathBuf>,
  threshold: f64,
  model_text: String,
  data_dir: PathBuf,
) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    run_workflow_async(workflow_file, event, labels, threshold, model_text, data_dir).await
  })
}

async fn run_workflow_async(
  workflow_file: PathBuf,
  event: Option<PathBuf>,
  labels: Option<PathBuf>,
  threshold: f64,
  model_text: String,
  data_dir: PathBuf,
) -> Result<()> {
  let workflow = load_workflow(&workflow_file)?;
  eprintln!("Loaded workflow: {}", workflow.name);

  let event = read_event(event)?;
  eprintln!("Trigger event: {}/{}", event.bucket.name, event.object.key);

  let invoker = build_invoker(labels, threshold, model_text, &data_dir)?;
  let runtime = Arc::new(WorkflowRuntime::new(
    EngineConfig::default(),
    workflow,
    invoker,
  ));

  let adapter = TriggerAdapter::new(runtime);
  let outcome = adapter
    .start_execution(event, CancellationToken::new())
    .wait()
    .await;

  println!("{}", serde_json::to_string_pretty(&outcome)?);

  if !outcome.is_succeeded() {
    std::process::exit(1);
  }
  Ok(())
}

fn load_workflow(workflow_file: &Path) -> Result<Workflow> {
  let content = std::fs::read_to_string(workflow_file)
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  let def: WorkflowDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;

  Workflow::lock(def).context("failed to lock workflow")
}

/// Wire the built-in backend set under the resource names the shipped
/// definitions use.
fn build_invoker(
  labels: Option<PathBuf>,
  threshold: f64,
  model_text: String,
  data_dir: &Path,
) -> Result<TaskInvoker> {
  let detector = match labels {
    Some(path) => {
      let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read labels fixture: {}", path.display()))?;
      let fixtures: HashMap<String, Vec<Label>> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse labels fixture: {}", path.display()))?;
      FixtureDetector::from_map(fixtures)
    }
    None => FixtureDetector::new(),
  };

  Ok(
    TaskInvoker::new()
      .with_backend("detector", Arc::new(detector))
      .with_backend("filter-labels", Arc::new(FilterLabels::new(threshold)))
      .with_backend("text-model", Arc::new(StaticTextModel::new(model_text)))
      .with_backend("build-output", Arc::new(BuildOutput::new()))
      .with_backend(
        "object-store",
        Arc::new(FsObjectStore::new(data_dir.join("objects"))),
      ),
  )
}

fn read_event(event: Option<PathBuf>) -> Result<ObjectCreated> {
  let content = match event {
    Some(path) => std::fs::read_to_string(&path)
      .with_context(|| format!("failed to read event file: {}", path.display()))?,
    None => read_event_from_stdin()?,
  };

  serde_json::from_str(&content).context("failed to parse trigger event JSON")
}

fn read_event_from_stdin() -> Result<String> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    anyhow::bail!("no trigger event: pipe one on stdin or pass --event");
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read trigger event from stdin")?;
  Ok(input)
}
