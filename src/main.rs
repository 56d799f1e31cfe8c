use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use task_fsm::{init_telemetry, DotenvStatus, EngineSettings, GraphFile, Outcome};

/// Exit code for handler faults, configuration defects and load errors
const EXIT_FAULT: u8 = 2;
/// Exit code when the run exceeds its time limit
const EXIT_TIMEOUT: u8 = 124;

#[derive(Parser)]
#[command(name = "task-fsm")]
#[command(about = "Run state graphs of shell tasks with error recovery")]
#[command(long_about = "task-fsm walks a state graph defined in a TOML file, running each state's \
                       tasks in order and routing failures through the configured error handler. \
                       The process exits 0 on success and 1 on an unrecovered failure.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a graph file to completion
    Run {
        /// Path to the graph file
        graph: PathBuf,
        /// Abort the run after this many seconds
        #[arg(long, help = "Overrides runner.timeout_seconds from configuration")]
        timeout_secs: Option<u64>,
        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Check a graph file without running it
    Validate {
        /// Path to the graph file
        graph: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let dotenv = DotenvStatus::load();
    let settings = match EngineSettings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("failed to load configuration: {e:#}");
            return ExitCode::from(EXIT_FAULT);
        }
    };
    if let Err(e) = init_telemetry(&settings.observability) {
        eprintln!("failed to initialize logging: {e:#}");
    }
    dotenv.log();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::from(EXIT_FAULT);
        }
    };

    let result = match cli.command {
        Commands::Run { graph, timeout_secs, json } => {
            let timeout = timeout_secs.or(settings.runner.timeout_seconds);
            runtime.block_on(run_command(graph, &settings.runner.shell, timeout, json))
        }
        Commands::Validate { graph } => runtime.block_on(validate_command(graph)),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAULT)
        }
    }
}

async fn run_command(graph: PathBuf, shell: &str, timeout_secs: Option<u64>, json: bool) -> Result<u8> {
    let graph = GraphFile::load(&graph).await?;
    let machine = graph.build_machine(shell)?;

    let report = match timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), machine.run()).await {
            Ok(report) => report?,
            Err(_) => {
                tracing::error!(timeout_secs = secs, "Run timed out");
                eprintln!("run timed out after {secs}s");
                return Ok(EXIT_TIMEOUT);
            }
        },
        None => machine.run().await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(match report.outcome {
        Outcome::Success => 0,
        Outcome::Failure => 1,
    })
}

async fn validate_command(graph: PathBuf) -> Result<u8> {
    let file = GraphFile::load(&graph).await?;
    // Builds the routed handler too, so bad regexes are reported here
    file.to_machine_config("sh")?.validate()?;

    println!("{} is valid", graph.display());
    println!("  initial: {}", file.initial_state);
    println!("  terminate: {}", file.terminate_state);
    for (id, state) in &file.states {
        let work = state.task.iter().count() + state.tasks.len();
        println!("  {id} -> {} ({work} tasks)", state.next_state);
    }
    for (id, next) in file.dangling_successors() {
        println!("  warning: {id} -> {next} does not name a state");
    }
    Ok(0)
}
