//! Chemspeed Translator Command Line Interface
//!
//! Converts free-text lab procedures into instrument script.
//!
//! # Usage
//!
//! ```bash
//! # Convert a procedure (provider chosen by AGENT_BACKEND)
//! chem_cli convert --file procedure.txt
//!
//! # Offline run replaying canned model responses
//! chem_cli convert --file procedure.txt --dry-run script.json
//!
//! # Which operation does an instruction match?
//! echo "Prime pump 1 with 30 mL" | chem_cli match --all
//!
//! # List supported operations
//! chem_cli ops --verbose
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chem_poc::agentic::{create_llm_client_with_key, LlmClient, ScriptedLlmClient};
use chem_poc::matcher::SemanticMatcher;
use chem_poc::ops::OperationRegistry;
use chem_poc::{ConversionReport, ConverterBuilder, EventEmitter, EventReceiver, PipelineConfig};

#[derive(Parser)]
#[command(name = "chem_cli")]
#[command(version = "0.1.0")]
#[command(about = "Translate natural-language lab procedures into Chemspeed script")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: json, text, or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a procedure into script (segment + match + extract)
    Convert {
        /// Input file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Replay model responses from a JSON script instead of calling a provider
        #[arg(long, value_name = "SCRIPT")]
        dry_run: Option<PathBuf>,

        /// Print progress events after the report
        #[arg(long)]
        events: bool,
    },

    /// Match a single instruction to an operation (no model call)
    Match {
        /// Instruction text (reads stdin if not provided)
        instruction: Option<String>,

        /// Show every operation ranked by similarity
        #[arg(long)]
        all: bool,
    },

    /// Split a procedure into single actions
    Segment {
        /// Input file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Replay model responses from a JSON script instead of calling a provider
        #[arg(long, value_name = "SCRIPT")]
        dry_run: Option<PathBuf>,
    },

    /// List supported operations and their parameters
    Ops {
        /// Show parameter details
        #[arg(long)]
        verbose: bool,
    },
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            file,
            dry_run,
            events,
        } => cmd_convert(file, dry_run, events, cli.format, cli.quiet).await,
        Commands::Match { instruction, all } => cmd_match(instruction, all, cli.format),
        Commands::Segment { file, dry_run } => cmd_segment(file, dry_run, cli.format).await,
        Commands::Ops { verbose } => cmd_ops(verbose, cli.format),
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": e }));
            } else {
                eprintln!("{}: {}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

async fn cmd_convert(
    file: Option<PathBuf>,
    dry_run: Option<PathBuf>,
    show_events: bool,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let source = read_input(file)?;
    let config = PipelineConfig::from_env().map_err(|e| e.to_string())?;
    let client = build_client(&config, dry_run)?;

    let (emitter, receiver) = EventEmitter::new(config.event_buffer);
    let converter = ConverterBuilder::new(client)
        .config(&config)
        .emitter(Arc::new(emitter))
        .build()
        .map_err(|e| e.to_string())?;

    let report = converter
        .convert(&source)
        .await
        .map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => println!("{}", report.script()),
        OutputFormat::Pretty => print_report(&report, quiet),
    }

    if show_events {
        print_events(&receiver, format)?;
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(format!(
            "{} of {} instruction(s) could not be converted",
            report.failures().len(),
            report.outcomes.len()
        ))
    }
}

fn cmd_match(instruction: Option<String>, all: bool, format: OutputFormat) -> Result<(), String> {
    let instruction = match instruction {
        Some(text) => text,
        None => read_input(None)?,
    };
    let matcher = SemanticMatcher::from_global().map_err(|e| e.to_string())?;

    let results = if all {
        matcher.rank(instruction.trim())
    } else {
        matcher.find_match(instruction.trim()).map(|m| vec![m])
    }
    .map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Text => {
            for result in &results {
                println!("{}\t{:.4}", result.operation_name, result.confidence);
            }
        }
        OutputFormat::Pretty => {
            for (rank, result) in results.iter().enumerate() {
                let name = if rank == 0 {
                    result.operation_name.green().bold()
                } else {
                    result.operation_name.normal()
                };
                println!("  {:>6.3}  {}", result.confidence, name);
            }
        }
    }
    Ok(())
}

async fn cmd_segment(
    file: Option<PathBuf>,
    dry_run: Option<PathBuf>,
    format: OutputFormat,
) -> Result<(), String> {
    let source = read_input(file)?;
    let config = PipelineConfig::from_env().map_err(|e| e.to_string())?;
    let client = build_client(&config, dry_run)?;
    let converter = ConverterBuilder::new(client)
        .config(&config)
        .build()
        .map_err(|e| e.to_string())?;

    let instructions = converter
        .segment(&source)
        .await
        .map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Json => print_json(&instructions)?,
        OutputFormat::Text => {
            for instruction in &instructions {
                println!("{}", instruction.text);
            }
        }
        OutputFormat::Pretty => {
            println!("{} {} action(s)", "OK".green(), instructions.len());
            for instruction in &instructions {
                println!("  [{}] {}", instruction.index, instruction.text);
            }
        }
    }
    Ok(())
}

fn cmd_ops(verbose: bool, format: OutputFormat) -> Result<(), String> {
    let registry = OperationRegistry::global().map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Json => print_json(&registry.tool_schemas())?,
        OutputFormat::Text | OutputFormat::Pretty => {
            for op in registry.get_all() {
                let tag = if op.routine {
                    "[ROUTINE]".blue()
                } else {
                    "[DIRECT]".dimmed()
                };
                println!("  {} {}", op.name.green().bold(), tag);
                if verbose {
                    println!("    {}", op.description.dimmed());
                    for (name, field) in &op.parameters {
                        let marker = if field.required { "*" } else { " " };
                        println!(
                            "    {}{:<24} {:<8} {}",
                            marker,
                            name,
                            field.field_type.as_str(),
                            field.description
                        );
                    }
                    println!();
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn build_client(
    config: &PipelineConfig,
    dry_run: Option<PathBuf>,
) -> Result<Arc<dyn LlmClient>, String> {
    if let Some(path) = dry_run {
        let script = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
        let client = ScriptedLlmClient::from_json_script(&script).map_err(|e| e.to_string())?;
        return Ok(Arc::new(client));
    }

    let key_var = config.backend.api_key_var();
    let api_key = std::env::var(key_var)
        .map_err(|_| format!("{} not set (or use --dry-run)", key_var))?;
    Ok(create_llm_client_with_key(
        config.backend,
        api_key,
        config.model.as_deref(),
    ))
}

fn print_report(report: &ConversionReport, quiet: bool) {
    if !quiet {
        println!(
            "{} {} instruction(s) in {} ms",
            "Converted".cyan().bold(),
            report.outcomes.len(),
            report.duration_ms
        );
        println!();
    }

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(call) => {
                if !quiet {
                    println!("  {}", format!("# {}", outcome.instruction).dimmed());
                }
                println!("  {}", call.code.green());
            }
            Err(e) => {
                println!("  {}", format!("# {}", outcome.instruction).dimmed());
                println!("  {} {}", "FLAGGED".red().bold(), e);
            }
        }
    }
}

fn print_events(receiver: &EventReceiver, format: OutputFormat) -> Result<(), String> {
    let events = receiver.try_recv_batch(usize::MAX);
    match format {
        OutputFormat::Json => print_json(&events),
        OutputFormat::Text | OutputFormat::Pretty => {
            println!();
            for event in events {
                let index = event
                    .payload
                    .index()
                    .map(|i| format!("[{}]", i))
                    .unwrap_or_default();
                println!(
                    "  {} {} {}",
                    event.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
                    event.payload.event_type_str(),
                    index
                );
            }
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    println!(
        "{}",
        serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {}", e))?
    );
    Ok(())
}

fn read_input(file: Option<PathBuf>) -> Result<String, String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e)),
        None => {
            if io::stdin().is_terminal() {
                return Err("No input provided. Use --file or pipe input via stdin.".to_string());
            }
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok(buffer)
        }
    }
}
