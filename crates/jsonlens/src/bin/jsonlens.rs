//! Headless front end: loads a document into an in-memory editor, optionally
//! formats it, runs one filter and prints the outcome.
//!
//! Usage: `jsonlens data.json5 --filter '.items[0]'`

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use jsonlens::config::load_config;
use jsonlens::document::format_document;
use jsonlens::surface::{EditorSurface, FilterInputEvent, MemoryEditor, MemoryFilterInput};
use jsonlens::{Bus, LensConfig, LensError, LensEvent, LensResult, Workbench};

#[derive(Debug, Parser)]
#[command(name = "jsonlens", about = "Validate, format and filter JSON5 documents")]
struct Args {
    /// Document to load. Reads stdin when omitted or `-`.
    file: Option<PathBuf>,

    /// Filter to run: an expression suffix such as `.a.b[0]`, or a jq program.
    #[arg(short, long)]
    filter: Option<String>,

    /// Print the document reformatted.
    #[arg(long)]
    format: bool,

    /// Print every emitted event as a JSON line instead of the filter result.
    #[arg(long)]
    events: bool,

    /// Configuration file.
    #[arg(short, long, env = "JSONLENS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("JSONLENS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("jsonlens: {error}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> LensResult<ExitCode> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => LensConfig::default(),
    }
    .with_env_overrides();
    config.editor.welcome_text.clear();

    let text = read_document(args.file.as_deref())?;
    let editor = Arc::new(MemoryEditor::new());
    let filter_input = Arc::new(MemoryFilterInput::new());
    let bus = Bus::default();
    let mut events = bus.subscribe();

    editor.set_value(&text);
    let workbench = Workbench::new(editor.clone(), filter_input.clone(), bus, &config);
    workbench.setup();

    let coordinator = workbench.coordinator();
    if coordinator.document().is_none() {
        eprintln!("jsonlens: document is not valid JSON5");
        return Ok(ExitCode::FAILURE);
    }
    if args.format {
        coordinator.format_input();
        println!("{}", editor.get_value());
    }

    let Some(filter) = args.filter else {
        return Ok(ExitCode::SUCCESS);
    };
    filter_input.set(&filter);
    workbench
        .handle_filter_event(FilterInputEvent::KeyUp)
        .finished()
        .await;

    let mut code = ExitCode::SUCCESS;
    while let Ok(event) = events.try_recv() {
        if args.events {
            let line = serde_json::to_string(&event).map_err(|error| {
                LensError::Internal(format!("failed to serialize event: {error}"))
            })?;
            println!("{line}");
        }
        match event {
            LensEvent::FilterValid { result, kind, .. } => {
                tracing::debug!("filter matched via {}", kind.as_str());
                if !args.events {
                    println!("{}", format_document(&result, config.editor.indent)?);
                }
            }
            LensEvent::FilterInvalid { .. } => {
                if !args.events {
                    eprintln!("jsonlens: filter did not match");
                }
                code = ExitCode::FAILURE;
            }
            LensEvent::InputValid | LensEvent::FilterEmpty { .. } => {}
        }
    }
    Ok(code)
}

fn read_document(file: Option<&Path>) -> LensResult<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path).map_err(|error| {
            LensError::Io(std::io::Error::new(
                error.kind(),
                format!("failed to read {}: {error}", path.display()),
            ))
        }),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}
