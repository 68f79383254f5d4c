//! docasm - assemble documents from the command line
//!
//! Every command runs against the in-memory editing backend and prints its
//! JSON outcome to stdout. Logs go to stderr.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use assembly_engine::{AssemblySettings, BatchOperation, Session, SettingsLoader, Status, TextOptions};
use clap::{ArgAction, Parser, Subcommand};
use doc_backend::MemoryBackend;
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "docasm", about = "Assemble documents through a cursor-driven editing backend", version)]
struct Cli {
    /// Settings file (JSON); defaults are used when absent or unreadable
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory that relative output names are written under
    #[arg(long = "output-dir", value_name = "DIR", global = true)]
    output_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    verbosity: u8,

    /// Print the document's plain text to stderr when done
    #[arg(long = "print-text", global = true)]
    print_text: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a document from a JSON document spec
    Spec {
        /// Spec file, or `-` for stdin
        input: PathBuf,
    },
    /// Build a document from freeform text
    Text {
        /// Text file, or `-` for stdin
        input: PathBuf,
        /// Explicit title; otherwise the first line becomes the title
        #[arg(long)]
        title: Option<String>,
        /// Insert lines verbatim without heading or bullet detection
        #[arg(long = "no-format")]
        no_format: bool,
        /// Join the lines of each paragraph instead of keeping them apart
        #[arg(long = "join-lines")]
        join_lines: bool,
        /// Save the result under this name
        #[arg(long, value_name = "FILE")]
        save: Option<String>,
    },
    /// Run a JSON list of operations
    Batch {
        /// Operations file (a list, or an object with an `operations` list), or `-` for stdin
        input: PathBuf,
    },
    /// Create a table and fill it from table data
    Fill {
        #[arg(long)]
        rows: usize,
        #[arg(long)]
        cols: usize,
        /// Table data: a JSON array, literal list syntax, comma separated values or plain text
        data: String,
        /// Render the first row in bold
        #[arg(long)]
        header: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(dir) = cli.output_dir.clone() {
        settings.output.directory = Some(dir);
    }
    let mut session = Session::with_settings(MemoryBackend::new(), settings);

    let (status, output) = run(&cli.command, &mut session)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    if cli.print_text {
        match session.full_text() {
            Ok(text) => eprintln!("{}", text),
            Err(e) => tracing::warn!("Could not read document text: {}", e),
        }
    }

    Ok(if status == Status::Error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<AssemblySettings> {
    let Some(path) = path else {
        return Ok(AssemblySettings::default());
    };
    let mut loader = SettingsLoader::new(path);
    loader
        .load()
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    Ok(loader.into_settings())
}

fn run(command: &Command, session: &mut Session<MemoryBackend>) -> Result<(Status, Value)> {
    match command {
        Command::Spec { input } => {
            let spec: Value = serde_json::from_str(&read_input(input)?).context("document spec is not valid JSON")?;
            let outcome = session.create_document_from_spec(&spec);
            Ok((outcome.status, serde_json::to_value(&outcome)?))
        }
        Command::Text {
            input,
            title,
            no_format,
            join_lines,
            save,
        } => {
            let content = read_input(input)?;
            let options = TextOptions {
                title: title.clone(),
                format_content: !no_format,
                preserve_linebreaks: !join_lines,
            };
            let outcome = session.create_document_from_text(&content, &options, save.as_deref());
            Ok((outcome.status, serde_json::to_value(&outcome)?))
        }
        Command::Batch { input } => {
            let raw: Value = serde_json::from_str(&read_input(input)?).context("batch is not valid JSON")?;
            let list = match raw {
                Value::Object(mut map) => map.remove("operations").unwrap_or(Value::Array(Vec::new())),
                other => other,
            };
            let operations: Vec<BatchOperation> =
                serde_json::from_value(list).context("batch must be a list of operations")?;
            let report = session.run_batch(&operations);
            Ok((report.status, serde_json::to_value(&report)?))
        }
        Command::Fill {
            rows,
            cols,
            data,
            header,
        } => {
            let result = session
                .create_document()
                .and_then(|_| session.create_table_with_data(*rows, *cols, Some(&Value::String(data.clone())), *header));
            Ok(match result {
                Ok(report) => {
                    let message = report
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| format!("Table inserted with {} rows and {} columns", rows, cols));
                    (Status::Success, json!({ "status": Status::Success, "message": message }))
                }
                Err(e) => {
                    tracing::error!("Fill failed: {}", e);
                    (Status::Error, json!({ "status": Status::Error, "message": e.to_string() }))
                }
            })
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
