//! csvedit CLI - Edit CSV files with formulas and an audit log
//!
//! # Main Commands
//!
//! ```bash
//! csvedit serve                                   # Start HTTP server (port 3000)
//! csvedit apply data.csv --script edits.json      # Apply a command script
//! csvedit preview data.csv --filter city=Paris    # Filtered preview
//! ```
//!
//! # Helper Commands
//!
//! ```bash
//! csvedit eval "age + score" --set age=10 --set score=5
//! csvedit commands                                # Show available edit commands
//! ```

use clap::{Parser, Subcommand};
use csvedit::formula;
use csvedit::{
    commands_description, project, Cell, Command, FilterSpec, Session, SessionOptions,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "csvedit")]
#[command(about = "Edit CSV files with computed columns, filters and an audit log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON command script to a CSV file
    Apply {
        /// Input CSV file
        input: PathBuf,

        /// JSON file holding one command or an array of commands
        #[arg(short, long)]
        script: PathBuf,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the audit log to this file
        #[arg(long)]
        log: Option<PathBuf>,

        /// Columns to export, in order (default: all)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Print a filtered preview of a CSV file
    Preview {
        /// Input CSV file
        input: PathBuf,

        /// Keep rows where COLUMN equals VALUE (repeatable)
        #[arg(short, long = "filter", value_name = "COLUMN=VALUE", value_parser = parse_assignment)]
        filters: Vec<(String, String)>,

        /// Columns to show (default: all)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Maximum rows to print (default: CSVEDIT_PREVIEW_ROWS or 50)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Evaluate a formula against a single row
    Eval {
        /// Formula, e.g. "age + score"
        expr: String,

        /// Cell value available to the formula (repeatable)
        #[arg(short, long = "set", value_name = "COLUMN=VALUE", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },

    /// Show available edit commands
    Commands,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply {
            input,
            script,
            output,
            log,
            columns,
        } => cmd_apply(&input, &script, output.as_deref(), log.as_deref(), &columns),

        Commands::Preview {
            input,
            filters,
            columns,
            limit,
        } => cmd_preview(&input, filters, &columns, limit),

        Commands::Eval { expr, values } => cmd_eval(&expr, values),

        Commands::Commands => cmd_commands(),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Parse `COLUMN=VALUE`. The value may be empty or contain `=`.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, value)) if !column.is_empty() => {
            Ok((column.to_string(), value.to_string()))
        }
        _ => Err(format!("expected COLUMN=VALUE, got '{}'", s)),
    }
}

fn open_session(input: &Path) -> Result<Session, Box<dyn std::error::Error>> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "input.csv".to_string());
    let bytes = fs::read(input)?;
    let session = Session::open(name, &bytes)?.with_options(SessionOptions::from_env());

    eprintln!("   Rows: {}", session.dataset().row_count());
    eprintln!("   Columns: {}", session.dataset().columns().join(", "));
    Ok(session)
}

fn selection(columns: &[String]) -> Option<&[String]> {
    if columns.is_empty() {
        None
    } else {
        Some(columns)
    }
}

fn cmd_apply(
    input: &Path,
    script: &Path,
    output: Option<&Path>,
    log: Option<&Path>,
    columns: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());
    let mut session = open_session(input)?;

    let content = fs::read_to_string(script)?;
    let commands = Command::list_from_json(&content)?;
    eprintln!("\n⚙️  Applying {} command(s) from {}", commands.len(), script.display());

    for (i, command) in commands.into_iter().enumerate() {
        let kind = command.kind();
        session
            .apply(command)
            .map_err(|e| format!("command {} ({}) failed: {}", i + 1, kind, e))?;
    }

    eprintln!(
        "\n✅ {} change(s) recorded, {} rows x {} columns",
        session.audit_log().len(),
        session.dataset().row_count(),
        session.dataset().column_count()
    );

    if let Some(log_path) = log {
        fs::write(log_path, session.export_log())?;
        eprintln!("   📝 Log saved to: {}", log_path.display());
    }

    write_output(&session.export_csv(selection(columns)), output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_preview(
    input: &Path,
    filters: Vec<(String, String)>,
    columns: &[String],
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Previewing: {}", input.display());
    let session = open_session(input)?;

    let filter: FilterSpec = filters.into_iter().collect();
    let cap = limit.unwrap_or(session.options().preview_rows);
    let preview = project(session.dataset(), &filter, selection(columns), cap);

    println!("{}", preview.to_csv());
    eprintln!("\n{}", preview.summary());
    Ok(())
}

fn cmd_eval(expr: &str, values: Vec<(String, String)>) -> Result<(), Box<dyn std::error::Error>> {
    let row: BTreeMap<String, Cell> = values
        .into_iter()
        .map(|(column, value)| (column, Cell::from(value)))
        .collect();

    let result = formula::evaluate(expr, &row)?;
    println!("{}", result);
    Ok(())
}

fn cmd_commands() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", commands_description());
    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    csvedit::server::start_server(port, SessionOptions::from_env()).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
