// reqparse - parse access-request documents and track the parsed records
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use reqparse::config;
use reqparse::parser::parse_request;
use reqparse::pdf_extraction;
use reqparse::report::{self, ExportFormat};
use reqparse::storage::{RequestMeta, RequestStore, RequestUpdate, StoredRequest};

#[derive(Parser, Debug)]
#[command(author, version, about = "Access request document parser and tracker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a request document and print the record as JSON
    Parse {
        file: PathBuf,
        /// Include extraction diagnostics in the output
        #[arg(long)]
        diagnostics: bool,
    },
    /// Parse a request document and store the record
    Ingest {
        file: PathBuf,
        /// Identity of the uploading user
        #[arg(short, long, default_value = "")]
        user: String,
    },
    /// List stored requests
    List {
        /// Only requests in this state
        #[arg(long)]
        state: Option<String>,
    },
    /// Show one stored request in full
    Show { id: i64 },
    /// Search stored requests by request number or requested-for
    Search { term: String },
    /// Update fields of a stored request
    Update {
        id: i64,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        work_notes: Option<String>,
        /// Closed date/time, recorded verbatim
        #[arg(long)]
        closed: Option<String>,
    },
    /// Delete a stored request
    Delete { id: i64 },
    /// Export stored requests as a report
    Export {
        /// Output path; "-" writes to stdout
        #[arg(default_value = "-")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Only requests in this state
        #[arg(long)]
        state: Option<String>,
    },
    /// Request tallies per state
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Parse { file, diagnostics } => cmd_parse(&file, diagnostics),
        Command::Ingest { file, user } => cmd_ingest(&file, &user),
        Command::List { state } => {
            let store = open_store()?;
            print_requests(&store.list(state.as_deref())?);
            Ok(())
        }
        Command::Show { id } => {
            let store = open_store()?;
            print_request(&store.get(id)?);
            Ok(())
        }
        Command::Search { term } => {
            let store = open_store()?;
            print_requests(&store.search(&term)?);
            Ok(())
        }
        Command::Update {
            id,
            state,
            work_notes,
            closed,
        } => {
            let store = open_store()?;
            store.update(
                id,
                &RequestUpdate {
                    state,
                    work_notes,
                    closed_at: closed,
                },
            )?;
            println!("request {} updated", id);
            Ok(())
        }
        Command::Delete { id } => {
            let mut store = open_store()?;
            store.delete(id)?;
            println!("request {} deleted", id);
            Ok(())
        }
        Command::Export { out, format, state } => cmd_export(&out, format, state.as_deref()),
        Command::Stats => {
            let store = open_store()?;
            for (state, count) in store.count_by_state()? {
                let state = if state.is_empty() { "(none)" } else { &state };
                println!("{:>6}  {}", count, state);
            }
            Ok(())
        }
    }
}

fn open_store() -> Result<RequestStore> {
    RequestStore::open(&config::database_path())
}

fn cmd_parse(file: &Path, diagnostics: bool) -> Result<()> {
    let text = pdf_extraction::document_text(file)?;
    let outcome = parse_request(&text)?;

    let json = if diagnostics {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string_pretty(&outcome.record)?
    };
    println!("{}", json);
    Ok(())
}

fn cmd_ingest(file: &Path, user: &str) -> Result<()> {
    let text = pdf_extraction::document_text(file)?;
    let outcome = parse_request(&text)?;

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let mut store = open_store()?;
    let id = store.create(&outcome.record, &RequestMeta::now(user, file_name))?;

    info!(id, request_number = %outcome.record.request_number, "request stored");
    println!("stored request {} ({})", id, display_number(&outcome.record.request_number));
    Ok(())
}

fn cmd_export(out: &Path, format: ExportFormat, state: Option<&str>) -> Result<()> {
    let store = open_store()?;
    let requests = store.list(state)?;
    let rendered = report::render(&requests, format)?;

    if out == Path::new("-") {
        print!("{}", rendered);
    } else {
        fs::write(out, rendered)
            .with_context(|| format!("failed to write report to {}", out.display()))?;
        println!("exported {} requests to {}", requests.len(), out.display());
    }
    Ok(())
}

fn display_number(request_number: &str) -> &str {
    if request_number.is_empty() {
        "no request number"
    } else {
        request_number
    }
}

fn print_requests(requests: &[StoredRequest]) {
    if requests.is_empty() {
        println!("no requests found");
        return;
    }
    for stored in requests {
        println!(
            "{:>4}  {:<12}  {:<24}  {:<18}  {}",
            stored.id,
            stored.record.request_number,
            stored.record.requested_for,
            stored.record.state,
            stored.meta.uploaded_at
        );
    }
}

fn print_request(stored: &StoredRequest) {
    let record = &stored.record;
    println!("id:               {}", stored.id);
    println!("request number:   {}", record.request_number);
    println!("requested for:    {}", record.requested_for);
    println!("state:            {}", record.state);
    println!("opened:           {}", record.opened_at);
    println!("closed:           {}", record.closed_at);
    println!("updated to open:  {}", record.updated_to_open);
    println!("short description: {}", record.short_description);
    println!("description:      {}", record.description);
    println!("work notes:       {}", record.work_notes);
    println!("uploaded by:      {}", stored.meta.uploaded_by);
    println!("file:             {}", stored.meta.file_name);
    println!("uploaded at:      {}", stored.meta.uploaded_at);

    if record.approvals.is_empty() {
        println!("approvals:        none");
    } else {
        println!("approvals:");
        for approval in &record.approvals {
            println!(
                "  {}  {}  {}  {} / {}",
                approval.state,
                approval.approver,
                approval.item,
                approval.created,
                approval.created_original
            );
        }
    }
}
