// src/main.rs

use std::path::PathBuf;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use recon_graph::core::store::{Graph, StoredFinding, StoredTarget};
use recon_graph::logging::initialize_logging;
use recon_graph::{import_document, scan_and_ingest, IngestSummary, MemoryStore, ScanOptions};

#[derive(Debug, Parser)]
#[command(name = "recon-graph", version, about = "Builds a risk-scored asset graph from recon data")]
struct Cli {
    /// Write logs here instead of the per-user data directory.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Also print warnings to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write the JSON report to a file instead of stdout.
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe one or more targets and build their graph.
    Scan(ScanArgs),
    /// Build a graph from a recon JSON document.
    Import {
        /// Path to the document.
        file: PathBuf,
        /// Session name; defaults to "Import <timestamp>".
        #[arg(long)]
        session_name: Option<String>,
    },
}

#[derive(Debug, Args)]
struct ScanArgs {
    /// Hosts or URLs, e.g. `example.com` or `http://10.0.0.5:8080`.
    #[arg(required = true)]
    targets: Vec<String>,

    /// JSON file with scan options; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ports, e.g. `22,80,8000-8100`.
    #[arg(long)]
    ports: Option<String>,

    /// Paths, comma separated, e.g. `/admin,/.git`.
    #[arg(long)]
    paths: Option<String>,

    /// Per-attempt timeout in seconds.
    #[arg(long)]
    timeout: Option<f64>,

    #[arg(long)]
    max_redirects: Option<usize>,

    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long)]
    no_port_scan: bool,

    #[arg(long)]
    no_dir_scan: bool,

    #[arg(long)]
    no_http_probe: bool,
}

impl ScanArgs {
    fn options(&self) -> Result<ScanOptions> {
        let mut options = match &self.config {
            Some(path) => ScanOptions::from_file(path)?,
            None => ScanOptions::default(),
        };
        if let Some(ports) = &self.ports {
            options.ports = ports.clone();
        }
        if let Some(paths) = &self.paths {
            options.paths = paths.clone();
        }
        if let Some(timeout) = self.timeout {
            options.timeout = timeout;
        }
        if let Some(max_redirects) = self.max_redirects {
            options.max_redirects = max_redirects;
        }
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency;
        }
        options.port_scan &= !self.no_port_scan;
        options.dir_scan &= !self.no_dir_scan;
        options.http_probe &= !self.no_http_probe;
        Ok(options)
    }
}

#[derive(Debug, Serialize)]
struct Report {
    session_id: i64,
    summary: IngestSummary,
    graph: Graph,
    findings: Vec<StoredFinding>,
    targets: Vec<StoredTarget>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let log_path = initialize_logging(cli.log_file.as_deref(), cli.verbose)?;
    info!(log = %log_path.display(), "Logging initialized.");

    let store = MemoryStore::new();

    let (session_id, summary) = match &cli.command {
        Command::Scan(args) => {
            let options = args.options()?;
            let session_id = store.create_session(&format!("Scan {}", Local::now().format("%Y-%m-%d %H:%M")), &args.targets.join(","))?;
            store.set_session_status(session_id, "scanning")?;
            let summary = scan_and_ingest(&store, session_id, &args.targets, &options).await?;
            store.set_session_status(session_id, "done")?;
            (session_id, summary)
        }
        Command::Import { file, session_name } => {
            let raw = std::fs::read_to_string(file).wrap_err_with(|| format!("reading {}", file.display()))?;
            let document: Value = serde_json::from_str(&raw).wrap_err("import file is not JSON")?;
            let root = document.get("root_domain").and_then(Value::as_str).unwrap_or_default().to_string();
            let name = session_name
                .clone()
                .unwrap_or_else(|| format!("Import {}", Local::now().format("%Y-%m-%d %H:%M")));
            let session_id = store.create_session(&name, &root)?;
            let summary = import_document(&store, session_id, &document)?;
            store.set_session_status(session_id, "imported")?;
            (session_id, summary)
        }
    };

    let report = Report {
        session_id,
        summary,
        graph: store.graph(session_id)?,
        findings: store.findings(session_id)?,
        targets: store.targets(session_id)?,
    };
    let rendered = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => std::fs::write(path, rendered).wrap_err_with(|| format!("writing {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}
