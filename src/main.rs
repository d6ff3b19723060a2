use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chromaudit::browser::{self, BrowserConfig};
use chromaudit::context::AuditContext;
use chromaudit::error::Result;
use chromaudit::graph::Graph;
use chromaudit::handler::Handler;
use chromaudit::writer::{RelationWriter, DEFAULT_FLUSH_THRESHOLD};

/// Audit a running Chromium-family browser over the DevTools protocol and
/// emit the browsing provenance graph as relation files.
#[derive(Debug, Parser)]
#[command(name = "chromaudit", version, about)]
struct Args {
    /// Host of the browser's DevTools endpoint.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port of the browser's DevTools endpoint.
    #[arg(long, default_value_t = 9222)]
    port: u16,

    /// Directory the relation files are written to.
    #[arg(long, default_value = "neo4j-csvs")]
    output_dir: PathBuf,

    /// Rotate output files after this many buffered rows.
    #[arg(long, default_value_t = DEFAULT_FLUSH_THRESHOLD)]
    flush_threshold: usize,

    /// How many times to retry the startup handshake while the browser
    /// is not up yet (one attempt per second).
    #[arg(long, default_value_t = 600)]
    connect_retries: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chromaudit=info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "auditor failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = BrowserConfig {
        host: args.host,
        port: args.port,
        connect_retries: args.connect_retries,
    };
    let (conn, version) = browser::connect(&config).await?;

    let ctx = AuditContext::new(version.user_agent);
    println!("Current session: {}", ctx.session_id());
    let writer = RelationWriter::new(&args.output_dir, args.flush_threshold)?;
    let graph = Graph::new(ctx, writer);

    let mut handler = Handler::new(conn, graph);
    handler.init().await?;
    handler.run().await
}
