use anyhow::Context;
use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing::info;

use exml_language_server::logging;
use exml_language_server::lsp::Backend;

/// Language server for the EXML UI markup dialect.
#[derive(Debug, Parser)]
#[command(name = "exml-language-server", version, about)]
struct Args {
    /// Disable ANSI colors on stderr.
    #[arg(long)]
    no_color: bool,

    /// Override the stderr log level (otherwise RUST_LOG or "info").
    #[arg(long)]
    log_level: Option<String>,

    /// Disable the per-session debug log file.
    #[arg(long)]
    no_file_log: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = logging::init_logger(args.no_color, args.log_level.as_deref(), !args.no_file_log)
        .context("failed to initialize logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting EXML language server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    info!("server stopped");
    Ok(())
}
