use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use research_assistant::{
    api,
    assistant::{AssistantApi, AssistantService},
    config, logging,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::net::TcpListener;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "research-assistant",
    about = "PDF research assistant backed by Qdrant and Ollama"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default).
    Serve {
        /// Port to bind; overrides SERVER_PORT.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Upload and index every PDF found under a directory.
    Ingest {
        /// Directory to walk.
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("failed to load configuration")?;
    logging::init_tracing();

    let service = AssistantService::new(config)
        .await
        .context("failed to initialize assistant service")?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(Arc::new(service), port.or(config.server_port)).await,
        Command::Ingest { dir } => ingest(&service, &dir).await,
    }
}

async fn serve(service: Arc<AssistantService>, port: Option<u16>) -> Result<()> {
    let app = api::create_router(service);
    let (listener, port) = bind_listener(port)
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn ingest(service: &AssistantService, dir: &Path) -> Result<()> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .map(|e| e.into_path())
        .collect();
    tracing::info!(dir = %dir.display(), files = files.len(), "Starting ingest");

    let mut failed = 0usize;
    for path in &files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match service.upload(filename, bytes).await {
            Ok(outcome) => println!(
                "{}\t{}\t{} chunks",
                outcome.document_id,
                path.display(),
                outcome.chunk_count
            ),
            Err(error) => {
                failed += 1;
                tracing::error!(path = %path.display(), kind = error.kind(), error = %error, "Ingest failed");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} files failed to ingest", files.len());
    }
    Ok(())
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8000..=8099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 8000-8099",
    ))
}
