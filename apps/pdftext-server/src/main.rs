//! PDF text extraction server
//!
//! Fetches documents from an authenticated document store on behalf of the
//! caller and returns their text. Provides REST API endpoints for:
//!
//! - Text extraction (`POST /api/v1/documents/extract-text`)
//! - Health reporting (`GET /api/v1/health`)
//!
//! ## Configuration
//!
//! Listener and limits come from command-line flags. The vision OCR backend
//! and CORS origins come from the environment (a `.env` file is honored):
//!
//! - `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_DEPLOYMENT`,
//!   `AZURE_OPENAI_API_VERSION`
//! - `ALLOWED_ORIGINS`: comma separated, default `http://localhost:3978`
//! - `PDFIUM_LIBRARY_PATH`: directory holding the PDFium shared library

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pdftext_core::{
    AzureVisionRecognizer, ExtractionLimits, ExtractionOrchestrator, HttpFetcher,
    LopdfTextExtractor, PdfiumRasterizer, VisionConfig, VisionRecognizer,
};

mod api;
mod error;

use api::{handle_extract_text, handle_health};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3978";

/// Command-line arguments for the extraction server
#[derive(Parser, Debug)]
#[command(name = "pdftext-server")]
#[command(about = "Extracts text from stored PDF documents, with vision OCR for scans")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Document fetch timeout in seconds
    #[arg(long, default_value = "60")]
    fetch_timeout_secs: u64,

    /// Largest accepted document in megabytes
    #[arg(long, default_value = "10")]
    max_size_mb: usize,

    /// Directory containing the PDFium library
    #[arg(long, env = "PDFIUM_LIBRARY_PATH")]
    pdfium_library_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ExtractionOrchestrator>,
}

/// Routes with CORS and request tracing applied
pub fn build_router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/documents/extract-text", post(handle_extract_text))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Parse a comma separated origin list, skipping blank or invalid entries
pub fn parse_allowed_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect()
}

/// Convert the `--max-size-mb` flag to bytes, rejecting values that overflow
pub fn megabytes_to_bytes(megabytes: usize) -> anyhow::Result<usize> {
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("--max-size-mb {} is too large", megabytes))
}

fn build_recognizer(config: &VisionConfig) -> Option<Arc<dyn VisionRecognizer>> {
    match AzureVisionRecognizer::from_config(config) {
        Ok(recognizer) => Some(Arc::new(recognizer)),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before parsing so env-backed flags see it
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PDF extraction server on {}:{}", args.host, args.port);

    let limits = ExtractionLimits {
        max_document_bytes: megabytes_to_bytes(args.max_size_mb)?,
        ..ExtractionLimits::default()
    };

    let fetcher = HttpFetcher::new(Duration::from_secs(args.fetch_timeout_secs))?;
    let rasterizer = PdfiumRasterizer::new(args.pdfium_library_path.as_deref());
    let recognizer = build_recognizer(&VisionConfig::from_env());

    let orchestrator = ExtractionOrchestrator::new(
        Arc::new(fetcher),
        Arc::new(LopdfTextExtractor),
        Arc::new(rasterizer),
        recognizer,
        limits,
    );
    info!("Vision OCR available: {}", orchestrator.vision_available());

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };

    let raw_origins =
        std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string());
    let origins = parse_allowed_origins(&raw_origins);
    info!("CORS origins: {}", raw_origins);

    let app = build_router(state, origins);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Max document size: {}MB", args.max_size_mb);
    info!("Fetch timeout: {}s", args.fetch_timeout_secs);

    axum::serve(listener, app).await?;

    Ok(())
}
