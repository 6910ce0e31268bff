//! # tallysheet-server
//!
//! HTTP intake for merchandising field reports. The boundary is thin:
//! validate the payload shape, hand the report to the projector, map its
//! error taxonomy onto status codes.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde_json::{json, Value as JsonValue};
use std::path::PathBuf;
use std::sync::Arc;
use tallysheet_core::{ProjectorConfig, ReportPayload, TallyError};
use tallysheet_gsheets::SheetsClient;
use tallysheet_projector::Projector;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// tallysheet - projects field reports into per-merchandiser spreadsheets
#[derive(Parser)]
#[command(name = "tallysheet-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on (defaults to $PORT, then 8080)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the projector configuration (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

/// Create the application router.
///
/// This is separated from `main()` to allow testing.
fn create_router(projector: Arc<Projector>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health))
        .route("/report", post(report))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(projector)
}

async fn ping() -> &'static str {
    "tallysheet is running"
}

async fn health() -> &'static str {
    "OK"
}

/// Accept a report and project it. The body is taken as raw JSON so shape
/// problems surface as a 400 with our error body instead of an extractor
/// rejection.
async fn report(
    State(projector): State<Arc<Projector>>,
    Json(body): Json<JsonValue>,
) -> (StatusCode, Json<JsonValue>) {
    let payload: ReportPayload = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid payload format: {err}") })),
            );
        }
    };

    let report = match payload.into_report() {
        Ok(report) => report,
        Err(err) => return error_response(&err),
    };

    match projector.append_report(&report).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "status": "Report appended",
                "tab": summary.tab,
                "matched": summary.matched
            })),
        ),
        Err(err) => error_response(&err),
    }
}

/// `--port` wins, then a parseable `PORT` variable, then 8080.
fn resolve_port(cli_port: Option<u16>, env_port: Option<String>) -> u16 {
    cli_port
        .or_else(|| env_port.and_then(|p| p.parse().ok()))
        .unwrap_or(8080)
}

fn error_response(err: &TallyError) -> (StatusCode, Json<JsonValue>) {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "error": err.to_string() })))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = ProjectorConfig::from_json_file(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    let token = std::env::var("SHEETS_TOKEN")
        .context("SHEETS_TOKEN must hold a Sheets API bearer token")?;
    let store = Arc::new(SheetsClient::new(token)?);
    let projector = Arc::new(Projector::new(config, store));

    let app = create_router(projector);
    let port = resolve_port(cli.port, std::env::var("PORT").ok());
    let addr = format!("0.0.0.0:{port}");
    tracing::info!(%addr, "tallysheet-server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
