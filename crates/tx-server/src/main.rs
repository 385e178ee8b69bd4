//! Illustrative HTTP binary wiring the terminology operation workers onto
//! `axum`, in the teacher's `ServerBuilder`/`init_tracing` style (spec §1,
//! §6) — package crawling, multi-version wire transforms, and a real
//! canonical-manager-backed catalog remain external collaborators; this
//! binary only loads a flat directory of resource JSON files.

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::BoxError;
use clap::Parser;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tx_server::catalog::DirectoryCatalog;
use tx_server::config::loader::load_config_with_default_path;
use tx_server::state::AppState;
use tx_server::routes;

#[derive(Parser, Debug)]
#[command(name = "tx-server", about = "Terminology operations over axum")]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./tx-server.toml if present).
    #[arg(long)]
    config: Option<String>,
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn handle_timeout(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "operation deadline exceeded".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("unhandled error: {err}"))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app_config = match load_config_with_default_path(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&app_config.logging.level);

    let catalog = match &app_config.packages.path {
        Some(path) => DirectoryCatalog::load_from_dir(path).unwrap_or_else(|err| {
            tracing::warn!(%err, "failed to load package directory, starting with an empty catalog");
            DirectoryCatalog::empty()
        }),
        None => DirectoryCatalog::empty(),
    };

    let timeout = app_config.operation_timeout();
    let state = AppState::new(&app_config, catalog);
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(timeout)),
        );

    let addr = app_config.addr();
    tracing::info!(%addr, "starting terminology server");
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind listener");
    axum::serve(listener, app).await.expect("server error");
}
