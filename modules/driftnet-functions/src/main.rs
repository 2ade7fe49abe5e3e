use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    routing::get,
};
use clap::{Parser, ValueEnum};
use driftnet_common::{AppConfig, StoreKind};
use driftnet_functions::{function_router, register_builtins, FunctionRegistry};
use driftnet_store::{open_store, StoreBackend};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "driftnet-server", about = "Serve registered driftnet functions over HTTP")]
struct Cli {
    /// Index used when a call does not name one
    #[arg(long, default_value = "demo")]
    index: String,

    #[arg(long, value_enum, default_value_t = Backend::File)]
    store: Backend,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    File,
    Postgres,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("driftnet=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let kind = match cli.store {
        Backend::File => StoreKind::File,
        Backend::Postgres => StoreKind::Postgres,
    };
    let store = open_store(&StoreBackend::from_kind(kind, &config)?).await?;

    let registry = register_builtins(FunctionRegistry::builder(), store, &cli.index).build()?;
    for spec in registry.specs() {
        info!(
            name = spec.name.as_str(),
            method = %spec.method,
            max_concurrency = spec.max_concurrency,
            "Registered function"
        );
    }

    let app = function_router(Arc::new(registry))
        // Health check
        .route("/", get(|| async { "ok" }))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.host, config.port);
    info!("driftnet-server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
