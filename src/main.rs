use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use lendcore::api::{self, ApiState};
use lendcore::config::Config;
use lendcore::core::System;
use lendcore::service::oracle::RestTickerSource;
use lendcore::service::{AccountService, AllowListService, PriceService};
use lendcore::store::Db;
use lendcore::worker::payee::Payee;
use lendcore::worker::priceoracle::PriceOracleWorker;
use lendcore::worker::{Job, TickWorker};

#[derive(Parser)]
#[command(name = "lendcore", version, about = "Multisig custodial lending back-end")]
struct Cli {
    /// Path to a TOML configuration file; LENDCORE_* env vars override it.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the REST API server
    Server,
    /// Run the payee and price oracle workers
    Worker,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::markets::list_markets,
        api::markets::get_market,
        api::accounts::get_liquidity,
    ),
    components(schemas(
        api::models::HealthResponse,
        api::models::MarketView,
        api::models::LiquidityResponse,
        api::models::ErrorResponse,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "markets", description = "Money market state and rates"),
        (name = "accounts", description = "Account liquidity"),
    ),
    info(
        title = "Lendcore API",
        version = "0.1.0",
        description = "Read-only facade over the lending protocol state",
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lendcore=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Server => run_server(config).await,
        Command::Worker => run_worker(config).await,
    }
}

async fn run_server(config: Config) -> Result<()> {
    let db = Db::new();
    let prices = PriceService::new(config.oracle.price_block_secs);
    let accounts = AccountService::new(prices);
    let state = Arc::new(ApiState::new(db, prices, accounts));

    let mut app = axum::Router::new()
        .nest("/api/v1", api::routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    if config.api.cors_enabled {
        app = app.layer(CorsLayer::permissive());
    }
    let app = app.with_state(state);

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("server running on http://{addr}");
    info!("swagger ui available at http://{addr}/swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

async fn run_worker(config: Config) -> Result<()> {
    // Missing or inconsistent system keys are fatal at startup.
    let system = System::from_config(&config.system)?;
    let db = Db::new();
    let prices = PriceService::new(config.oracle.price_block_secs);
    let accounts = AccountService::new(prices);
    let allowlist = AllowListService::new(&config.allowlists);

    let payee: Arc<dyn Job> = Arc::new(Payee::new(
        db.clone(),
        system.clone(),
        accounts,
        prices,
        allowlist,
        config.worker.batch_limit,
    ));
    let oracle: Arc<dyn Job> = Arc::new(PriceOracleWorker::new(
        db.clone(),
        system,
        prices,
        Arc::new(RestTickerSource::new(&config.oracle.endpoint)),
        Arc::new(NoopWalletClient),
        config.oracle.ticker_ttl_days,
    ));

    let token = CancellationToken::new();
    let err_delay = Duration::from_millis(config.worker.error_delay_ms);
    let jobs = [
        (payee, Duration::from_millis(config.worker.payee_interval_ms)),
        (
            oracle,
            Duration::from_millis(config.worker.oracle_interval_ms),
        ),
    ];

    let mut handles = Vec::new();
    for (job, delay) in jobs {
        let worker = TickWorker { delay, err_delay };
        handles.push(tokio::spawn(worker.run(job, token.child_token())));
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down workers");
    token.cancel();
    futures::future::join_all(handles).await;
    Ok(())
}

/// Placeholder wallet boundary: the network client that broadcasts multisig
/// transfers is deployment-specific and wired in by the embedding service.
struct NoopWalletClient;

#[async_trait::async_trait]
impl lendcore::service::WalletClient for NoopWalletClient {
    async fn submit_transfer(&self, transfer: lendcore::service::MultisigTransfer) -> Result<()> {
        info!(
            trace = transfer.trace_id,
            asset = transfer.asset_id,
            amount = %transfer.amount,
            "multisig transfer queued (no wallet client configured)"
        );
        Ok(())
    }
}
