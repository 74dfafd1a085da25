/// TMS server entry point
use std::process::ExitCode;
use std::sync::Arc;
use tms_server::{
    bootstrap, config::ServerConfig, context::AppContext, error, jobs::JobScheduler, server,
    AppResult,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // Environment decides the log format, so it is read before anything else
    dotenv::dotenv().ok();
    let production = std::env::var("TMS_ENV")
        .map(|env| env.trim().eq_ignore_ascii_case("production"))
        .unwrap_or(false);
    init_tracing(production);

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(production: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tms_server=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if production {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run() -> AppResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;
    config.validate()?;
    error::set_expose_details(!config.service.environment.is_production());

    tracing::info!(
        "Starting TMS server v{} ({:?})",
        env!("CARGO_PKG_VERSION"),
        config.service.environment
    );

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    if let Some(superadmin) = ctx.config.authentication.superadmin.clone() {
        bootstrap::ensure_superadmin(&ctx, &superadmin).await?;
    }

    // Start background jobs
    let scheduler = Arc::new(JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await
}
