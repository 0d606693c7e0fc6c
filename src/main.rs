use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use paygate::config::Config;
use paygate::db::{self, AppState};
use paygate::handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("paygate=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    let pool = db::create_pool(&config.database_path)?;
    let conn = pool.get()?;
    db::init_db(&conn)?;
    drop(conn);

    let state = AppState {
        db: pool,
        providers: Arc::new(config.providers.clone()),
        pricing: Arc::new(config.pricing.clone()),
        base_url: config.base_url.clone(),
    };

    let app = handlers::app(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, dev_mode = config.dev_mode, "paygate listening");
    axum::serve(listener, app).await?;

    Ok(())
}
