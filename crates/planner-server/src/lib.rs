pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;

/// Opens the database, seeds the admin account and returns ready state.
pub fn prepare_state(cfg: &ServerConfig) -> anyhow::Result<AppState> {
    let pool = db::open_pool(&cfg.database, cfg.pool_size)?;
    let state = AppState::new(pool);
    if let Some(seed) = &cfg.admin {
        state.seed_admin(seed)?;
    }
    Ok(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<S>(listener: TcpListener, state: AppState, shutdown: S) -> anyhow::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "planner api listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("planner api stopped");
    Ok(())
}
