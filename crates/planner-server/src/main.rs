use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use planner_server::ServerConfig;
use tracing::{
  error,
  info,
  warn
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{
  EnvFilter,
  fmt
};

#[derive(Parser, Debug)]
#[command(
  name = "planner-server",
  version,
  about = "HTTP API for planner accounts \
           and task storage"
)]
struct Args {
  /// TOML config file.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Overrides the configured port.
  #[arg(long)]
  port:   Option<u16>
}

fn init_tracing() {
  let filter =
    EnvFilter::try_from_default_env()
      .or_else(|_| {
        EnvFilter::try_new(
          "info,planner_server=debug,\
           planner_core=debug"
        )
      })
      .unwrap_or_else(|_| {
        EnvFilter::new("info")
      });

  let _ =
    tracing_subscriber::registry()
      .with(filter)
      .with(
        fmt::layer()
          .with_target(true)
          .with_line_number(true)
      )
      .try_init();
}

#[tokio::main]
async fn main() {
  init_tracing();
  let args = Args::parse();

  if let Err(err) = run(args).await {
    error!(
      error = %format!("{err:#}"),
      "planner server failed"
    );
    std::process::exit(1);
  }
}

async fn run(
  args: Args
) -> anyhow::Result<()> {
  let mut cfg = ServerConfig::load(
    args.config.as_deref()
  )?;
  if let Some(port) = args.port {
    cfg.port = port;
  }
  info!(
    db = %cfg.database.display(),
    seed_admin = cfg.admin.is_some(),
    "starting planner server"
  );

  let state = tokio::task::spawn_blocking({
    let cfg = cfg.clone();
    move || planner_server::prepare_state(&cfg)
  })
  .await
  .context("database setup panicked")??;

  let addr = cfg.socket_addr()?;
  let listener =
    tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| {
        format!("failed to bind {addr}")
      })?;

  planner_server::serve(
    listener,
    state,
    async {
      wait_for_shutdown_signal().await;
      warn!(
        "received shutdown signal; \
         draining connections"
      );
    }
  )
  .await
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
  use tokio::signal::unix::{
    SignalKind,
    signal
  };

  let mut sigterm = match signal(
    SignalKind::terminate()
  ) {
    | Ok(stream) => stream,
    | Err(error) => {
      error!(
        %error,
        "failed to register SIGTERM \
         handler; falling back to \
         ctrl_c"
      );
      let _ =
        tokio::signal::ctrl_c().await;
      return;
    }
  };

  tokio::select! {
    _ = tokio::signal::ctrl_c() => {}
    _ = sigterm.recv() => {}
  }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
  if let Err(error) =
    tokio::signal::ctrl_c().await
  {
    error!(
      %error,
      "failed waiting for ctrl_c \
       signal"
    );
  }
}
