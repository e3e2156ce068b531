pub mod app;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod mode;
pub mod remote;
pub mod render;
pub mod session;
pub mod stats;
pub mod store;
pub mod sync;
pub mod task;
pub mod timer;
pub mod view;

use std::ffi::OsString;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting planner CLI"
  );

  let mut cfg = config::Config::load(
    cli.plannerrc.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .iter()
      .map(|kv| {
        (kv.key.clone(), kv.value.clone())
      })
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let tz = datetime::planner_timezone();
  let today = datetime::local_date(
    Utc::now(),
    &tz
  );
  let selected = match cli.date.as_deref()
  {
    | Some(raw) => {
      datetime::parse_date_arg(
        raw, today
      )?
    }
    | None => today
  };
  let mode = match cli.mode {
    | Some(mode) => mode,
    | None => cfg.default_mode()?
  };

  let client = remote::ApiClient::new(
    cfg.api_url()
  )?;
  debug!(api = %client.base_url(), data_dir = %data_dir.display(), "resolved endpoints");

  let ctx = commands::Context {
    renderer: render::Renderer::new(
      &cfg
    ),
    sessions:
      session::SessionFile::open(
        &data_dir
      )?,
    remote: Arc::new(client.clone()),
    client,
    cfg,
    tz,
    mode,
    selected
  };

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;
  runtime.block_on(commands::dispatch(
    &ctx,
    cli.command
  ))?;

  info!("done");
  Ok(())
}
