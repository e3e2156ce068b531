mod account;
mod admin;
mod tasks;
mod timer;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, instrument, warn};

use crate::app::PlannerApp;
use crate::cli::Command;
use crate::config::Config;
use crate::datetime::local_date;
use crate::mode::PlannerMode;
use crate::remote::{ApiClient, Partition, RemoteStore};
use crate::render::Renderer;
use crate::session::{Session, SessionFile};
use crate::store::TaskStore;

/// Everything a command needs, resolved once from flags and config.
pub struct Context {
    pub cfg: Config,
    pub renderer: Renderer,
    pub sessions: SessionFile,
    pub client: ApiClient,
    pub remote: Arc<dyn RemoteStore>,
    pub tz: Tz,
    pub mode: PlannerMode,
    pub selected: NaiveDate,
}

impl Context {
    pub fn today(&self) -> NaiveDate {
        local_date(Utc::now(), &self.tz)
    }

    pub fn session(&self) -> Option<Session> {
        self.sessions.load()
    }

    /// Loads the signed-in user's partition for the current mode. Without a
    /// session the planner still works but nothing is saved.
    pub async fn open_planner(&self) -> PlannerApp {
        let store = match self.session() {
            Some(session) => {
                let partition = Partition::new(session.email, self.mode);
                TaskStore::load(self.remote.clone(), partition, self.tz).await
            }
            None => {
                warn!("not signed in; changes will not be saved");
                TaskStore::detached(self.tz)
            }
        };
        let mut app = PlannerApp::new(self.mode, store, self.today());
        app.select_date(self.selected);
        app
    }
}

#[instrument(skip(ctx, command), fields(mode = %ctx.mode, selected = %ctx.selected))]
pub async fn dispatch(ctx: &Context, command: Option<Command>) -> anyhow::Result<()> {
    let command = command.unwrap_or(Command::Show);
    debug!(?command, "dispatching command");

    match command {
        Command::Register {
            name,
            email,
            password,
        } => account::register(ctx, &name, &email, password).await,
        Command::Login { email, password } => account::login(ctx, &email, password).await,
        Command::Logout => account::logout(ctx),
        Command::Whoami => account::whoami(ctx),
        Command::Show => tasks::show(ctx).await,
        Command::Calendar { month } => tasks::calendar(ctx, month.as_deref()).await,
        Command::List => tasks::list(ctx).await,
        Command::Add(args) => tasks::add(ctx, args).await,
        Command::Toggle { id } => tasks::toggle(ctx, id).await,
        Command::Remove { id } => tasks::remove(ctx, id).await,
        Command::ClearCompleted => tasks::clear_completed(ctx).await,
        Command::Stats => tasks::stats(ctx).await,
        Command::Timer { id } => timer::run(ctx, id).await,
        Command::Admin(admin) => admin::run(ctx, admin).await,
    }
}

/// One trimmed line from stdin, prompting on stderr.
async fn prompt_line(prompt: &str) -> anyhow::Result<String> {
    eprint!("{prompt}");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line.trim().to_string())
}
