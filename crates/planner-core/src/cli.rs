use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::mode::PlannerMode;
use crate::task::{TaskId, TimeUnit};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "planner",
    version,
    about = "Daily, fitness and study planner with a calendar and a study timer"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Override an rc setting, e.g. `--rc api.url=http://host:3000/api`.
    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "plannerrc", global = true)]
    pub plannerrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// generic (daily), fitness or study. Defaults to `default.mode`.
    #[arg(short = 'm', long = "mode", global = true)]
    pub mode: Option<PlannerMode>,

    /// Selected day: today, tomorrow, yesterday or YYYY-MM-DD.
    #[arg(short = 'd', long = "date", global = true)]
    pub date: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in and remember the user for later commands.
    Login {
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    /// Calendar and the selected day (default).
    Show,
    Calendar {
        /// Month to show as YYYY-MM.
        #[arg(long)]
        month: Option<String>,
    },
    /// Tasks of the selected day.
    List,
    Add(AddArgs),
    Toggle {
        id: TaskId,
    },
    Remove {
        id: TaskId,
    },
    /// Remove completed tasks of the selected day.
    ClearCompleted,
    Stats,
    /// Time a study task interactively.
    Timer {
        id: TaskId,
    },
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,

    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long)]
    pub duration: Option<i64>,

    #[arg(long, default_value = "min")]
    pub unit: TimeUnit,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    Users,
    Tasks { email: String },
    DeleteUser { email: String },
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = match (quiet, verbose) {
        (q, _) if q >= 2 => "error",
        (1, _) => "warn",
        (_, v) if v >= 3 => "trace",
        (_, 2) => "debug",
        (_, 1) => "info",
        _ => "warn",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_duration() {
        let cli = GlobalCli::parse_from([
            "planner", "--mode", "fitness", "add", "Morning", "run", "--duration", "90", "--unit",
            "sec",
        ]);
        assert_eq!(cli.mode, Some(PlannerMode::Fitness));
        match cli.command {
            Some(Command::Add(args)) => {
                assert_eq!(args.text.join(" "), "Morning run");
                assert_eq!(args.duration, Some(90));
                assert_eq!(args.unit, TimeUnit::Second);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = GlobalCli::parse_from([
            "planner", "list", "--date", "2026-10-20", "--rc", "color=off", "-vv",
        ]);
        assert_eq!(cli.date.as_deref(), Some("2026-10-20"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "color");
        assert_eq!(cli.rc_overrides[0].value, "off");
    }

    #[test]
    fn daily_is_an_alias_for_generic() {
        let cli = GlobalCli::parse_from(["planner", "-m", "daily"]);
        assert_eq!(cli.mode, Some(PlannerMode::Generic));
        assert!(cli.command.is_none());
    }

    #[test]
    fn admin_subcommands() {
        let cli = GlobalCli::parse_from(["planner", "admin", "delete-user", "ana@example.com"]);
        assert!(matches!(
            cli.command,
            Some(Command::Admin(AdminCommand::DeleteUser { ref email })) if email == "ana@example.com"
        ));
        assert!(GlobalCli::try_parse_from(["planner", "add"]).is_err());
    }
}
