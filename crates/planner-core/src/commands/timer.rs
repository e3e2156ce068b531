use anyhow::anyhow;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::Context;
use crate::app::PlannerApp;
use crate::task::TaskId;
use crate::timer::{TICK_PERIOD, Ticker};

enum Control {
    TogglePause,
    Stop,
    Quit,
    Unknown,
}

impl Control {
    fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" | "resume" => Control::TogglePause,
            "s" | "stop" => Control::Stop,
            "q" | "quit" => Control::Quit,
            _ => Control::Unknown,
        }
    }
}

/// Runs the stopwatch for `id` until the user stops or quits. Stopping
/// records the session on the task; closing stdin counts as stopping.
#[instrument(skip(ctx))]
pub(super) async fn run(ctx: &Context, id: TaskId) -> anyhow::Result<()> {
    if !ctx.mode.has_timer() {
        return Err(anyhow!("the timer is only available in the study planner (--mode study)"));
    }

    let mut app = ctx.open_planner().await;
    if !app.start_timer(id)? {
        println!("Task {id} is missing or already completed.");
        return Ok(());
    }

    let (tx, mut ticks) = mpsc::unbounded_channel();
    let ticker = Ticker::spawn(TICK_PERIOD, tx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    redraw(ctx, &app)?;

    loop {
        tokio::select! {
            Some(()) = ticks.recv() => {
                if app.tick_timer() {
                    redraw(ctx, &app)?;
                }
            }
            line = lines.next_line() => {
                let control = match line? {
                    Some(line) => Control::parse(&line),
                    None => Control::Stop,
                };
                match control {
                    Control::TogglePause => {
                        let status = app.toggle_pause();
                        debug!(?status, "pause toggled from keyboard");
                        redraw(ctx, &app)?;
                    }
                    Control::Stop => {
                        let outcome = app.stop_timer()?;
                        ctx.renderer.print_timer_outcome(&outcome)?;
                        break;
                    }
                    Control::Quit => {
                        app.abandon_timer();
                        println!();
                        println!("Timer discarded.");
                        break;
                    }
                    Control::Unknown => redraw(ctx, &app)?,
                }
            }
        }
    }

    ticker.cancel();
    info!(task_id = id, "timer session ended");
    app.shutdown().await;
    Ok(())
}

fn redraw(ctx: &Context, app: &PlannerApp) -> anyhow::Result<()> {
    match app.render(Utc::now()).timer {
        Some(timer) => ctx.renderer.print_timer(&timer),
        None => Ok(()),
    }
}
