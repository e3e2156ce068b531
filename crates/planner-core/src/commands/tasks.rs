use chrono::Utc;
use tracing::info;

use super::Context;
use crate::app::PlannerApp;
use crate::cli::AddArgs;
use crate::datetime::parse_month_arg;
use crate::task::{DurationInput, TaskDraft, TaskId};

pub(super) async fn show(ctx: &Context) -> anyhow::Result<()> {
    let app = ctx.open_planner().await;
    ctx.renderer.print_view(&app.render(Utc::now()))
}

pub(super) async fn calendar(ctx: &Context, month: Option<&str>) -> anyhow::Result<()> {
    let mut app = ctx.open_planner().await;
    if let Some(month) = month {
        app.show_month(parse_month_arg(month)?);
    }
    ctx.renderer.print_calendar(&app.render(Utc::now()))
}

pub(super) async fn list(ctx: &Context) -> anyhow::Result<()> {
    let app = ctx.open_planner().await;
    ctx.renderer.print_day(&app.render(Utc::now()))
}

pub(super) async fn stats(ctx: &Context) -> anyhow::Result<()> {
    let app = ctx.open_planner().await;
    ctx.renderer.print_stats(&app.render(Utc::now()))
}

pub(super) async fn add(ctx: &Context, args: AddArgs) -> anyhow::Result<()> {
    let draft = TaskDraft {
        text: args.text.join(" "),
        subject: args.subject,
        duration: args.duration.map(|value| DurationInput {
            value,
            unit: args.unit,
        }),
    };

    let mut app = ctx.open_planner().await;
    let id = app.add(&draft, Utc::now())?;
    info!(task_id = id, "task added from cli");
    println!("Added task {id}.");
    finish(app).await
}

pub(super) async fn toggle(ctx: &Context, id: TaskId) -> anyhow::Result<()> {
    let mut app = ctx.open_planner().await;
    if app.toggle(id) {
        let done = app.store().get(id).is_some_and(|task| task.completed);
        println!(
            "Task {id} marked {}.",
            if done { "done" } else { "not done" }
        );
    } else {
        println!("No task {id}.");
    }
    finish(app).await
}

pub(super) async fn remove(ctx: &Context, id: TaskId) -> anyhow::Result<()> {
    let mut app = ctx.open_planner().await;
    if app.remove(id) {
        println!("Removed task {id}.");
    } else {
        println!("No task {id}.");
    }
    finish(app).await
}

pub(super) async fn clear_completed(ctx: &Context) -> anyhow::Result<()> {
    let mut app = ctx.open_planner().await;
    match app.clear_completed() {
        0 => println!("No completed tasks to clear."),
        removed => println!("Cleared {removed} completed task(s)."),
    }
    finish(app).await
}

/// Waits for queued saves so the process does not exit mid-request.
async fn finish(app: PlannerApp) -> anyhow::Result<()> {
    app.shutdown().await;
    Ok(())
}
