use anyhow::anyhow;
use tracing::{info, instrument};

use super::Context;
use crate::cli::AdminCommand;

#[instrument(skip(ctx))]
pub(super) async fn run(ctx: &Context, command: AdminCommand) -> anyhow::Result<()> {
    let admin = ctx
        .session()
        .filter(|session| session.is_admin)
        .ok_or_else(|| anyhow!("admin access required; log in with an administrator account"))?;
    info!(admin = %admin.email, "admin command");

    match command {
        AdminCommand::Users => {
            let users = ctx.client.admin_users().await?;
            ctx.renderer.print_users(&users)?;
        }
        AdminCommand::Tasks { email } => {
            let rows = ctx.client.admin_user_tasks(&email).await?;
            if rows.is_empty() {
                println!("No tasks for {email}.");
            } else {
                ctx.renderer.print_task_rows(&rows)?;
            }
        }
        AdminCommand::DeleteUser { email } => {
            if email == admin.email {
                return Err(anyhow!("refusing to delete the signed-in administrator"));
            }
            let status = ctx.client.admin_delete_user(&email).await?;
            println!("{}", status.message);
        }
    }
    Ok(())
}
