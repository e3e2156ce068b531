use anyhow::Context as _;
use tracing::info;

use super::{Context, prompt_line};
use crate::session::Session;

async fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => prompt_line("Password: ").await,
    }
}

pub(super) async fn register(
    ctx: &Context,
    name: &str,
    email: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = password_or_prompt(password).await?;
    let response = ctx.client.register(name, email, &password).await?;
    info!(email = %response.user.email, "registered account");
    println!("{}", response.message);
    println!("Log in with: planner login {}", response.user.email);
    Ok(())
}

pub(super) async fn login(
    ctx: &Context,
    email: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = password_or_prompt(password).await?;
    let user = ctx.client.login(email, &password).await?;
    let session = Session::from(user);
    ctx.sessions
        .save(&session)
        .context("failed to remember the session")?;
    info!(email = %session.email, is_admin = session.is_admin, "logged in");

    println!("Signed in as {} <{}>", session.name, session.email);
    Ok(())
}

pub(super) fn logout(ctx: &Context) -> anyhow::Result<()> {
    if ctx.sessions.clear()? {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}

pub(super) fn whoami(ctx: &Context) -> anyhow::Result<()> {
    match ctx.session() {
        Some(session) if session.is_admin => {
            println!("{} <{}> (admin)", session.name, session.email)
        }
        Some(session) => println!("{} <{}>", session.name, session.email),
        None => println!("Not signed in."),
    }
    Ok(())
}
