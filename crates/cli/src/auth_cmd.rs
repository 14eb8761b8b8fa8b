use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use satya_core::display::display_name;

use crate::app::App;

/// Non-interactive password source, for scripts.
const ENV_PASSWORD: &str = "SATYA_PASSWORD";

pub async fn run_login(email: Option<String>) -> Result<()> {
    let app = App::open("/login")?;
    app.require_auth()?;
    app.start().await?;

    let email = match email {
        Some(email) => email,
        None => Input::<String>::new()
            .with_prompt("Email")
            .interact_text()
            .context("Failed to read email")?,
    };
    let password = match std::env::var(ENV_PASSWORD) {
        Ok(password) if !password.is_empty() => password,
        _ => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?,
    };

    let session = app
        .auth
        .sign_in_with_password(email.trim(), &password)
        .await
        .context("Sign-in failed")?;
    println!(
        "Signed in as {} ({})",
        display_name(&session.email),
        session.email
    );
    app.finish()
}

pub async fn run_logout() -> Result<()> {
    let app = App::open("/")?;
    app.start().await?;
    if app.session().is_none() {
        println!("Not signed in.");
        return app.finish();
    }
    if let Err(e) = app.ctx.sign_out().await {
        eprintln!("Warning: {e}");
    }
    println!("Signed out.");
    app.finish()
}

pub async fn run_whoami() -> Result<()> {
    let app = App::open("/")?;
    let state = app.start().await?;
    match state.session() {
        Some(session) => println!(
            "{} ({}), user id {}",
            display_name(&session.email),
            session.email,
            session.user_id
        ),
        None => println!("Not signed in."),
    }
    app.finish()
}
