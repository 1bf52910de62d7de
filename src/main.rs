#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use uuid::Uuid;

use notekeep::handlers::CallbackServer;
use notekeep::home::{ActionOutcome, HomeView};
use notekeep::oauth::RedirectOutcome;
use notekeep::{ClientSettings, NotekeepClient, SessionState};

/// Notekeep - notes with Google sign-in
#[derive(Parser, Debug)]
#[command(name = "notekeep", version, about)]
#[command(propagate_version = true)]
struct Args {
    /// Backend base URL (overrides Settings.toml and BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in through Google, or the backend's test provider
    Login {
        /// Use the test provider instead of Google
        #[arg(long)]
        test: bool,
    },
    /// Show whether a session is stored
    Status,
    /// Show the profile and notes
    Me,
    /// Change the display name
    Rename { name: String },
    /// Manage notes
    #[command(subcommand)]
    Notes(NotesCommand),
    /// Forget the stored tokens
    Logout,
    /// Delete the account and forget the stored tokens
    DeleteAccount,
}

#[derive(Subcommand, Debug)]
enum NotesCommand {
    /// List notes
    List,
    /// Add a note
    Add { content: String },
    /// Delete a note by id
    Rm { id: Uuid },
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Also loads .env and initializes the logger
    let mut settings =
        ClientSettings::load().map_err(|e| anyhow!("Failed to load settings: {e}"))?;
    if let Some(url) = args.backend_url {
        settings.application.backend_url = url;
    }

    let client = NotekeepClient::from_settings(&settings).context("Failed to start client")?;

    match args.command {
        Command::Login { test } => login(&client, &settings, test).await,
        Command::Status => {
            status(&client);
            Ok(())
        }
        Command::Me => show_profile(&client.home()).await,
        Command::Rename { name } => {
            let home = client.home();
            report(home.update_name(&name).await, "Name updated")
        }
        Command::Notes(NotesCommand::List) => show_profile(&client.home()).await,
        Command::Notes(NotesCommand::Add { content }) => {
            report(client.home().add_note(&content).await, "Note added")
        }
        Command::Notes(NotesCommand::Rm { id }) => {
            report(client.home().delete_note(id).await, "Note deleted")
        }
        Command::Logout => report(client.home().logout(), "Logged out"),
        Command::DeleteAccount => report(client.home().delete_account().await, "Account deleted"),
    }
}

async fn login(client: &NotekeepClient, settings: &ClientSettings, test: bool) -> anyhow::Result<()> {
    if client.session.is_authenticated() {
        println!("Already logged in. Run `notekeep logout` first to switch accounts.");
        return Ok(());
    }

    let outcome = if test {
        client.login.test_login().await?
    } else {
        let listener = CallbackServer::start(&settings.callback, Arc::clone(&client.redirects))
            .with_context(|| {
                format!(
                    "Failed to listen for the login redirect on {}",
                    settings.get_callback_bind_address()
                )
            })?;
        let authorization_url = match client.login.start_google().await {
            Ok(url) => url,
            Err(e) => {
                listener.stop().await;
                return Err(e.into());
            }
        };

        if !settings.redirect_reaches_listener(listener.local_addr().port()) {
            log::warn!(
                "APP_BASE_URL points the login redirect at {}, which is not the local listener",
                settings.application.app_base_url
            );
        }

        println!("Open this URL in your browser to sign in:");
        println!();
        println!("  {authorization_url}");
        println!();
        println!("Waiting for the redirect on {} ...", listener.redirect_url());
        listener
            .wait()
            .await
            .ok_or_else(|| anyhow!("Login listener closed before a redirect arrived"))?
    };

    finish_login(&outcome)
}

fn finish_login(outcome: &RedirectOutcome) -> anyhow::Result<()> {
    match &outcome.failure {
        None => {
            println!("✓ Logged in");
            Ok(())
        }
        Some(message) => bail!("{message}"),
    }
}

fn status(client: &NotekeepClient) {
    match client.session.state() {
        SessionState::Authenticated => println!("Logged in"),
        SessionState::Unauthenticated => println!("Not logged in"),
    }
    println!("View: {}", client.router.landing().path());
}

async fn show_profile(home: &HomeView) -> anyhow::Result<()> {
    report(home.load().await, "")?;
    let Some(user) = home.user() else {
        bail!("No profile loaded");
    };

    println!("{} <{}>", user.name, user.email);
    if let Some(created) = user.created_at() {
        println!("Member since {}", created.format("%Y-%m-%d"));
    }
    if let Some(last_login) = user.last_login_at() {
        println!("Last login   {}", last_login.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();
    if user.notes.is_empty() {
        println!("No notes yet.");
    }
    for note in &user.notes {
        println!("{}  {}", note.id, note.content);
    }
    Ok(())
}

fn report(outcome: ActionOutcome, done: &str) -> anyhow::Result<()> {
    match outcome {
        ActionOutcome::Completed | ActionOutcome::SignedOut => {
            if !done.is_empty() {
                println!("✓ {done}");
            }
            Ok(())
        }
        ActionOutcome::Rejected(message) | ActionOutcome::Failed(message) => bail!("{message}"),
        ActionOutcome::SessionEnded => {
            bail!("Your session has ended. Run `notekeep login` to sign in again.")
        }
    }
}
