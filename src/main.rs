use std::io;
use std::sync::Arc;

use court_book::storage::config::Config;
use court_book::sync::auth::{AuthProvider, BearerAuthProvider};

mod authentication;
use authentication::check_or_setup_auth;
mod cli;
use cli::{Command, USAGE, parse_command, run_command};

#[tokio::main]
async fn main() -> Result<(), io::Error> {
    setup_logging();

    let command = match parse_command(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("{}", USAGE);
            return Ok(());
        }
    };

    if let Command::Help = command {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load_or_create()
        .map_err(|e| io::Error::other(e.to_string()))?;
    let auth = Arc::new(
        BearerAuthProvider::from_config(&config)
            .map_err(|e| io::Error::other(e.to_string()))?,
    );

    match command {
        Command::Logout => {
            if let Err(e) = auth.sign_out() {
                eprintln!("Sign out failed: {}", e);
                tracing::error!("Sign out failed: {}", e);
            } else {
                println!("Signed out. See you next time!");
            }
            return Ok(());
        }
        Command::Login => {
            if let Err(e) = check_or_setup_auth(&auth).await {
                eprintln!("Authentication error: {}", e);
                tracing::error!("Authentication failed: {}", e);
            }
            return Ok(());
        }
        _ => {}
    }

    if command.requires_auth() {
        if let Err(e) = check_or_setup_auth(&auth).await {
            eprintln!("Authentication error: {}", e);
            tracing::error!("Authentication failed: {}", e);
            return Ok(());
        }
        if !auth.subscribe().borrow().signed_in {
            eprintln!("Please sign in to book courts.");
            return Ok(());
        }
    }

    if let Err(e) = run_command(command, &config, auth).await {
        eprintln!("Error: {:#}", e);
        tracing::error!("Command failed: {:#}", e);
    }

    Ok(())
}

fn setup_logging() {
    let log_dir = Config::config_dir();

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "court-book.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    std::mem::forget(_guard);

    tracing::info!("court-book started");
}
