use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use env_logger::{Builder, Target};
use log::LevelFilter;
use parley_client::AuthError;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "parley", version, about = "Parley messaging client")]
struct Cli {
    /// Backend base URL, e.g. https://chat.example.com/api
    #[arg(long, global = true)]
    server: Option<String>,
    /// Session file to read and write instead of the default location
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,
    /// Print raw JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, env = "PARLEY_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        password_confirmation: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PARLEY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out; the local session is cleared even if the server is unreachable
    Logout,
    /// Show the signed-in user
    Whoami {
        /// Use the stored snapshot instead of asking the server
        #[arg(long)]
        cached: bool,
    },
    /// Report whether a session is stored, without contacting the server
    Status,
    /// View or edit the profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Fetch the profile from the server
    Show,
    /// Change profile fields; unspecified fields keep their current value
    Update {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Upload a new profile picture
    UploadPicture {
        path: PathBuf,
        /// MIME type; guessed from the file extension when omitted
        #[arg(long)]
        mime: Option<String>,
    },
    /// Delete the profile picture
    RemovePicture,
}

fn init_logger() {
    Builder::new()
        .target(Target::Stderr)
        .filter_level(LevelFilter::Warn)
        .filter_module("parley", LevelFilter::Info)
        .init();
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<AuthError>() {
        Some(auth) => {
            eprintln!("Error: {}", auth.message());
            for field_error in auth.field_errors() {
                eprintln!("  - {}", field_error);
            }
        }
        None => eprintln!("Error: {:#}", err),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    if std::env::var("RUST_LOG").is_err() {
        init_logger();
    } else {
        env_logger::Builder::from_default_env()
            .target(Target::Stderr)
            .init();
    }

    match dotenv {
        Ok(path) => log::debug!("Loaded environment from {:?}", path),
        Err(err) if err.not_found() => {}
        Err(err) => log::warn!("Ignoring unreadable .env file: {}", err),
    }

    let cli = Cli::parse();
    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}
