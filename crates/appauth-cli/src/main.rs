mod cli;
mod commands;
mod config;
mod output;
mod store;

use anyhow::Result;
use appauth::AuthorizationService;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::Session;
use output::print_error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = run(cli).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    // Prefer RUST_LOG from env, otherwise use the --log-level value.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    let dir = config::config_dir()?;
    let profile_name = cli.profile.clone();
    let mut profile = config::load_profile(&dir, &profile_name)?;

    if let Commands::Config(args) = &cli.command {
        match &args.command {
            cli::ConfigCommands::Show => {
                println!("{}: {}", "Profile".cyan(), profile_name);
                for (key, value) in [
                    ("Issuer", profile.issuer.as_deref()),
                    ("Client ID", profile.client_id.as_deref()),
                    ("Redirect URI", Some(profile.redirect_uri())),
                    ("Scope", Some(profile.scope())),
                ] {
                    println!("{}: {}", key.cyan(), value.unwrap_or("(not set)"));
                }
                let secret = if profile.client_secret.is_some() { "(set)" } else { "(not set)" };
                println!("{}: {}", "Client secret".cyan(), secret);
            }
            cli::ConfigCommands::Set(set_args) => {
                profile.set(&set_args.key, set_args.value.clone())?;
                config::save_profile(&dir, &profile_name, &profile)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        }
        return Ok(());
    }

    let library_config = config::load_library_config(cli.config.as_deref(), &dir)?;
    let session = Session {
        dir,
        profile_name,
        profile,
        issuer: cli.issuer.clone(),
        service: AuthorizationService::from_config(library_config)?,
    };

    match &cli.command {
        Commands::Discover => commands::provider::discover(&session).await?,
        Commands::Register(args) => commands::provider::register(&session, args).await?,
        Commands::Authorize(args) => commands::flow::authorize(&session, args).await?,
        Commands::Callback(args) => commands::flow::callback(&session, args).await?,
        Commands::Refresh(args) => commands::flow::refresh(&session, args).await?,
        Commands::Status => commands::status::status(&session)?,
        Commands::Logout(args) => commands::flow::logout(&session, args)?,
        Commands::Config(_) => {}
    }

    Ok(())
}
