use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "appauth")]
#[command(about = "OAuth 2.0 / OpenID Connect client for native apps")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Issuer URL (overrides config and APPAUTH_ISSUER env var)
    #[arg(short, long, global = true, env = "APPAUTH_ISSUER")]
    pub issuer: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "APPAUTH_PROFILE", default_value = "default")]
    pub profile: String,

    /// Library settings file (TOML)
    #[arg(long, global = true, env = "APPAUTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and show the provider's discovery document
    Discover,
    /// Register this client with the provider
    Register(RegisterArgs),
    /// Print the authorization URL to open in a browser
    Authorize(AuthorizeArgs),
    /// Complete authorization with the redirect URL the browser landed on
    Callback(CallbackArgs),
    /// Refresh the access token
    Refresh(RefreshArgs),
    /// Show the stored authorization state
    Status,
    /// Forget the stored state and print the provider logout URL
    Logout(LogoutArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct RegisterArgs {
    /// Redirect URI to register (defaults to the profile's)
    #[arg(long)]
    pub redirect_uri: Option<String>,
    /// Token endpoint auth method to request
    #[arg(long)]
    pub auth_method: Option<String>,
}

#[derive(clap::Args)]
pub struct AuthorizeArgs {
    /// OAuth client ID (defaults to the profile's or the registered one)
    #[arg(long)]
    pub client_id: Option<String>,
    /// Redirect URI (defaults to the profile's)
    #[arg(long)]
    pub redirect_uri: Option<String>,
    /// Space-delimited scope
    #[arg(long)]
    pub scope: Option<String>,
    /// Login hint passed to the provider
    #[arg(long)]
    pub login_hint: Option<String>,
    /// Prompt value (e.g. login, consent)
    #[arg(long)]
    pub prompt: Option<String>,
}

#[derive(clap::Args)]
pub struct CallbackArgs {
    /// The full redirect URL, including its query string
    pub redirect_url: String,
    /// Only record the authorization response, do not exchange the code
    #[arg(long)]
    pub no_exchange: bool,
}

#[derive(clap::Args)]
pub struct RefreshArgs {
    /// Refresh even if the access token is still valid
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args)]
pub struct LogoutArgs {
    /// Where the provider should send the browser after logout
    #[arg(long)]
    pub post_logout_redirect_uri: Option<String>,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (issuer, client_id, client_secret, redirect_uri, scope)
    pub key: String,
    /// Value
    pub value: String,
}
