use anyhow::{Context, Result};
use appauth::RegistrationRequest;
use colored::Colorize;
use url::Url;

use crate::cli::RegisterArgs;
use crate::commands::Session;
use crate::output::{print_field, print_json, print_success};
use crate::store;

pub async fn discover(session: &Session) -> Result<()> {
    let issuer = session.issuer()?;
    let config = session.service.fetch_from_issuer(&issuer).await?;

    match config.discovery_document() {
        Some(document) => print_json(&document.to_json()),
        None => print_json(&config.to_json()),
    }
    Ok(())
}

pub async fn register(session: &Session, args: &RegisterArgs) -> Result<()> {
    let state = store::load_state(&session.dir, &session.profile_name)?;
    let config = session.configuration(state.as_ref()).await?;

    let redirect = args
        .redirect_uri
        .as_deref()
        .unwrap_or_else(|| session.profile.redirect_uri());
    let redirect = Url::parse(redirect).with_context(|| format!("Invalid redirect URI: {redirect}"))?;

    let request = RegistrationRequest::builder(config, vec![redirect])
        .token_endpoint_auth_method(args.auth_method.clone())
        .build()?;
    let response = session.service.perform_registration_request(&request).await?;

    let client_id = response.client_id().to_string();
    let has_secret = response.client_secret().is_some();
    let mut state = state.unwrap_or_default();
    state.update_from_registration(response);
    store::save_state(&session.dir, &session.profile_name, &state)?;

    print_success(&format!("Registered client {}", client_id.cyan()));
    if has_secret {
        print_field("Client secret", "stored in auth state");
    }
    Ok(())
}

