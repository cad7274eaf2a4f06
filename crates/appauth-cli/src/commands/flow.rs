use anyhow::{Context, Result};
use appauth::{
    AdditionalParameters, AuthorizationManagementRequest, AuthorizationRequest, EndSessionRequest,
    SharedAuthState, response_types,
};
use colored::Colorize;
use url::Url;

use crate::cli::{AuthorizeArgs, CallbackArgs, LogoutArgs, RefreshArgs};
use crate::commands::Session;
use crate::output::{print_field, print_success, token_preview};
use crate::store;

pub async fn authorize(session: &Session, args: &AuthorizeArgs) -> Result<()> {
    let state = store::load_state(&session.dir, &session.profile_name)?;
    let config = session.configuration(state.as_ref()).await?;
    let client_id = session.client_id(args.client_id.as_deref(), state.as_ref())?;

    let redirect = args
        .redirect_uri
        .as_deref()
        .unwrap_or_else(|| session.profile.redirect_uri());
    let redirect = Url::parse(redirect).with_context(|| format!("Invalid redirect URI: {redirect}"))?;
    let scope = args
        .scope
        .clone()
        .unwrap_or_else(|| session.profile.scope().to_string());

    let request: AuthorizationRequest = session
        .service
        .authorization_request_builder(config, client_id, response_types::CODE, redirect)?
        .scope(Some(scope))
        .login_hint(args.login_hint.clone())
        .prompt(args.prompt.clone())
        .build()?;
    store::save_pending(&session.dir, &session.profile_name, &request)?;

    println!("Open this URL in a browser to sign in:\n");
    println!("  {}\n", request.to_uri().as_str().underline());
    println!(
        "Then run: {}",
        "appauth callback '<redirect url>'".cyan()
    );
    Ok(())
}

pub async fn callback(session: &Session, args: &CallbackArgs) -> Result<()> {
    let request = store::take_pending(&session.dir, &session.profile_name)?;
    let redirect = Url::parse(&args.redirect_url)
        .with_context(|| format!("Invalid redirect URL: {}", args.redirect_url))?;

    let mut state = store::load_state(&session.dir, &session.profile_name)?.unwrap_or_default();
    let result = session.service.complete_authorization(request, &redirect);
    state.update_from_authorization(result.clone());
    store::save_state(&session.dir, &session.profile_name, &state)?;
    let response = result.context("Authorization failed")?;

    if args.no_exchange {
        print_success("Authorization response recorded");
        return Ok(());
    }

    let exchange = response.create_token_exchange_request(AdditionalParameters::new())?;
    let client_auth = session.client_authentication(&state)?;
    let result = session
        .service
        .perform_token_request(&exchange, &client_auth)
        .await;
    state.update_from_token(result.clone());
    store::save_state(&session.dir, &session.profile_name, &state)?;
    result.context("Token exchange failed")?;

    print_success("Signed in");
    if let Some(token) = state.access_token() {
        print_field("Access token", &token_preview(token));
    }
    Ok(())
}

pub async fn refresh(session: &Session, args: &RefreshArgs) -> Result<()> {
    let state = store::load_state(&session.dir, &session.profile_name)?
        .context("Not signed in. Run: appauth authorize")?;
    let client_auth = session.client_authentication(&state)?;

    let shared = SharedAuthState::new(state);
    if args.force {
        shared.update(|s| s.set_needs_token_refresh(true));
    }
    let result = shared
        .fresh_tokens_with(&session.service, client_auth, AdditionalParameters::new())
        .await;
    store::save_state(&session.dir, &session.profile_name, &shared.snapshot())?;
    let tokens = result.context("Token refresh failed")?;

    print_success("Tokens are fresh");
    if let Some(token) = tokens.access_token {
        print_field("Access token", &token_preview(&token));
    }
    Ok(())
}

pub fn logout(session: &Session, args: &LogoutArgs) -> Result<()> {
    let state = store::load_state(&session.dir, &session.profile_name)?;

    let end_session = match &state {
        Some(state) => match state.authorization_service_configuration() {
            Some(config) if config.end_session_endpoint().is_some() => {
                let post_logout = args
                    .post_logout_redirect_uri
                    .as_deref()
                    .map(Url::parse)
                    .transpose()
                    .context("Invalid post-logout redirect URI")?;
                Some(
                    EndSessionRequest::builder(config.clone())
                        .id_token_hint(state.id_token().map(String::from))
                        .post_logout_redirect_uri(post_logout)
                        .build()?,
                )
            }
            _ => None,
        },
        None => None,
    };

    if store::remove_state(&session.dir, &session.profile_name)? {
        print_success("Logged out (auth state removed)");
    } else {
        println!("No auth state found for profile \"{}\"", session.profile_name);
    }

    if let Some(request) = end_session {
        println!("\nTo end the provider session, open:\n");
        println!("  {}", request.to_uri().as_str().underline());
    }
    Ok(())
}
