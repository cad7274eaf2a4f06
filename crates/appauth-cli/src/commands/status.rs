use anyhow::Result;
use appauth::{AuthState, Clock, SystemClock};
use colored::Colorize;

use crate::commands::Session;
use crate::output::{print_error, print_field, token_preview};
use crate::store;

pub fn status(session: &Session) -> Result<()> {
    let Some(state) = store::load_state(&session.dir, &session.profile_name)? else {
        print_error(&format!(
            "Not signed in (profile: \"{}\")",
            session.profile_name
        ));
        return Ok(());
    };

    print_field("Profile", &session.profile_name);
    for line in describe(&state, &SystemClock) {
        print_field(line.0, &line.1);
    }
    Ok(())
}

/// Name/value lines describing `state`.
fn describe(state: &AuthState, clock: &dyn Clock) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();

    let authorized = if state.is_authorized() {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    };
    lines.push(("Authorized", authorized));

    if let Some(config) = state.authorization_service_configuration() {
        lines.push(("Token endpoint", config.token_endpoint().to_string()));
    }
    if let Some(registration) = state.last_registration_response() {
        lines.push(("Client ID", registration.client_id().to_string()));
        if state.has_client_secret_expired(clock) {
            lines.push(("Client secret", "expired".red().to_string()));
        }
    }
    if let Some(scope) = state.scope() {
        lines.push(("Scope", scope.to_string()));
    }
    if let Some(token) = state.access_token() {
        lines.push(("Access token", token_preview(token)));
    }
    if let Some(expiry) = state.access_token_expiration_time() {
        let remaining = (expiry - clock.current_time_millis()) / 1000;
        let text = if remaining > 0 {
            format!("in {remaining}s")
        } else {
            format!("{}s ago", -remaining)
        };
        lines.push(("Expires", text));
    }
    lines.push((
        "Refresh token",
        if state.refresh_token().is_some() { "present" } else { "none" }.to_string(),
    ));
    if state.needs_token_refresh(clock) {
        lines.push(("Needs refresh", "yes".yellow().to_string()));
    }
    if let Some(err) = state.authorization_exception() {
        lines.push(("Last error", err.to_string().red().to_string()));
    }
    lines
}
