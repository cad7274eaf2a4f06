pub mod flow;
pub mod provider;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use appauth::{
    AuthState, AuthorizationService, ClientAuthentication, ReqwestTransport, ServiceConfiguration,
    TokenEndpointAuthMethod,
};
use url::Url;

use crate::config::{self, ProfileConfig};

/// Everything a command needs: where files live, the active profile and the
/// service to call the provider with.
pub struct Session {
    pub dir: PathBuf,
    pub profile_name: String,
    pub profile: ProfileConfig,
    pub issuer: Option<String>,
    pub service: AuthorizationService<ReqwestTransport>,
}

impl Session {
    pub fn issuer(&self) -> Result<Url> {
        let issuer = config::resolve_issuer(self.issuer.as_deref(), &self.profile)?;
        Url::parse(&issuer).with_context(|| format!("Invalid issuer URL: {issuer}"))
    }

    /// The provider configuration from the stored state, discovering it when
    /// there is none.
    pub async fn configuration(&self, state: Option<&AuthState>) -> Result<ServiceConfiguration> {
        if let Some(config) = state.and_then(AuthState::authorization_service_configuration) {
            tracing::debug!("Using stored service configuration");
            return Ok(config.clone());
        }
        let issuer = self.issuer()?;
        Ok(self.service.fetch_from_issuer(&issuer).await?)
    }

    pub fn client_id(&self, explicit: Option<&str>, state: Option<&AuthState>) -> Result<String> {
        if let Some(id) = explicit {
            return Ok(id.to_string());
        }
        if let Some(id) = &self.profile.client_id {
            return Ok(id.clone());
        }
        if let Some(registration) = state.and_then(AuthState::last_registration_response) {
            return Ok(registration.client_id().to_string());
        }
        anyhow::bail!(
            "No client ID configured. Use --client-id, run: appauth config set client_id <id>, or run: appauth register"
        )
    }

    /// Client authentication from the registration in `state`, else from the
    /// profile's client secret.
    pub fn client_authentication(&self, state: &AuthState) -> Result<ClientAuthentication> {
        if state.last_registration_response().is_some() {
            return Ok(state.client_authentication()?);
        }
        Ok(match &self.profile.client_secret {
            Some(secret) => {
                ClientAuthentication::for_method(TokenEndpointAuthMethod::ClientSecretBasic, secret)
            }
            None => ClientAuthentication::None,
        })
    }
}
