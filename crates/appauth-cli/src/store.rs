//! Per-profile files under the config directory:
//! `state.<profile>.json` holds the `AuthState`, `pending.<profile>.json` the
//! authorization request awaiting its redirect.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use appauth::{AuthState, AuthorizationManagementRequest, AuthorizationRequest};

fn state_path(dir: &Path, profile: &str) -> PathBuf {
    dir.join(format!("state.{profile}.json"))
}

fn pending_path(dir: &Path, profile: &str) -> PathBuf {
    dir.join(format!("pending.{profile}.json"))
}

pub fn load_state(dir: &Path, profile: &str) -> Result<Option<AuthState>> {
    let path = state_path(dir, profile);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let state = AuthState::from_json_str(&content)
        .with_context(|| format!("Corrupt auth state in {}", path.display()))?;
    Ok(Some(state))
}

pub fn save_state(dir: &Path, profile: &str, state: &AuthState) -> Result<()> {
    let content = serde_json::to_string_pretty(&state.to_json()?)?;
    fs::write(state_path(dir, profile), content)?;
    Ok(())
}

pub fn remove_state(dir: &Path, profile: &str) -> Result<bool> {
    remove_if_exists(&state_path(dir, profile))
}

pub fn save_pending(dir: &Path, profile: &str, request: &AuthorizationRequest) -> Result<()> {
    fs::write(pending_path(dir, profile), request.to_json_string()?)?;
    Ok(())
}

pub fn take_pending(dir: &Path, profile: &str) -> Result<AuthorizationRequest> {
    let path = pending_path(dir, profile);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("No pending authorization for profile \"{profile}\". Run: appauth authorize"))?;
    let request = AuthorizationRequest::from_json_str(&content)
        .with_context(|| format!("Corrupt pending request in {}", path.display()))?;
    fs::remove_file(&path)?;
    Ok(request)
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appauth::{ServiceConfiguration, response_types};
    use url::Url;

    fn configuration() -> ServiceConfiguration {
        ServiceConfiguration::new(
            Url::parse("https://auth.example.com/authorize").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        )
    }

    #[test]
    fn test_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_state(dir.path(), "default").unwrap().is_none());

        let state = AuthState::from_configuration(configuration());
        save_state(dir.path(), "default", &state).unwrap();
        assert_eq!(load_state(dir.path(), "default").unwrap(), Some(state));

        assert!(remove_state(dir.path(), "default").unwrap());
        assert!(!remove_state(dir.path(), "default").unwrap());
    }

    #[test]
    fn test_pending_is_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let request = AuthorizationRequest::builder(
            configuration(),
            "cli",
            response_types::CODE,
            Url::parse("http://127.0.0.1:8400/callback").unwrap(),
        )
        .build()
        .unwrap();

        save_pending(dir.path(), "default", &request).unwrap();
        assert_eq!(take_pending(dir.path(), "default").unwrap(), request);
        assert!(take_pending(dir.path(), "default").is_err());
    }
}
