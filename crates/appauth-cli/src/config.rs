use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use appauth::AppAuthConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8400/callback";
pub const DEFAULT_SCOPE: &str = "openid profile offline_access";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileConfig {
    pub issuer: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
}

impl ProfileConfig {
    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        let slot = match key {
            "issuer" => &mut self.issuer,
            "client_id" => &mut self.client_id,
            "client_secret" => &mut self.client_secret,
            "redirect_uri" => &mut self.redirect_uri,
            "scope" => &mut self.scope,
            other => anyhow::bail!(
                "Unknown config key: {other}. Valid keys: issuer, client_id, client_secret, redirect_uri, scope"
            ),
        };
        *slot = Some(value);
        Ok(())
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or(DEFAULT_REDIRECT_URI)
    }

    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_SCOPE)
    }
}

pub type ConfigFile = HashMap<String, ProfileConfig>;

/// `~/.appauth`, created on first use.
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".appauth");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn load_all(dir: &Path) -> Result<ConfigFile> {
    let path = dir.join("config.toml");
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

pub fn load_profile(dir: &Path, profile: &str) -> Result<ProfileConfig> {
    Ok(load_all(dir)?.remove(profile).unwrap_or_default())
}

pub fn save_profile(dir: &Path, profile: &str, config: &ProfileConfig) -> Result<()> {
    let mut all = load_all(dir)?;
    all.insert(profile.to_string(), config.clone());
    let content = toml::to_string_pretty(&all)?;
    fs::write(dir.join("config.toml"), content)?;
    Ok(())
}

pub fn resolve_issuer(cli_issuer: Option<&str>, profile: &ProfileConfig) -> Result<String> {
    // 1. --issuer flag / APPAUTH_ISSUER env
    if let Some(issuer) = cli_issuer {
        return Ok(issuer.to_string());
    }
    // 2. config.toml profile
    if let Some(issuer) = &profile.issuer {
        return Ok(issuer.clone());
    }
    anyhow::bail!(
        "No issuer configured. Use --issuer, set APPAUTH_ISSUER env var, or run: appauth config set issuer <url>"
    )
}

/// Library settings from `--config`, else `<dir>/appauth.toml`, else defaults.
pub fn load_library_config(explicit: Option<&Path>, dir: &Path) -> Result<AppAuthConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = dir.join("appauth.toml");
            if !default.exists() {
                return Ok(AppAuthConfig::default());
            }
            default
        }
    };
    AppAuthConfig::load(&path).with_context(|| format!("Failed to load {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = ProfileConfig::default();
        profile.set("issuer", "https://accounts.example.com".into()).unwrap();
        profile.set("client_id", "cli".into()).unwrap();
        save_profile(dir.path(), "work", &profile).unwrap();

        assert_eq!(load_profile(dir.path(), "work").unwrap(), profile);
        assert_eq!(load_profile(dir.path(), "other").unwrap(), ProfileConfig::default());
    }

    #[test]
    fn test_unknown_key() {
        let mut profile = ProfileConfig::default();
        assert!(profile.set("server", "x".into()).is_err());
    }

    #[test]
    fn test_defaults() {
        let profile = ProfileConfig::default();
        assert_eq!(profile.redirect_uri(), DEFAULT_REDIRECT_URI);
        assert_eq!(profile.scope(), DEFAULT_SCOPE);
    }

    #[test]
    fn test_resolve_issuer_precedence() {
        let profile = ProfileConfig {
            issuer: Some("https://profile.example.com".into()),
            ..ProfileConfig::default()
        };
        assert_eq!(
            resolve_issuer(Some("https://flag.example.com"), &profile).unwrap(),
            "https://flag.example.com"
        );
        assert_eq!(
            resolve_issuer(None, &profile).unwrap(),
            "https://profile.example.com"
        );
        assert!(resolve_issuer(None, &ProfileConfig::default()).is_err());
    }

    #[test]
    fn test_library_config_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_library_config(None, dir.path()).unwrap();
        assert_eq!(config, AppAuthConfig::default());
    }

    #[test]
    fn test_library_config_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("appauth.toml"), "skip_issuer_https_check = true\n").unwrap();
        let config = load_library_config(None, dir.path()).unwrap();
        assert!(config.skip_issuer_https_check);
    }
}
