//! CLI-side configuration resolution.
//!
//! Layers CLI flags and env vars over the shared profile store in
//! `permscope-config`, producing the `ServiceConfig` handed to core.

use std::time::Duration;

use secrecy::SecretString;

use permscope_config::{Config, Profile};
use permscope_core::{ServiceConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use permscope_config::{config_path, load_config_or_default};

/// The profile name in effect: `--profile` flag, then config default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Resolve a profile into a `ServiceConfig`, applying CLI flag overrides.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<ServiceConfig, CliError> {
    let url_str = global.service.as_deref().unwrap_or(&profile.service);
    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "service".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    let token = match &global.token {
        Some(token) => SecretString::from(token.clone()),
        None => permscope_config::resolve_token(profile, profile_name)?,
    };

    let tls = if global.insecure || profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = ServiceConfig::new(url, token);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(global.timeout));
    if let Some(page_size) = profile.page_size {
        config.page_size = page_size;
    }
    if let Some(batch_size) = profile.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(user_cap) = profile.user_cap {
        config.user_cap = user_cap;
    }
    config.include_all_active_users = profile.include_all_active_users;

    Ok(config)
}

/// Build a `ServiceConfig` from the config file, profile, and CLI overrides.
pub fn build_service_config(global: &GlobalOpts) -> Result<ServiceConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    // If a profile exists, use it with CLI flag overrides
    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, global);
    }

    // An explicitly requested profile that isn't configured is its own
    // error; only the implicit default falls through to bare flags.
    if global.profile.is_some() && !cfg.profiles.is_empty() {
        let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available.join(", "),
        });
    }

    // No profile found -- try to build from CLI flags / env vars alone
    let url_str = global.service.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;

    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "service".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    let token = global
        .token
        .as_ref()
        .map(|t| SecretString::from(t.clone()))
        .ok_or(CliError::NoToken {
            profile: profile_name,
        })?;

    let mut config = ServiceConfig::new(url, token);
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    config.timeout = Duration::from_secs(global.timeout);

    Ok(config)
}
