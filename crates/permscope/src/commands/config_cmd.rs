//! Configuration command handlers (no service connection required).

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::Show => show(global),

        ConfigCommand::SetToken => set_token(global),
    }
}

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config_or_default();

    // Never echo stored secrets.
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some("<redacted>".into());
        }
    }

    let rendered = toml::to_string_pretty(&cfg).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: e.to_string(),
    })?;
    if !global.quiet {
        println!("{rendered}");
    }
    Ok(())
}

fn set_token(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let profile_name = config::active_profile_name(global, &cfg);

    let token = dialoguer::Password::new()
        .with_prompt(format!("API token for profile '{profile_name}'"))
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;

    permscope_config::store_token(&profile_name, &token)?;

    if !global.quiet {
        println!("Token stored in the system keyring for profile '{profile_name}'.");
    }
    Ok(())
}
