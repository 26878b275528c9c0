use std::env;

use zenflow_core::util::{is_http_url, normalize_text_option};

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfile, CliProfilesConfig, SUPABASE_ANON_KEY_ENV, SUPABASE_URL_ENV};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            enable_sync,
            disable_sync,
            no_activate,
        } => {
            let sync_toggle = if enable_sync {
                Some(true)
            } else if disable_sync {
                Some(false)
            } else {
                None
            };
            run_config_init(
                global_profile,
                supabase_url,
                supabase_anon_key,
                sync_toggle,
                no_activate,
            )
        }
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    sync_toggle: Option<bool>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(profile_name);
    apply_profile_update(
        &mut config,
        &profile_name,
        ProfileUpdate {
            supabase_url: normalize_text_option(supabase_url)
                .or_else(|| normalize_text_option(env::var(SUPABASE_URL_ENV).ok())),
            supabase_anon_key: normalize_text_option(supabase_anon_key)
                .or_else(|| normalize_text_option(env::var(SUPABASE_ANON_KEY_ENV).ok())),
            sync_toggle,
        },
        !no_activate,
    )?;

    let path = config.save()?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profile(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let missing_fields = missing_fields(profile);
    if !missing_fields.is_empty() {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    } else if profile.cloud_sync_enabled {
        println!(
            "Cloud sync is on for '{profile_name}'. Run `zenflow auth login --email <email> --password <password>`."
        );
    } else {
        println!("Cloud sync is off for '{profile_name}'. Pass --enable-sync to turn it on.");
    }

    Ok(())
}

/// Values supplied to `config init`; `None` keeps the stored value
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub sync_toggle: Option<bool>,
}

pub fn apply_profile_update(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    update: ProfileUpdate,
    activate: bool,
) -> Result<(), CliError> {
    if let Some(url) = update.supabase_url.as_deref() {
        if !is_http_url(url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }

    let profile = config.profile_mut_or_default(profile_name);
    if let Some(value) = update.supabase_url {
        profile.supabase_url = Some(value.trim_end_matches('/').to_string());
    }
    if let Some(value) = update.supabase_anon_key {
        profile.supabase_anon_key = Some(value);
    }
    if let Some(enabled) = update.sync_toggle {
        profile.cloud_sync_enabled = enabled;
    }

    if activate {
        config.active_profile = Some(profile_name.to_string());
    }
    Ok(())
}

pub fn missing_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.supabase_url().is_none() {
        missing.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing.push("supabase_anon_key");
    }
    missing
}
