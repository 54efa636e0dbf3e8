//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, AudioConfig};
use crate::domain::error::ConfigError;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        })
    }
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    store.save(&config).await?;
    let shown = if key == "token" {
        mask_token(value)
    } else {
        value.to_string()
    };
    presenter.success(&format!("{} = {}", key, shown));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let config = store.load().await?;

    match display_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output("(not set)"),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            &display_value(&config, key).unwrap_or_else(|| "(not set)".to_string()),
        );
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

/// Validate `value` for `key` and store it in `config`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::ValidationError {
        key: key.to_string(),
        message: message.to_string(),
    };

    match key {
        "endpoint" => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(invalid("Value must be an http:// or https:// URL"));
            }
            config.endpoint = Some(value.to_string());
        }
        "token" => config.token = Some(value.to_string()),
        "output_dir" => config.output_dir = Some(value.to_string()),
        "notify" => {
            config.notify =
                Some(parse_bool(value).map_err(|_| invalid("Value must be 'true' or 'false'"))?)
        }
        "audio.sample_rate" => {
            let rate = value
                .parse::<u32>()
                .ok()
                .filter(|r| (8_000..=192_000).contains(r))
                .ok_or_else(|| invalid("Value must be a sample rate between 8000 and 192000"))?;
            audio_mut(config).sample_rate = Some(rate);
        }
        "audio.channels" => {
            let channels = value
                .parse::<u16>()
                .ok()
                .filter(|c| (1..=2).contains(c))
                .ok_or_else(|| invalid("Value must be 1 or 2"))?;
            audio_mut(config).channels = Some(channels);
        }
        "audio.timeslice_ms" => {
            let ms = value
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms >= 10)
                .ok_or_else(|| invalid("Value must be a number of milliseconds, at least 10"))?;
            audio_mut(config).timeslice_ms = Some(ms);
        }
        _ => return Err(invalid("Unknown key")),
    }
    Ok(())
}

fn audio_mut(config: &mut AppConfig) -> &mut AudioConfig {
    config.audio.get_or_insert_with(AudioConfig::default)
}

fn display_value(config: &AppConfig, key: &str) -> Option<String> {
    let audio = config.audio.as_ref();
    match key {
        "endpoint" => config.endpoint.clone(),
        "token" => config.token.as_deref().map(mask_token),
        "output_dir" => config.output_dir.clone(),
        "notify" => config.notify.map(|b| b.to_string()),
        "audio.sample_rate" => audio.and_then(|a| a.sample_rate).map(|v| v.to_string()),
        "audio.channels" => audio.and_then(|a| a.channels).map(|v| v.to_string()),
        "audio.timeslice_ms" => audio.and_then(|a| a.timeslice_ms).map(|v| v.to_string()),
        _ => None,
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}

/// Mask a token for display (show first 4 and last 4 chars)
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
