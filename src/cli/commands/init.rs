//! Init and Config commands.

use crate::config::Settings;
use crate::io::{EntityType, Envelope, ResultCode};
use serde_json::json;

/// Create `.refgraph/settings.toml` in the current directory.
pub fn run_init(force: bool) -> anyhow::Result<Envelope> {
    let current_dir = std::env::current_dir()?;

    match Settings::init_config_file(&current_dir, force) {
        Ok(path) => Ok(Envelope::success(json!({ "config_path": path }))
            .with_entity_type(EntityType::Settings)
            .with_message(format!("Created configuration file at {}", path.display()))
            .with_hint("Import facts with 'refgraph import <facts.json>'")),
        Err(e) => Ok(Envelope::error(ResultCode::ConfigError, e.to_string())
            .with_hint("Use --force to overwrite")),
    }
}

/// Display the effective configuration, with a hint when no usable settings
/// file backs it.
pub fn run_config(settings: &Settings) -> anyhow::Result<Envelope> {
    let envelope = Envelope::success(serde_json::to_value(settings)?)
        .with_entity_type(EntityType::Settings)
        .with_message("Active configuration");
    Ok(match Settings::check_init() {
        Ok(()) => envelope,
        Err(reason) => envelope.with_hint(reason),
    })
}
