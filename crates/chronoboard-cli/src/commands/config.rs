use chronoboard_core::{Config, ConfigError};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting
    Get {
        /// Dotted key, e.g. calendar.default_start or log.filter
        key: String,
    },
    /// Change one setting and write config.toml
    Set { key: String, value: String },
    /// Dump every setting as JSON
    List,
    /// Overwrite config.toml with built-in values
    Reset,
    /// Show where config.toml lives
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    if let ConfigAction::Path = action {
        println!("{}", Config::path()?.display());
        return Ok(());
    }
    if let ConfigAction::Reset = action {
        let path = Config::path()?;
        Config::default().save_to(&path)?;
        tracing::info!(path = %path.display(), "settings restored to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;
    match action {
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{value}"),
            None => return Err(ConfigError::UnknownKey(key).into()),
        },
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            tracing::info!(%key, %value, "setting saved");
        }
        ConfigAction::List => super::print_json(&config)?,
        ConfigAction::Path | ConfigAction::Reset => {}
    }
    Ok(())
}
