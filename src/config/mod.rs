// Configuration management module
// TOML settings plus the interactive setup wizard

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    ActionsConfig, ClassifierConfig, Config, ConfigError, DataConfig, MatchingConfig, OllamaConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
