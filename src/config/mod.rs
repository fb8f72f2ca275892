#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

pub const DEFAULT_SOURCE_PATH: &str = "data/data.json";
pub const DEFAULT_OUTPUT_PATH: &str = "outputData.json";
