use crate::config::{DEFAULT_OUTPUT_PATH, DEFAULT_SOURCE_PATH};
use crate::core::stream::DEFAULT_CHUNK_SIZE;
use crate::domain::model::{Encoding, TransformMode};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub base_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_path")]
    pub path: String,
    #[serde(default)]
    pub encoding: Encoding,
    pub chunk_size: Option<usize>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            encoding: Encoding::default(),
            chunk_size: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub mode: TransformMode,
    #[serde(default)]
    pub keep_only_fields: Vec<String>,
    pub field_mapping: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    pub close_destination: Option<bool>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            close_destination: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_source_path() -> String {
    DEFAULT_SOURCE_PATH.to_string()
}

fn default_output_path() -> String {
    DEFAULT_OUTPUT_PATH.to_string()
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"))
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content)
            .map_err(|e| EtlError::config(format!("TOML parsing error: {}", e)))
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as is.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }
}

impl ConfigProvider for TomlConfig {
    fn source_path(&self) -> &str {
        &self.source.path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn base_dir(&self) -> Option<&str> {
        self.pipeline.base_dir.as_deref()
    }

    fn keep_only_fields(&self) -> &[String] {
        &self.transform.keep_only_fields
    }

    fn field_mapping(&self) -> HashMap<String, String> {
        self.transform.field_mapping.clone().unwrap_or_default()
    }

    fn transform_mode(&self) -> TransformMode {
        self.transform.mode
    }

    fn encoding(&self) -> Encoding {
        self.source.encoding
    }

    fn chunk_size(&self) -> usize {
        self.source.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    fn close_destination(&self) -> bool {
        self.load.close_destination.unwrap_or(true)
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validation::validate_path("source.path", &self.source.path)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;
        if let Some(base_dir) = &self.pipeline.base_dir {
            validation::validate_path("pipeline.base_dir", base_dir)?;
        }
        validation::validate_positive_number("source.chunk_size", self.chunk_size(), 1)?;
        validation::validate_field_list("transform.keep_only_fields", &self.transform.keep_only_fields)?;
        validation::validate_field_mapping("transform.field_mapping", &self.field_mapping())?;
        Ok(())
    }
}
