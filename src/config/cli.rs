use crate::config::{DEFAULT_OUTPUT_PATH, DEFAULT_SOURCE_PATH};
use crate::core::stream::DEFAULT_CHUNK_SIZE;
use crate::domain::model::{Encoding, TransformMode};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::collections::HashMap;

#[derive(Debug, Clone, Parser)]
#[command(name = "stream-json-etl")]
#[command(about = "Stream a JSON array from one file to another, keeping only selected fields")]
pub struct CliConfig {
    /// Source JSON file, relative to --base-dir
    #[arg(long, default_value = DEFAULT_SOURCE_PATH)]
    pub source: String,

    /// Destination file, relative to --base-dir
    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output: String,

    /// Directory relative paths resolve against (defaults to the working directory)
    #[arg(long, env = "STREAM_ETL_BASE_DIR")]
    pub base_dir: Option<String>,

    /// Fields to keep in every record
    #[arg(long, value_delimiter = ',', default_value = "id,title")]
    pub fields: Vec<String>,

    /// Copy records unchanged instead of projecting fields
    #[arg(long)]
    pub no_projection: bool,

    /// Rename a field in the output, as old=new (repeatable)
    #[arg(long = "rename", value_parser = parse_rename)]
    pub rename: Vec<(String, String)>,

    #[arg(long, value_enum, default_value_t = TransformMode::Incremental)]
    pub mode: TransformMode,

    #[arg(long, value_enum, default_value_t = Encoding::Utf8)]
    pub encoding: Encoding,

    /// Maximum bytes per read
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Flush the destination but do not close it when the source is drained
    #[arg(long)]
    pub keep_open: bool,

    /// Load settings from a TOML file instead of the flags above
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

fn parse_rename(value: &str) -> std::result::Result<(String, String), String> {
    match value.split_once('=') {
        Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
            Ok((from.trim().to_string(), to.trim().to_string()))
        }
        _ => Err(format!("expected old=new, got '{}'", value)),
    }
}

impl ConfigProvider for CliConfig {
    fn source_path(&self) -> &str {
        &self.source
    }

    fn output_path(&self) -> &str {
        &self.output
    }

    fn base_dir(&self) -> Option<&str> {
        self.base_dir.as_deref()
    }

    fn keep_only_fields(&self) -> &[String] {
        if self.no_projection {
            &[]
        } else {
            &self.fields
        }
    }

    fn field_mapping(&self) -> HashMap<String, String> {
        if self.no_projection {
            return HashMap::new();
        }
        self.rename.iter().cloned().collect()
    }

    fn transform_mode(&self) -> TransformMode {
        self.mode
    }

    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn close_destination(&self) -> bool {
        !self.keep_open
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitor
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("source", &self.source)?;
        validation::validate_path("output", &self.output)?;
        if let Some(base_dir) = &self.base_dir {
            validation::validate_path("base_dir", base_dir)?;
        }
        validation::validate_positive_number("chunk_size", self.chunk_size, 1)?;
        validation::validate_field_list("fields", self.keep_only_fields())?;
        validation::validate_field_mapping("rename", &self.field_mapping())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::parse_from(["stream-json-etl"]);

        assert_eq!(config.source_path(), "data/data.json");
        assert_eq!(config.output_path(), "outputData.json");
        assert_eq!(config.keep_only_fields(), ["id".to_string(), "title".to_string()]);
        assert_eq!(config.transform_mode(), TransformMode::Incremental);
        assert_eq!(config.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert!(config.close_destination());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flags() {
        let config = CliConfig::parse_from([
            "stream-json-etl",
            "--source",
            "in.json",
            "--fields",
            "id,title,userId",
            "--rename",
            "userId=author_id",
            "--mode",
            "per-chunk",
            "--chunk-size",
            "128",
            "--keep-open",
        ]);

        assert_eq!(config.keep_only_fields().len(), 3);
        assert_eq!(
            config.field_mapping().get("userId").map(String::as_str),
            Some("author_id")
        );
        assert_eq!(config.transform_mode(), TransformMode::PerChunk);
        assert_eq!(config.chunk_size(), 128);
        assert!(!config.close_destination());
    }

    #[test]
    fn test_no_projection_clears_fields() {
        let config = CliConfig::parse_from(["stream-json-etl", "--no-projection"]);
        assert!(config.keep_only_fields().is_empty());
        assert!(config.field_mapping().is_empty());
    }

    #[test]
    fn test_invalid_values() {
        assert!(CliConfig::try_parse_from(["stream-json-etl", "--rename", "oops"]).is_err());

        let config = CliConfig::parse_from(["stream-json-etl", "--chunk-size", "0"]);
        assert!(config.validate().is_err());
    }
}
