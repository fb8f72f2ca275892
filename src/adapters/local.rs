use crate::core::stream::{ReadOptions, ReadStream, WriteStream};
use crate::domain::model::Record;
use crate::domain::ports::FileResource;
use crate::utils::error::{EtlError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem access. Relative paths resolve against `base_path`.
#[derive(Debug, Clone)]
pub struct LocalFileResource {
    base_path: PathBuf,
}

impl LocalFileResource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}

impl FileResource for LocalFileResource {
    async fn exists(&self, path: &Path) -> bool {
        let full_path = self.resolve(path);
        tracing::debug!("Checking {}", full_path.display());
        fs::try_exists(&full_path).await.unwrap_or(false)
    }

    async fn read_whole(&self, path: &Path) -> Result<Vec<Record>> {
        let full_path = self.resolve(path);
        let data = fs::read(&full_path).await?;
        let location = full_path.display().to_string();

        let text = std::str::from_utf8(&data).map_err(|e| EtlError::parse(&location, e))?;
        match serde_json::from_str::<Record>(text).map_err(|e| EtlError::parse(&location, e))? {
            Record::Array(records) => Ok(records),
            _ => Err(EtlError::parse(location, "expected a top-level JSON array")),
        }
    }

    async fn open_read_stream(&self, path: &Path, options: ReadOptions) -> Result<ReadStream> {
        let full_path = self.resolve(path);
        let file = fs::File::open(&full_path).await?;
        tracing::debug!(
            "Opened {} for reading ({}, {} byte chunks)",
            full_path.display(),
            options.encoding,
            options.chunk_size
        );
        Ok(ReadStream::from_reader(file, options))
    }

    async fn open_write_stream(&self, path: &Path) -> Result<WriteStream> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = fs::File::create(&full_path).await?;
        tracing::debug!("Opened {} for writing", full_path.display());
        Ok(WriteStream::from_writer(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_exists_resolves_against_base_path() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("data.json"), "[]").unwrap();
        let resource = LocalFileResource::new(temp_dir.path());

        assert!(resource.exists(Path::new("data.json")).await);
        assert!(!resource.exists(Path::new("missing.json")).await);
    }

    #[tokio::test]
    async fn test_read_whole_parses_array() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("data.json"),
            r#"[{"id":1,"title":"A"},{"id":2,"title":"B"}]"#,
        )
        .unwrap();
        let resource = LocalFileResource::new(temp_dir.path());

        let records = resource.read_whole(Path::new("data.json")).await.unwrap();
        assert_eq!(records, vec![json!({"id":1,"title":"A"}), json!({"id":2,"title":"B"})]);
    }

    #[tokio::test]
    async fn test_read_whole_errors() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("bad.json"), "[{").unwrap();
        std::fs::write(temp_dir.path().join("object.json"), r#"{"id":1}"#).unwrap();
        let resource = LocalFileResource::new(temp_dir.path());

        assert!(matches!(
            resource.read_whole(Path::new("bad.json")).await,
            Err(EtlError::ParseError { .. })
        ));
        assert!(matches!(
            resource.read_whole(Path::new("object.json")).await,
            Err(EtlError::ParseError { .. })
        ));
        assert!(matches!(
            resource.read_whole(Path::new("missing.json")).await,
            Err(EtlError::IoError(_))
        ));
    }

    #[tokio::test]
    async fn test_write_stream_truncates_and_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out/nested/result.json");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, "previous content that is longer").unwrap();
        let resource = LocalFileResource::new(temp_dir.path());

        let mut writer = resource
            .open_write_stream(Path::new("out/nested/result.json"))
            .await
            .unwrap();
        writer.write_chunk(b"[]").await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_absolute_paths_ignore_base_path() {
        let temp_dir = TempDir::new().unwrap();
        let absolute = temp_dir.path().join("data.json");
        std::fs::write(&absolute, "[]").unwrap();
        let resource = LocalFileResource::new("/definitely/not/here");

        assert!(resource.exists(&absolute).await);
    }
}
