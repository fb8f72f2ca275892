use crate::core::stream::{ReadOptions, ReadStream, WriteStream};
use crate::domain::model::{Encoding, LifecycleEvent, Record, TransformMode};
use crate::utils::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;

/// Filesystem access used by the pipeline. Paths are interpreted by the implementation.
pub trait FileResource: Send + Sync {
    /// Never fails; anything that prevents the check counts as "missing".
    fn exists(&self, path: &Path) -> impl Future<Output = bool> + Send;

    fn read_whole(&self, path: &Path) -> impl Future<Output = Result<Vec<Record>>> + Send;

    fn open_read_stream(
        &self,
        path: &Path,
        options: ReadOptions,
    ) -> impl Future<Output = Result<ReadStream>> + Send;

    /// Creates the file if needed and truncates any existing content.
    fn open_write_stream(&self, path: &Path) -> impl Future<Output = Result<WriteStream>> + Send;
}

pub trait RecordMapper: Send + Sync {
    fn map_record(&self, record: Record) -> Result<Record>;
}

impl<F> RecordMapper for F
where
    F: Fn(Record) -> Result<Record> + Send + Sync,
{
    fn map_record(&self, record: Record) -> Result<Record> {
        self(record)
    }
}

pub trait LifecycleObserver: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);
}

impl<F> LifecycleObserver for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event)
    }
}

pub trait ConfigProvider: Send + Sync {
    fn source_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn base_dir(&self) -> Option<&str>;
    fn keep_only_fields(&self) -> &[String];
    fn field_mapping(&self) -> HashMap<String, String>;
    fn transform_mode(&self) -> TransformMode;
    fn encoding(&self) -> Encoding;
    fn chunk_size(&self) -> usize;
    fn close_destination(&self) -> bool;
    fn monitoring_enabled(&self) -> bool;
}
