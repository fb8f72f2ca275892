pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::LocalFileResource;
pub use crate::core::{
    etl::EtlEngine,
    lifecycle::{ChannelObserver, CompositeObserver, TracingObserver},
    mapper::FieldProjection,
    pipeline::{PipelineOptions, RunOutput, StreamPipeline},
    stream::{ReadOptions, ReadStream, WriteStream},
};
pub use domain::model::{Encoding, LifecycleEvent, Record, RunSummary, TransformMode};
pub use domain::ports::{ConfigProvider, FileResource, LifecycleObserver, RecordMapper};
pub use utils::error::{EtlError, Result};
