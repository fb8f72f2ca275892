pub mod etl;
pub mod incremental;
pub mod lifecycle;
pub mod mapper;
pub mod pipeline;
pub mod stream;
pub mod transformer;

pub use crate::domain::model::{Encoding, LifecycleEvent, Record, RunSummary, TransformMode};
pub use crate::domain::ports::{ConfigProvider, FileResource, LifecycleObserver, RecordMapper};
pub use crate::utils::error::Result;
