use crate::adapters::LocalFileResource;
use crate::core::lifecycle::{CompositeObserver, MonitoringObserver, TracingObserver};
use crate::core::mapper::FieldProjection;
use crate::core::pipeline::{PipelineOptions, StreamPipeline};
use crate::domain::model::RunSummary;
use crate::domain::ports::{ConfigProvider, FileResource, RecordMapper};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::path::{Path, PathBuf};

/// Turns a configuration into one pipeline run against the local filesystem.
pub struct EtlEngine<C: ConfigProvider> {
    config: C,
    monitor_enabled: bool,
}

impl<C: ConfigProvider> EtlEngine<C> {
    pub fn new(config: C) -> Self {
        let monitor_enabled = config.monitoring_enabled();
        Self {
            config,
            monitor_enabled,
        }
    }

    pub fn new_with_monitoring(config: C, monitor_enabled: bool) -> Self {
        Self {
            config,
            monitor_enabled,
        }
    }

    /// Base directory for relative paths: the configured one, else the working directory.
    pub fn base_dir(&self) -> Result<PathBuf> {
        match self.config.base_dir() {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(std::env::current_dir()?),
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let resource = LocalFileResource::new(self.base_dir()?);
        self.run_with(resource).await
    }

    pub async fn run_with<F: FileResource>(&self, resource: F) -> Result<RunSummary> {
        let mut observer = CompositeObserver::new().with(TracingObserver);
        if self.monitor_enabled {
            tracing::info!("🔍 System monitoring enabled");
            observer = observer.with(MonitoringObserver::new(SystemMonitor::new(true)));
        }

        let pipeline = StreamPipeline::new(resource, PipelineOptions::from_config(&self.config))
            .with_observer(observer);

        // 建立欄位投影
        let projection = FieldProjection::from_config(&self.config);
        let mapper: Option<&dyn RecordMapper> = if projection.is_identity() {
            tracing::debug!("No field projection configured, copying records unchanged");
            None
        } else {
            Some(&projection)
        };

        let output = pipeline
            .run(
                Path::new(self.config.source_path()),
                Path::new(self.config.output_path()),
                mapper,
            )
            .await?;

        if let Some(destination) = output.destination {
            // Nobody downstream appends in a one-shot run; the handle is released here.
            tracing::debug!(
                "Destination left open with {} bytes written",
                destination.bytes_written()
            );
        }

        Ok(output.summary)
    }
}
