use crate::core::incremental::IncrementalTransformer;
use crate::core::lifecycle::TracingObserver;
use crate::core::stream::{ReadOptions, ReadStream, WriteStream};
use crate::core::transformer::{apply_mapper, ChunkTransform, ChunkTransformer};
use crate::domain::model::{LifecycleEvent, Record, RunSummary, TransformMode};
use crate::domain::ports::{ConfigProvider, FileResource, LifecycleObserver, RecordMapper};
use crate::utils::error::{EtlError, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub mode: TransformMode,
    pub read: ReadOptions,
    /// When false the destination is flushed but handed back open in [`RunOutput`].
    pub close_destination_on_complete: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mode: TransformMode::default(),
            read: ReadOptions::default(),
            close_destination_on_complete: true,
        }
    }
}

impl PipelineOptions {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            mode: config.transform_mode(),
            read: ReadOptions {
                encoding: config.encoding(),
                chunk_size: config.chunk_size(),
            },
            close_destination_on_complete: config.close_destination(),
        }
    }
}

#[derive(Debug)]
pub struct RunOutput {
    pub summary: RunSummary,
    /// Present only when `close_destination_on_complete` is false.
    pub destination: Option<WriteStream>,
}

/// Wires a [`FileResource`]'s read stream through a [`ChunkTransform`] into a
/// write stream and reports a single success or failure for the run.
pub struct StreamPipeline<F: FileResource> {
    resource: F,
    options: PipelineOptions,
    observer: Arc<dyn LifecycleObserver>,
}

impl<F: FileResource> StreamPipeline<F> {
    pub fn new(resource: F, options: PipelineOptions) -> Self {
        Self {
            resource,
            options,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl LifecycleObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Runs the configured mode: whole-file or streaming.
    pub async fn run(
        &self,
        source: &Path,
        destination: &Path,
        mapper: Option<&dyn RecordMapper>,
    ) -> Result<RunOutput> {
        match self.options.mode {
            TransformMode::Whole => self.write_whole(source, destination, mapper).await,
            TransformMode::Incremental | TransformMode::PerChunk => {
                self.stream_transform(source, destination, mapper).await
            }
        }
    }

    /// Streams `source` into `destination`, chunk by chunk.
    ///
    /// Fails with [`EtlError::FileNotFound`] before opening anything when the source
    /// is missing. On any later failure the bytes already written stay in the
    /// destination; nothing is rolled back.
    pub async fn stream_transform(
        &self,
        source: &Path,
        destination: &Path,
        mapper: Option<&dyn RecordMapper>,
    ) -> Result<RunOutput> {
        let started_at = Utc::now();
        self.ensure_source(source).await?;

        // Whole-file mode has its own entry point; streaming it means incremental.
        let mode = match self.options.mode {
            TransformMode::PerChunk => TransformMode::PerChunk,
            TransformMode::Incremental | TransformMode::Whole => TransformMode::Incremental,
        };
        self.emit(LifecycleEvent::Started {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            mode,
        });

        let mut reader = self
            .resource
            .open_read_stream(source, self.options.read)
            .await
            .map_err(|e| self.fail(e))?;
        let mut writer = self
            .resource
            .open_write_stream(destination)
            .await
            .map_err(|e| self.fail(e))?;

        let mut transformer: Box<dyn ChunkTransform + '_> = match mode {
            TransformMode::PerChunk => Box::new(ChunkTransformer::new(mapper)),
            _ => Box::new(IncrementalTransformer::new(mapper)),
        };

        if let Err(e) = self
            .pump(&mut reader, &mut writer, transformer.as_mut())
            .await
        {
            // Keep whatever earlier chunks produced.
            if let Err(flush_err) = writer.flush().await {
                tracing::warn!("Could not flush partial output: {}", flush_err);
            }
            return Err(self.fail(e));
        }

        let chunks_read = reader.chunks_read();
        let bytes_read = reader.bytes_read();
        let records_processed = transformer.records_processed();
        drop(transformer);
        drop(reader);
        self.emit(LifecycleEvent::Closed);

        let summary = |bytes_written| RunSummary {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            mode,
            started_at,
            finished_at: Utc::now(),
            chunks_read,
            bytes_read,
            bytes_written,
            records_processed,
        };

        self.finish_destination(writer, summary).await
    }

    /// Reads and maps the whole source before touching the destination.
    ///
    /// Meant for inputs small enough to hold in memory. A malformed source never
    /// creates or truncates the destination.
    pub async fn write_whole(
        &self,
        source: &Path,
        destination: &Path,
        mapper: Option<&dyn RecordMapper>,
    ) -> Result<RunOutput> {
        let started_at = Utc::now();
        self.ensure_source(source).await?;

        self.emit(LifecycleEvent::Started {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            mode: TransformMode::Whole,
        });

        let records = self
            .resource
            .read_whole(source)
            .await
            .map_err(|e| self.fail(e))?;
        self.emit(LifecycleEvent::EndOfRead {
            chunks: 1,
            bytes_read: 0,
        });
        self.emit(LifecycleEvent::Closed);

        let records_processed = records.len();
        let mapped = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| apply_mapper(mapper, record, index))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| self.fail(e))?;
        let payload = serde_json::to_vec(&Record::Array(mapped)).map_err(|e| self.fail(e.into()))?;

        let mut writer = self
            .resource
            .open_write_stream(destination)
            .await
            .map_err(|e| self.fail(e))?;
        if let Err(e) = writer.write_chunk(&payload).await {
            return Err(self.fail(e));
        }

        let summary = |bytes_written| RunSummary {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            mode: TransformMode::Whole,
            started_at,
            finished_at: Utc::now(),
            chunks_read: 1,
            bytes_read: 0,
            bytes_written,
            records_processed,
        };

        self.finish_destination(writer, summary).await
    }

    async fn ensure_source(&self, source: &Path) -> Result<()> {
        if self.resource.exists(source).await {
            return Ok(());
        }
        Err(self.fail(EtlError::FileNotFound {
            path: source.display().to_string(),
        }))
    }

    async fn pump(
        &self,
        reader: &mut ReadStream,
        writer: &mut WriteStream,
        transformer: &mut (dyn ChunkTransform + '_),
    ) -> Result<()> {
        while let Some(chunk) = reader.next_chunk().await? {
            let output = transformer.push(&chunk)?;
            writer.write_chunk(&output).await?;
            self.emit(LifecycleEvent::ChunkProcessed {
                index: reader.chunks_read() - 1,
                bytes_in: chunk.len(),
                bytes_out: output.len(),
            });
        }

        self.emit(LifecycleEvent::EndOfRead {
            chunks: reader.chunks_read(),
            bytes_read: reader.bytes_read(),
        });

        let tail = transformer.finish()?;
        writer.write_chunk(&tail).await?;
        Ok(())
    }

    async fn finish_destination(
        &self,
        mut writer: WriteStream,
        summary: impl FnOnce(u64) -> RunSummary,
    ) -> Result<RunOutput> {
        let bytes_written = writer.bytes_written();
        let destination = if self.options.close_destination_on_complete {
            writer.close().await.map_err(|e| self.fail(e))?;
            None
        } else {
            writer.flush().await.map_err(|e| self.fail(e))?;
            Some(writer)
        };

        self.emit(LifecycleEvent::Finished {
            bytes_written,
            destination_closed: destination.is_none(),
        });

        Ok(RunOutput {
            summary: summary(bytes_written),
            destination,
        })
    }

    fn emit(&self, event: LifecycleEvent) {
        self.observer.on_event(&event);
    }

    fn fail(&self, error: EtlError) -> EtlError {
        self.emit(LifecycleEvent::Failed {
            message: error.to_string(),
        });
        error
    }
}
