use crate::domain::model::LifecycleEvent;
use crate::domain::ports::LifecycleObserver;
use crate::utils::monitor::SystemMonitor;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Writes every lifecycle event to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl LifecycleObserver for TracingObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Started {
                source,
                destination,
                mode,
            } => tracing::info!(
                "🚀 Streaming {} -> {} ({} mode)",
                source.display(),
                destination.display(),
                mode
            ),
            LifecycleEvent::ChunkProcessed {
                index,
                bytes_in,
                bytes_out,
            } => tracing::debug!("chunk {}: {} bytes in, {} bytes out", index, bytes_in, bytes_out),
            LifecycleEvent::EndOfRead { chunks, bytes_read } => {
                tracing::info!("📥 Source end reached after {} chunks ({} bytes)", chunks, bytes_read)
            }
            LifecycleEvent::Closed => tracing::debug!("Source stream closed"),
            LifecycleEvent::Finished {
                bytes_written,
                destination_closed,
            } => {
                if *destination_closed {
                    tracing::info!("📁 Destination finished, {} bytes written", bytes_written)
                } else {
                    tracing::info!(
                        "📁 Destination flushed and left open, {} bytes written",
                        bytes_written
                    )
                }
            }
            LifecycleEvent::Failed { message } => tracing::error!("❌ Pipeline failed: {}", message),
        }
    }
}

/// Forwards events to a channel so a separate task can react to them.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: UnboundedSender<LifecycleEvent>,
}

impl ChannelObserver {
    pub fn new(sender: UnboundedSender<LifecycleEvent>) -> Self {
        Self { sender }
    }
}

impl LifecycleObserver for ChannelObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.sender.send(event.clone());
    }
}

/// Samples process CPU and memory at the start and end of a run.
pub struct MonitoringObserver {
    monitor: SystemMonitor,
}

impl MonitoringObserver {
    pub fn new(monitor: SystemMonitor) -> Self {
        Self { monitor }
    }
}

impl LifecycleObserver for MonitoringObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Started { .. } => self.monitor.log_stats("Start"),
            LifecycleEvent::EndOfRead { .. } => self.monitor.log_stats("Source drained"),
            LifecycleEvent::Finished { .. } | LifecycleEvent::Failed { .. } => {
                self.monitor.log_final_stats()
            }
            _ => {}
        }
    }
}

/// Fans one event out to several observers, in registration order.
#[derive(Clone, Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: impl LifecycleObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl LifecycleObserver for CompositeObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
