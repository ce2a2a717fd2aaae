// Background batching of finished spans

use crate::exporter::{ExportResult, SpanExporter};
use crate::span::SpanData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Spans waiting for export; new spans are dropped when full
    pub max_queue_size: usize,
    pub max_export_batch_size: usize,
    pub scheduled_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay: Duration::from_secs(5),
        }
    }
}

enum Command {
    Span(Box<SpanData>),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Queues spans and exports them from a single background task
///
/// Must be created inside a tokio runtime.
pub struct BatchSpanProcessor {
    tx: mpsc::Sender<Command>,
}

impl BatchSpanProcessor {
    pub fn new(exporter: Arc<dyn SpanExporter>, config: BatchConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.max_queue_size.max(1));
        tokio::spawn(Self::run(exporter, config, rx));
        Self { tx }
    }

    /// Enqueue a finished span without waiting
    pub fn on_end(&self, span: SpanData) {
        if let Err(e) = self.tx.try_send(Command::Span(Box::new(span))) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!("Span queue full, dropping span")
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::warn!("Span processor shut down, dropping span")
                }
            }
        }
    }

    /// Export everything queued so far
    pub async fn force_flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Export remaining spans and stop the background task
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    async fn run(exporter: Arc<dyn SpanExporter>, config: BatchConfig, mut rx: mpsc::Receiver<Command>) {
        let mut buffer: Vec<SpanData> = Vec::with_capacity(config.max_export_batch_size);
        let mut ticker = tokio::time::interval(config.scheduled_delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Span(span)) => {
                        buffer.push(*span);
                        if buffer.len() >= config.max_export_batch_size {
                            Self::export_all(&exporter, &mut buffer, config.max_export_batch_size).await;
                        }
                    }
                    Some(Command::Flush(ack)) => {
                        Self::export_all(&exporter, &mut buffer, config.max_export_batch_size).await;
                        let _ = ack.send(());
                    }
                    Some(Command::Shutdown(ack)) => {
                        Self::export_all(&exporter, &mut buffer, config.max_export_batch_size).await;
                        exporter.shutdown().await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        Self::export_all(&exporter, &mut buffer, config.max_export_batch_size).await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    Self::export_all(&exporter, &mut buffer, config.max_export_batch_size).await;
                }
            }
        }
    }

    async fn export_all(exporter: &Arc<dyn SpanExporter>, buffer: &mut Vec<SpanData>, batch_size: usize) {
        while !buffer.is_empty() {
            let take = buffer.len().min(batch_size.max(1));
            let batch: Vec<SpanData> = buffer.drain(..take).collect();
            let count = batch.len();
            if exporter.export(batch).await == ExportResult::Failure {
                tracing::warn!("Span export failed for a batch of {} spans", count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingSpanExporter;

    fn span(id: u64) -> SpanData {
        SpanData::new(1, id, "agent")
    }

    #[tokio::test]
    async fn test_flush_exports_in_batches() {
        let exporter = Arc::new(RecordingSpanExporter::default());
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            BatchConfig {
                max_export_batch_size: 2,
                scheduled_delay: Duration::from_secs(3600),
                ..BatchConfig::default()
            },
        );

        for id in 1..=5 {
            processor.on_end(span(id));
        }
        processor.force_flush().await;

        let sizes: Vec<usize> = exporter.batches().iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        let ids: Vec<u64> = exporter.spans().iter().map(|s| s.span_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let exporter = Arc::new(RecordingSpanExporter::default());
        let processor = BatchSpanProcessor::new(exporter.clone(), BatchConfig::default());

        processor.on_end(span(7));
        processor.shutdown().await;
        processor.on_end(span(8));

        assert_eq!(exporter.spans().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_delay_triggers_export() {
        let exporter = Arc::new(RecordingSpanExporter::default());
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            BatchConfig {
                scheduled_delay: Duration::from_millis(100),
                ..BatchConfig::default()
            },
        );

        processor.on_end(span(1));
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(exporter.spans().len(), 1);
    }
}
