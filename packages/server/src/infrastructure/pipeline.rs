//! Durable Pipeline Consumer.
//!
//! Pulls records from a `RecordSource` one at a time and persists them via
//! `PersistMessageUseCase`. A record is committed only after the storage
//! write succeeded; a failed write rewinds the source so the same record is
//! tried again, and stays uncommitted if the process stops meanwhile.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    domain::{BrokerRecord, ChatError, RecordSource},
    usecase::PersistMessageUseCase,
};

/// Consumer loop over one record source.
pub struct DurablePipelineConsumer<S> {
    source: S,
    persist: PersistMessageUseCase,
    retry_interval: Duration,
}

impl<S: RecordSource> DurablePipelineConsumer<S> {
    pub fn new(source: S, persist: PersistMessageUseCase, retry_interval: Duration) -> Self {
        Self {
            source,
            persist,
            retry_interval,
        }
    }

    /// Run until `shutdown` is cancelled or the source ends.
    ///
    /// Acknowledged offsets are flushed on every exit path.
    ///
    /// # Errors
    ///
    /// * `ChatError::Codec` - a record does not have the message shape
    /// * any non-transient error returned by the source
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), ChatError> {
        tracing::info!("pipeline consumer started");
        let result = self.consume(&shutdown).await;

        if let Err(e) = self.source.flush().await {
            tracing::error!(error = %e, "cannot flush acknowledged offsets");
            result?;
            return Err(e);
        }
        tracing::info!("pipeline consumer stopped");
        result
    }

    async fn consume(&mut self, shutdown: &CancellationToken) -> Result<(), ChatError> {
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                next = self.source.next_record() => next,
            };

            let record = match next {
                Ok(Some(record)) => record,
                Ok(None) => {
                    tracing::info!("record source closed");
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, "cannot receive record");
                    self.pause(shutdown).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            self.handle(record, shutdown).await?;
        }
    }

    async fn handle(
        &mut self,
        record: BrokerRecord,
        shutdown: &CancellationToken,
    ) -> Result<(), ChatError> {
        tracing::debug!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            "record claimed"
        );

        match self.persist.execute(&record.payload).await {
            Ok(_cache_write) => {
                self.source.commit(&record)?;
                tracing::debug!(offset = record.offset, "record saved and committed");
                Ok(())
            }
            Err(e @ ChatError::Codec { .. }) => {
                tracing::error!(
                    error = %e,
                    offset = record.offset,
                    payload = %String::from_utf8_lossy(&record.payload),
                    "cannot decode record"
                );
                Err(e)
            }
            Err(e) => {
                tracing::error!(error = %e, offset = record.offset, "cannot save message");
                self.source.rewind(&record)?;
                self.pause(shutdown).await;
                Ok(())
            }
        }
    }

    async fn pause(&self, shutdown: &CancellationToken) {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(self.retry_interval) => {}
        }
    }
}
