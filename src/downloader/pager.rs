//! Streams eligible records from the source into the worker channel.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::store::RecordSource;
use crate::types::Record;

/// Page through `source` and push every eligible record into `tx`
///
/// Stops on an empty page, a page with no eligible record, a page error,
/// cancellation, or once every receiver is gone. Dropping `tx` on return closes the channel, which lets
/// the workers drain and exit. Returns the number of records sent.
pub(crate) async fn run_pager(
    source: Arc<dyn RecordSource>,
    batch_size: usize,
    tx: mpsc::Sender<Record>,
    cancel: CancellationToken,
) -> u64 {
    let limit = i64::try_from(batch_size).unwrap_or(i64::MAX);
    let mut offset: i64 = 0;
    let mut sent: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!(offset, "Pager cancelled");
            return sent;
        }

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(offset, "Pager cancelled");
                return sent;
            }
            page = source.page(limit, offset) => page,
        };

        let records = match page {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(offset, error = %e, "Failed to fetch record page, stopping pager");
                return sent;
            }
        };

        if records.is_empty() {
            tracing::debug!(offset, sent, "Record source exhausted");
            return sent;
        }

        let fetched = records.len() as i64;
        let sent_before = sent;
        for record in records.into_iter().filter(Record::is_eligible) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(offset, "Pager cancelled while channel was full");
                    return sent;
                }
                result = tx.send(record) => {
                    if result.is_err() {
                        tracing::debug!("All workers gone, stopping pager");
                        return sent;
                    }
                    sent += 1;
                }
            }
        }

        if sent == sent_before {
            tracing::debug!(offset, fetched, sent, "Page held no eligible records, stopping pager");
            return sent;
        }

        offset += fetched;
    }
}
