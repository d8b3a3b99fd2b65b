//! Periodic drain of the durable buffer into a `MessageStore`.
//!
//! One tick: snapshot under the lock, write outside it on a blocking thread
//! with a deadline, then commit under the lock only if the write succeeded.
//! A failed or timed-out write leaves the buffer untouched and the same
//! messages go out again on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

use crate::persistence::MessageStore;
use crate::relay::engine::{SharedRelay, lock_relay};
use crate::utils::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered.
    Idle,
    /// This many messages were written and removed from the buffer.
    Persisted(usize),
    /// Writing this many messages failed; they stay buffered.
    Failed(usize),
}

/// Run one flush tick.
pub async fn flush_once(
    relay: &SharedRelay,
    store: &Arc<dyn MessageStore>,
    write_timeout: Duration,
) -> FlushOutcome {
    let snapshot = lock_relay(relay).buffer.snapshot();
    let Some(batch) = snapshot else {
        return FlushOutcome::Idle;
    };
    let count = batch.len();

    let writer = Arc::clone(store);
    let entries = batch.entries.clone();
    let write = tokio::task::spawn_blocking(move || writer.persist_batch(&entries));

    let result = match timeout(write_timeout, write).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(StoreError::Task(join_err.to_string())),
        Err(_) => Err(StoreError::Timeout(write_timeout)),
    };

    match result {
        Ok(()) => {
            let removed = lock_relay(relay).buffer.commit(&batch);
            debug!("flushed {count} messages ({removed} removed from buffer)");
            FlushOutcome::Persisted(count)
        }
        Err(e) => {
            warn!("flush of {count} messages failed, will retry next tick: {e}");
            FlushOutcome::Failed(count)
        }
    }
}

/// Flush every `period` until the task is dropped. The first tick happens
/// one full period after start.
pub async fn run_flush_loop(
    relay: SharedRelay,
    store: Arc<dyn MessageStore>,
    period: Duration,
    write_timeout: Duration,
) {
    info!("flushing buffered messages every {period:?}");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        flush_once(&relay, &store, write_timeout).await;
    }
}

/// Load stored history into the replay log. Storage problems are logged and
/// leave the log empty.
pub async fn restore_history(relay: &SharedRelay, store: &Arc<dyn MessageStore>) -> usize {
    let reader = Arc::clone(store);
    let loaded = match tokio::task::spawn_blocking(move || reader.load_all()).await {
        Ok(result) => result,
        Err(join_err) => Err(StoreError::Task(join_err.to_string())),
    };

    match loaded {
        Ok(history) => {
            let count = history.len();
            lock_relay(relay).restore_history(history);
            count
        }
        Err(e) => {
            warn!("could not load message history, starting empty: {e}");
            0
        }
    }
}
