use crate::protocol::{CorrelationId, Operation, Outcome};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// A call waiting on the primary. The operation is kept so the reply can be replayed onto the
/// worker's mirror.
#[derive(Debug)]
pub(crate) struct PendingCall {
    pub operation: Operation,
    waiter: oneshot::Sender<Outcome>,
}

impl PendingCall {
    pub fn complete(self, outcome: Outcome) {
        // Caller may have been dropped between `resolve` and now.
        let _ = self.waiter.send(outcome);
    }
}

#[derive(Debug, thiserror::Error)]
#[error("pending call table is closed")]
pub(crate) struct TableClosed;

/// PendingCalls maps in-flight correlation ids to their callers. An entry is inserted by
/// `register` and leaves through exactly one of `resolve`, `evict`, or `close`.
#[derive(Debug, Default)]
pub(crate) struct PendingCalls {
    state: Mutex<TableState>,
}

#[derive(Debug, Default)]
struct TableState {
    calls: HashMap<CorrelationId, PendingCall>,
    closed: bool,
}

impl PendingCalls {
    pub fn new() -> Self {
        PendingCalls::default()
    }

    pub fn register(
        &self,
        correlation_id: CorrelationId,
        operation: Operation,
    ) -> Result<oneshot::Receiver<Outcome>, TableClosed> {
        let mut state = self.lock();
        if state.closed {
            return Err(TableClosed);
        }

        let (tx, rx) = oneshot::channel();
        let previous = state.calls.insert(
            correlation_id,
            PendingCall {
                operation,
                waiter: tx,
            },
        );
        debug_assert!(previous.is_none(), "correlation id reused while pending");

        Ok(rx)
    }

    /// Takes the call matching a reply. `None` for ids we never registered or already let go.
    pub fn resolve(&self, correlation_id: &CorrelationId) -> Option<PendingCall> {
        self.lock().calls.remove(correlation_id)
    }

    /// Gives up on a call. Returns it if it was still waiting.
    pub fn evict(&self, correlation_id: &CorrelationId) -> Option<PendingCall> {
        self.lock().calls.remove(correlation_id)
    }

    /// Refuses new registrations and hands back every call still waiting. Dropping them closes
    /// their callers' receivers.
    pub fn close(&self) -> Vec<PendingCall> {
        let mut state = self.lock();
        state.closed = true;
        state.calls.drain().map(|(_, call)| call).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        // Nothing in here can panic while holding the lock, but don't compound a panic elsewhere.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_only_the_matching_call() {
        let table = PendingCalls::new();
        let first = CorrelationId::new();
        let second = CorrelationId::new();
        let first_rx = table.register(first, Operation::GetAll).unwrap();
        let mut second_rx = table.register(second, Operation::GetAll).unwrap();

        assert!(table.resolve(&CorrelationId::new()).is_none());

        table.resolve(&first).unwrap().complete(Outcome::Absent);

        assert_eq!(first_rx.await.unwrap(), Outcome::Absent);
        assert!(second_rx.try_recv().is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn a_call_resolves_once() {
        let table = PendingCalls::new();
        let id = CorrelationId::new();
        let _rx = table.register(id, Operation::GetAll).unwrap();

        assert!(table.resolve(&id).is_some());
        assert!(table.resolve(&id).is_none());
        assert!(table.evict(&id).is_none());
    }

    #[tokio::test]
    async fn close_fails_waiters_and_new_registrations() {
        let table = PendingCalls::new();
        let rx = table.register(CorrelationId::new(), Operation::GetAll).unwrap();

        let abandoned = table.close();
        assert_eq!(abandoned.len(), 1);
        drop(abandoned);

        assert!(rx.await.is_err());
        assert!(table.register(CorrelationId::new(), Operation::GetAll).is_err());
        assert_eq!(table.len(), 0);
    }
}
