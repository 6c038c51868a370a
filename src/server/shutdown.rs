use tokio::sync::watch;

/// Servers keep running until the handle is dropped.
pub fn shutdown_signal() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(());

    (ShutdownHandle { _tx: tx }, ShutdownSignal { rx })
}

pub struct ShutdownHandle {
    _tx: watch::Sender<()>,
}

/// ShutdownSignal fires once its `ShutdownHandle` is gone. Clones fire together, so one handle
/// can stop several servers.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<()>,
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // Nothing is ever sent, so this only returns once the sender is dropped.
        while self.rx.changed().await.is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn fires_for_every_clone_when_handle_drops() {
        let (handle, signal) = shutdown_signal();
        let other = signal.clone();

        assert!(timeout(Duration::from_millis(50), signal.clone().wait()).await.is_err());

        drop(handle);

        assert!(timeout(Duration::from_secs(1), signal.wait()).await.is_ok());
        assert!(timeout(Duration::from_secs(1), other.wait()).await.is_ok());
    }
}
