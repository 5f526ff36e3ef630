//! Background relay catalog refresh.
//!
//! A worker thread refreshes the catalog immediately, then once per interval.
//! The wait between refreshes listens on a channel so the worker stops as
//! soon as its [`RefreshHandle`] is shut down or dropped.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use super::{RelayCatalog, RelaySource};

/// Owns the refresh worker.
pub struct RefreshHandle {
    stop: Option<mpsc::Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl RefreshHandle {
    /// Starts refreshing `catalog` from `source` every `interval`.
    pub fn spawn(
        catalog: Arc<RelayCatalog>,
        source: Arc<dyn RelaySource>,
        interval: Duration,
    ) -> Self {
        let (stop, stopped) = mpsc::channel::<()>();

        let worker = thread::spawn(move || loop {
            debug!("refreshing relay catalog");
            catalog.update(source.fetch());

            match stopped.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("relay catalog refresh stopped");
                    return;
                }
            }
        });

        Self {
            stop: Some(stop),
            worker: Some(worker),
        }
    }

    /// Stops the worker and waits for an in-flight refresh to finish.
    pub fn shutdown(mut self) {
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("relay catalog refresh worker panicked");
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::relays;
    use crate::catalog::Relay;
    use crate::error::{Result, SwitchError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    /// Succeeds once, then fails.
    #[derive(Default)]
    struct FlakySource {
        calls: AtomicUsize,
    }

    impl RelaySource for FlakySource {
        fn fetch(&self) -> Result<Vec<Relay>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(relays())
            } else {
                Err(SwitchError::Upstream("unreachable".to_string()))
            }
        }
    }

    struct PanickingSource;

    impl RelaySource for PanickingSource {
        fn fetch(&self) -> Result<Vec<Relay>> {
            panic!("decoder bug");
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_first_refresh_is_immediate() {
        let catalog = Arc::new(RelayCatalog::new());
        let source = Arc::new(FlakySource::default());
        let handle = RefreshHandle::spawn(
            Arc::clone(&catalog),
            source.clone(),
            Duration::from_secs(3600),
        );

        wait_for(|| catalog.snapshot().loaded);
        assert_eq!(catalog.snapshot().relays.len(), 3);

        let started = Instant::now();
        handle.shutdown();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_refresh_keeps_relays_and_records_error() {
        let catalog = Arc::new(RelayCatalog::new());
        let source = Arc::new(FlakySource::default());
        let handle = RefreshHandle::spawn(
            Arc::clone(&catalog),
            source.clone(),
            Duration::from_millis(10),
        );

        wait_for(|| catalog.snapshot().last_error.is_some());
        handle.shutdown();

        let snapshot = catalog.snapshot();
        assert!(snapshot.loaded);
        assert_eq!(snapshot.relays.len(), 3);
    }

    #[test]
    fn test_shutdown_stops_refreshing() {
        let catalog = Arc::new(RelayCatalog::new());
        let source = Arc::new(FlakySource::default());
        let handle = RefreshHandle::spawn(
            Arc::clone(&catalog),
            source.clone(),
            Duration::from_millis(1),
        );

        wait_for(|| source.calls.load(Ordering::SeqCst) >= 3);
        handle.shutdown();
        let calls = source.calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn test_shutdown_survives_worker_panic() {
        let catalog = Arc::new(RelayCatalog::new());
        let handle = RefreshHandle::spawn(
            Arc::clone(&catalog),
            Arc::new(PanickingSource),
            Duration::from_secs(3600),
        );
        let started = Instant::now();
        handle.shutdown();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!catalog.snapshot().loaded);
    }
}
