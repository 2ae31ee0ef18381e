//! Per-job control signal.
//!
//! The controller owns a `watch::Sender<JobSignal>` for every running job;
//! the job loop checks the receiver between items and races it against every
//! wait, so pause and cancel are observed within one loop iteration.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSignal {
    Run,
    Pause,
    Cancel,
}

/// Current signal. A dropped sender reads as `Pause` so the job checkpoints
/// and stops resumably.
pub(crate) fn current(rx: &watch::Receiver<JobSignal>) -> JobSignal {
    if rx.has_changed().is_err() {
        return JobSignal::Pause;
    }
    *rx.borrow()
}

/// Wait until the signal leaves `Run`.
pub(crate) async fn stopped(rx: &mut watch::Receiver<JobSignal>) -> JobSignal {
    loop {
        let signal = *rx.borrow_and_update();
        if signal != JobSignal::Run {
            return signal;
        }
        if rx.changed().await.is_err() {
            return JobSignal::Pause;
        }
    }
}

/// Run `fut` unless the signal leaves `Run` first.
pub(crate) async fn or_stopped<F: Future>(
    rx: &mut watch::Receiver<JobSignal>,
    fut: F,
) -> Result<F::Output, JobSignal> {
    tokio::select! {
        biased;
        signal = stopped(rx) => Err(signal),
        out = fut => Ok(out),
    }
}

/// Sleep for `delay`, returning early with the signal if it leaves `Run`.
pub(crate) async fn sleep(rx: &mut watch::Receiver<JobSignal>, delay: Duration) -> Result<(), JobSignal> {
    or_stopped(rx, tokio::time::sleep(delay)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_sleep_interrupted_by_cancel() {
        let (tx, mut rx) = watch::channel(JobSignal::Run);
        let start = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(JobSignal::Cancel);
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let result = sleep(&mut rx, Duration::from_secs(10)).await;
        assert_eq!(result, Err(JobSignal::Cancel));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_sleep_completes_while_running() {
        let (_tx, mut rx) = watch::channel(JobSignal::Run);
        assert_eq!(sleep(&mut rx, Duration::from_millis(5)).await, Ok(()));
    }

    #[tokio::test]
    async fn test_dropped_sender_reads_as_pause() {
        let (tx, mut rx) = watch::channel(JobSignal::Run);
        drop(tx);
        assert_eq!(current(&rx), JobSignal::Pause);
        assert_eq!(stopped(&mut rx).await, JobSignal::Pause);
    }

    #[tokio::test]
    async fn test_already_stopped_wins() {
        let (tx, mut rx) = watch::channel(JobSignal::Run);
        tx.send(JobSignal::Pause).unwrap();
        let result = or_stopped(&mut rx, async { 1 }).await;
        assert_eq!(result, Err(JobSignal::Pause));
    }
}
