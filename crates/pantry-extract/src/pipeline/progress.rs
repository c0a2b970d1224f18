use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// Snapshot emitted while a run is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Lines read so far
    pub processed: u64,
    /// Records that decoded and were fanned out
    pub extracted: u64,
}

/// Receiver of progress snapshots.
///
/// Observers only watch; they cannot stop or alter a run.
pub trait ProgressObserver {
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(Progress),
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

/// Ignores progress
impl ProgressObserver for () {
    fn on_progress(&self, _progress: Progress) {}
}

/// Forwards snapshots to an async consumer. A closed channel is ignored.
impl ProgressObserver for UnboundedSender<Progress> {
    fn on_progress(&self, progress: Progress) {
        let _ = self.send(progress);
    }
}

/// Logs each snapshot at `info`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_progress(&self, progress: Progress) {
        info!(
            processed = progress.processed,
            extracted = progress.extracted,
            "Extraction progress"
        );
    }
}
