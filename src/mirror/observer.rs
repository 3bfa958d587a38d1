/// Receives progress while the mirror copies a body.
///
/// Both methods default to doing nothing.
pub trait CopyObserver: Send + Sync {
    /// Called after `read` bytes were copied, with the running `total`.
    fn on_read(&self, read: usize, total: u64) {
        let _ = (read, total);
    }

    /// Called once the end of the body was reached.
    fn on_complete(&self, total: u64) {
        let _ = total;
    }
}

/// Ignores all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CopyObserver for NoopObserver {}

/// Emits copy progress as `tracing` debug events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CopyObserver for TracingObserver {
    fn on_read(&self, read: usize, total: u64) {
        tracing::debug!(read, total, "copied chunk");
    }

    fn on_complete(&self, total: u64) {
        tracing::debug!(total, "finished copying body");
    }
}
