//! Progress reporting and cooperative cancellation.
//!
//! The engine calls [`ProgressSink::report`] between jobs, never in the
//! middle of one, so a cancelled pass leaves the store consistent and a
//! later [`run_pass`](crate::engine::CompletionEngine::run_pass) resumes
//! where this one stopped.

use tracing::info;

/// Receives status lines; returning `true` asks the engine to stop.
pub trait ProgressSink {
    fn report(&mut self, message: &str) -> bool;
}

/// Logs status lines at info level under `confluence::progress`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&mut self, message: &str) -> bool {
        info!(target: "confluence::progress", "{}", message);
        false
    }
}

/// Discards status lines and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _: &str) -> bool {
        false
    }
}

/// Adapts a closure.
pub struct CallbackProgress<F>(pub F);

impl<F> ProgressSink for CallbackProgress<F>
where
    F: FnMut(&str) -> bool,
{
    fn report(&mut self, message: &str) -> bool {
        (self.0)(message)
    }
}
