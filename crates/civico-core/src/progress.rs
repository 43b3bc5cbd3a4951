//! Progress sinks
//!
//! The transfer engine reports through a single [`ProgressSink`] trait.
//! Two implementations cover both kinds of observers:
//! - [`AlwaysReport`] forwards every chunk (terminal progress bars)
//! - [`Throttled`] forwards only after a byte threshold, plus the final chunk
//!   (UI threads that must not be flooded)

pub use civico_types::ProgressEvent;

/// Default byte delta between throttled reports
pub const DEFAULT_PROGRESS_THRESHOLD: u64 = 50 * 1024;

/// Receives progress from a transfer, synchronously on the engine's task.
///
/// Thread marshaling (e.g. back to a UI thread) is the sink's own job.
pub trait ProgressSink: Send {
    /// Called once per transfer call before the first chunk
    fn begin(&mut self, _initial: ProgressEvent) {}

    /// Called after every chunk written
    fn report(&mut self, event: ProgressEvent);

    /// Called once when the transfer completes normally
    fn finish(&mut self, _last: ProgressEvent) {}
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn begin(&mut self, initial: ProgressEvent) {
        (**self).begin(initial)
    }

    fn report(&mut self, event: ProgressEvent) {
        (**self).report(event)
    }

    fn finish(&mut self, last: ProgressEvent) {
        (**self).finish(last)
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Box<S> {
    fn begin(&mut self, initial: ProgressEvent) {
        (**self).begin(initial)
    }

    fn report(&mut self, event: ProgressEvent) {
        (**self).report(event)
    }

    fn finish(&mut self, last: ProgressEvent) {
        (**self).finish(last)
    }
}

/// Forwards every event to a callback
pub struct AlwaysReport<F> {
    callback: F,
}

impl<F> AlwaysReport<F>
where
    F: FnMut(ProgressEvent) + Send,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressSink for AlwaysReport<F>
where
    F: FnMut(ProgressEvent) + Send,
{
    fn begin(&mut self, initial: ProgressEvent) {
        (self.callback)(initial);
    }

    fn report(&mut self, event: ProgressEvent) {
        (self.callback)(event);
    }
}

/// Forwards an event only when at least `threshold` bytes arrived since the
/// last forwarded one, or when it is the final chunk of a known total
pub struct Throttled<F> {
    callback: F,
    threshold: u64,
    last_reported: u64,
    last_event: Option<ProgressEvent>,
}

impl<F> Throttled<F>
where
    F: FnMut(ProgressEvent) + Send,
{
    pub fn new(threshold: u64, callback: F) -> Self {
        Self {
            callback,
            threshold,
            last_reported: 0,
            last_event: None,
        }
    }

    pub fn with_default_threshold(callback: F) -> Self {
        Self::new(DEFAULT_PROGRESS_THRESHOLD, callback)
    }

    fn emit(&mut self, event: ProgressEvent) {
        self.last_reported = event.downloaded;
        self.last_event = Some(event);
        (self.callback)(event);
    }
}

impl<F> ProgressSink for Throttled<F>
where
    F: FnMut(ProgressEvent) + Send,
{
    fn begin(&mut self, initial: ProgressEvent) {
        // Fresh state per transfer call
        self.last_event = None;
        self.emit(initial);
    }

    fn report(&mut self, event: ProgressEvent) {
        let delta = event.downloaded.saturating_sub(self.last_reported);
        if delta < self.threshold && !event.is_final() {
            return;
        }
        self.emit(event);
    }

    fn finish(&mut self, last: ProgressEvent) {
        if self.last_event != Some(last) {
            self.emit(last);
        }
    }
}
