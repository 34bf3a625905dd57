//! Optional observer hook for run progress.
//!
//! Everything here is also logged through `tracing`; an [`EventHandler`] is
//! for callers that want the same signals programmatically (progress bars,
//! metrics, test assertions).

use crate::controller::Step;
use std::sync::Arc;

/// Events emitted while a run executes.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The controller is about to execute a step.
    StepStarted {
        step: Step,
        attempt: u32,
    },
    /// A validation attempt failed; `error` is the feedback sent to the
    /// correction step (truncated).
    ValidationFailed {
        attempt: u32,
        error: String,
    },
    /// A transport-level retry is about to sleep and re-send.
    TransportRetry {
        /// The retry attempt number (1-indexed).
        attempt: u32,
        /// Delay before this retry in milliseconds.
        delay_ms: u64,
        reason: String,
    },
    /// The run reached its terminal state.
    RunFinished {
        passed: bool,
        attempts: u32,
    },
}

/// Handler for run events.
///
/// # Example
///
/// ```
/// use extraction_agent::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         if let Event::ValidationFailed { attempt, error } = event {
///             println!("attempt {} failed: {}", attempt, error);
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
