//! Per-parameter edit debouncing
//!
//! Slider-style controls produce a burst of values. [`Debouncer`] keeps one
//! timer per parameter and only emits the last value once the parameter has
//! been quiet for the configured period. Emitted edits carry the scope they
//! were made in so a consumer can drop edits that outlived a scope switch.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::types::{ParamValue, Scope};

/// Default quiet period before an edit is emitted.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// An edit that survived its quiet period.
#[derive(Debug, Clone, PartialEq)]
pub struct DebouncedEdit {
    pub scope: Scope,
    pub name: String,
    pub value: ParamValue,
}

/// Per-parameter timer set feeding an unbounded channel.
///
/// Timers run as tokio tasks, so [`push`](Self::push) must be called inside a
/// runtime. Dropping the debouncer cancels every outstanding timer.
pub struct Debouncer {
    quiet: Duration,
    timers: HashMap<String, CancellationToken>,
    tx: mpsc::UnboundedSender<DebouncedEdit>,
}

impl Debouncer {
    /// Create a debouncer and the receiver its edits are emitted on.
    pub fn new(quiet: Duration) -> (Self, mpsc::UnboundedReceiver<DebouncedEdit>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { quiet, timers: HashMap::new(), tx }, rx)
    }

    /// Quiet period.
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Schedule `value` for `name`, restarting that parameter's timer.
    pub fn push(&mut self, scope: Scope, name: impl Into<String>, value: impl Into<ParamValue>) {
        let edit = DebouncedEdit { scope, name: name.into(), value: value.into() };
        // Fired timers cancel their own token
        self.timers.retain(|_, token| !token.is_cancelled());
        let token = CancellationToken::new();
        if let Some(previous) = self.timers.insert(edit.name.clone(), token.clone()) {
            previous.cancel();
        }
        trace!("Debouncing {} for {:?}", edit.name, self.quiet);

        let quiet = self.quiet;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(quiet) => {
                    token.cancel();
                    // Receiver gone means nobody wants the edit
                    let _ = tx.send(edit);
                }
            }
        });
    }

    /// Cancel the timer for `name`. Returns whether one was still pending;
    /// a timer that already emitted its edit does not count.
    pub fn cancel(&mut self, name: &str) -> bool {
        match self.timers.remove(name) {
            Some(token) => {
                let running = !token.is_cancelled();
                token.cancel();
                running
            }
            None => false,
        }
    }

    /// Number of timers that have not fired or been cancelled.
    pub fn pending(&self) -> usize {
        self.timers.values().filter(|token| !token.is_cancelled()).count()
    }

    /// Cancel every timer; nothing scheduled so far will be emitted.
    pub fn cancel_all(&mut self) {
        for (_, token) in self.timers.drain() {
            token.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
