//! Search-input debouncing.
//!
//! Keystrokes are buffered; the term is committed only once input has been
//! idle for the configured delay. Time is passed in so callers and tests
//! control the clock.

use std::time::{Duration, Instant};

use crate::config::SEARCH_DEBOUNCE;

#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
    committed: String,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl SearchDebouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            committed: String::new(),
        }
    }

    /// Start from a term that is already applied, so clearing it later
    /// counts as a change.
    #[must_use]
    pub fn with_committed(mut self, term: &str) -> Self {
        self.committed = term.to_string();
        self
    }

    /// Record a keystroke. Restarts the idle timer.
    pub fn input(&mut self, text: &str, now: Instant) {
        self.pending = Some((text.to_string(), now));
    }

    /// When the pending input will commit, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.delay)
    }

    /// Commit the pending term if input has been idle long enough.
    ///
    /// Returns the new term only when it differs from the committed one.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let ready = self
            .deadline()
            .is_some_and(|deadline| now >= deadline);
        if !ready {
            return None;
        }
        self.take_pending()
    }

    /// Commit immediately (e.g. Enter pressed).
    pub fn flush(&mut self) -> Option<String> {
        self.take_pending()
    }

    #[must_use]
    pub fn committed(&self) -> &str {
        &self.committed
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn take_pending(&mut self) -> Option<String> {
        let (text, _) = self.pending.take()?;
        if text == self.committed {
            return None;
        }
        self.committed.clone_from(&text);
        Some(text)
    }
}
