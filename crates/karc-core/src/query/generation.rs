//! Request generations for superseding in-flight list fetches.

/// Handle for one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

/// Issues monotonically increasing tickets; only the newest is current.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self { latest: 0 }
    }

    pub fn issue(&mut self) -> RequestTicket {
        self.latest += 1;
        RequestTicket(self.latest)
    }

    /// Whether a response for `ticket` should still be applied.
    #[must_use]
    pub const fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }

    #[must_use]
    pub const fn latest(&self) -> u64 {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_newest_ticket_is_current() {
        let mut tracker = RequestTracker::new();
        let first = tracker.issue();
        assert!(tracker.is_current(first));
        let second = tracker.issue();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
        assert!(second > first);
        assert_eq!(tracker.latest(), 2);
    }
}
