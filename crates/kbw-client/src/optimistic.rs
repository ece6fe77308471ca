//! Locally applied values awaiting server confirmation.
//!
//! Every optimistic write takes a [`Ticket`]. Server answers always move the
//! confirmed baseline forward, whichever ticket they belong to. A failure may
//! only roll back the newest write, so a stale failure never clobbers a newer
//! optimistic value.

/// Where an optimistic value stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A local write is waiting for the server.
    PendingOptimistic,
    /// The visible value is the server's answer.
    Confirmed,
    /// The last write failed and the value was restored.
    RolledBack,
}

/// Identifies one optimistic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// A value with an optimistic overlay.
#[derive(Debug, Clone)]
pub struct Optimistic<T> {
    confirmed: T,
    value: T,
    phase: Phase,
    generation: u64,
}

impl<T: Clone> Optimistic<T> {
    /// Creates a value already confirmed by the server.
    pub fn new(value: T) -> Self {
        Self {
            confirmed: value.clone(),
            value,
            phase: Phase::Confirmed,
            generation: 0,
        }
    }

    /// Returns the value to show.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns the last value the server confirmed.
    pub fn confirmed(&self) -> &T {
        &self.confirmed
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns whether a local write is waiting for the server.
    pub fn is_pending(&self) -> bool {
        self.phase == Phase::PendingOptimistic
    }

    /// Shows `value` immediately and returns the ticket of this write.
    pub fn begin(&mut self, value: T) -> Ticket {
        self.generation += 1;
        self.value = value;
        self.phase = Phase::PendingOptimistic;
        Ticket(self.generation)
    }

    /// Applies the server's answer to the write identified by `ticket`.
    ///
    /// The answer always becomes the new baseline. It also becomes the
    /// visible value unless a newer write is still pending.
    pub fn confirm(&mut self, ticket: Ticket, server: T) {
        self.confirmed = server;
        if self.is_current(ticket) || !self.is_pending() {
            self.value = self.confirmed.clone();
            self.phase = Phase::Confirmed;
        }
    }

    /// Restores the baseline after the write identified by `ticket` failed.
    ///
    /// Returns `false`, leaving the value untouched, when a newer write has
    /// superseded `ticket`.
    pub fn rollback(&mut self, ticket: Ticket) -> bool {
        if !self.is_current(ticket) || !self.is_pending() {
            return false;
        }

        self.value = self.confirmed.clone();
        self.phase = Phase::RolledBack;
        true
    }

    /// Replaces both the baseline and the visible value with server truth.
    ///
    /// Every outstanding ticket becomes stale.
    pub fn reset(&mut self, server: T) {
        self.generation += 1;
        self.confirmed = server.clone();
        self.value = server;
        self.phase = Phase::Confirmed;
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }
}

impl<T: Clone + Default> Default for Optimistic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
