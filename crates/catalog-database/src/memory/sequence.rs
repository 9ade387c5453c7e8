//! Change-number allocation with an in-flight watermark.

use std::collections::BTreeSet;

/// Monotonic change numbers plus the set still owned by open transactions.
///
/// A number is drawn when a change is written, before its transaction
/// commits. Readers only trust numbers below the lowest in-flight one, so
/// a committed change can never appear behind a reader's resume point.
#[derive(Debug, Default)]
pub(super) struct ChangeSequence {
    last: i64,
    in_flight: BTreeSet<i64>,
}

impl ChangeSequence {
    /// Draw the next number and mark it in flight.
    pub(super) fn reserve(&mut self) -> i64 {
        self.last += 1;
        self.in_flight.insert(self.last);
        self.last
    }

    /// Forget numbers whose transaction has ended.
    pub(super) fn release(&mut self, numbers: &[i64]) {
        for number in numbers {
            self.in_flight.remove(number);
        }
    }

    /// Committed numbers strictly below this value are safe to expose.
    ///
    /// Numbers held by the asking transaction itself do not count.
    pub(super) fn watermark(&self, own: &[i64]) -> i64 {
        self.in_flight
            .iter()
            .find(|n| !own.contains(n))
            .copied()
            .unwrap_or(self.last + 1)
    }
}
