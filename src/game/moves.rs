//! Move accounting.

/// Counts completed two-card comparisons.
///
/// A move is one resolved comparison, match or mismatch; single flips do not
/// count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveCounter {
    count: u32,
}

impl MoveCounter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed comparison.
    pub fn record_comparison(&mut self) {
        self.count += 1;
    }

    /// Resets the counter to zero.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Number of completed comparisons so far.
    pub fn count(&self) -> u32 {
        self.count
    }
}
