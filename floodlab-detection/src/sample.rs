//! Tracking of unbroken bad-sample runs.

/// Counts consecutive bad samples against a trigger threshold.
///
/// Any good sample resets the count to zero; the trigger condition can
/// only be reached through an unbroken run of bad samples of exactly the
/// configured length. Each loop that needs a trigger (pre-check, probing
/// loop, background monitor) owns its own tracker; counters are never
/// shared or reconciled across loops.
#[derive(Debug)]
pub struct BadSampleTracker {
    threshold: usize,
    consecutive: usize,
}

impl BadSampleTracker {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            consecutive: 0,
        }
    }

    /// Records one sample. Returns `true` when the unbroken bad run has
    /// reached the threshold as of this sample.
    pub fn observe(&mut self, bad: bool) -> bool {
        if bad {
            self.consecutive += 1;
        } else {
            self.consecutive = 0;
        }
        self.consecutive >= self.threshold
    }

    pub fn consecutive(&self) -> usize {
        self.consecutive
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }
}
