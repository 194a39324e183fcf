/// Default maximum nesting depth for encoders and decoders.
pub const DEFAULT_MAXIMUM_DEPTH: usize = 1024;

/// Remaining nesting budget of one encode or decode operation.
///
/// Every array or object entry consumes one unit; leaving the structure gives
/// it back. A structure nested exactly `maximum_depth` levels deep is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    maximum_depth: usize,
    remaining_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self::new(DEFAULT_MAXIMUM_DEPTH)
    }
}

impl Limits {
    /// Limits allowing `maximum_depth` levels of nesting.
    pub const fn new(maximum_depth: usize) -> Self {
        Self {
            maximum_depth,
            remaining_depth: maximum_depth,
        }
    }

    /// The configured maximum.
    pub const fn maximum_depth(&self) -> usize {
        self.maximum_depth
    }

    /// Levels that can still be entered.
    pub const fn remaining_depth(&self) -> usize {
        self.remaining_depth
    }

    /// Consume one level. Returns `false` when the budget is exhausted, in
    /// which case nothing is consumed.
    #[must_use]
    pub fn enter(&mut self) -> bool {
        if self.remaining_depth == 0 {
            return false;
        }
        self.remaining_depth -= 1;
        true
    }

    /// Give back one level.
    pub fn leave(&mut self) {
        debug_assert!(self.remaining_depth < self.maximum_depth);
        self.remaining_depth += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    #[test]
    fn exact_boundary() {
        let mut limits = Limits::new(2);
        assert!(limits.enter());
        assert!(limits.enter());
        assert!(!limits.enter());
        assert_eq!(limits.remaining_depth(), 0);
        limits.leave();
        assert!(limits.enter());
    }
}
