use std::fmt;

/// A `{loaded, total}` counter carried on a promise's progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Number of completed items.
    pub loaded: usize,
    /// Number of items expected, fixed when the operation was dispatched.
    pub total: usize,
}

impl Progress {
    pub fn new(loaded: usize, total: usize) -> Self {
        Self { loaded, total }
    }

    /// Completed share in `0.0..=1.0`. An empty operation counts as complete.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            (self.loaded as f32 / self.total as f32).min(1.0)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.loaded >= self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.loaded, self.total)
    }
}
