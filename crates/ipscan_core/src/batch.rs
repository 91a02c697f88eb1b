/// Size thresholds applied before a batch is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Counts above this surface a non-blocking warning.
    pub soft: usize,
    /// Counts above this need operator confirmation.
    pub hard: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            soft: 800,
            hard: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchAdvisory {
    #[default]
    Within,
    ApproachingLimit,
    ExceedsLimit,
}

impl BatchAdvisory {
    pub fn classify(count: usize, limits: BatchLimits) -> Self {
        if count > limits.hard {
            BatchAdvisory::ExceedsLimit
        } else if count > limits.soft {
            BatchAdvisory::ApproachingLimit
        } else {
            BatchAdvisory::Within
        }
    }

    pub fn needs_confirmation(self) -> bool {
        self == BatchAdvisory::ExceedsLimit
    }
}
