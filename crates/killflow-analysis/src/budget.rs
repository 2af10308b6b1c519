use crate::config::AnalysisConfig;
use std::time::{Duration, Instant};

/// Wall-clock allowance of one top-level query, polled cooperatively by every walk.
#[derive(Debug, Clone, Copy)]
pub struct QueryBudget {
    start: Instant,
    limit: Option<Duration>,
}

impl QueryBudget {
    pub fn new(start: Instant, limit: Option<Duration>) -> Self {
        Self { start, limit }
    }

    pub fn unbounded() -> Self {
        Self::new(Instant::now(), None)
    }

    pub fn starting_now(limit: Option<Duration>) -> Self {
        Self::new(Instant::now(), limit)
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::starting_now(config.timeout())
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn expired(&self) -> bool {
        self.limit.map_or(false, |limit| self.elapsed() > limit)
    }
}

impl Default for QueryBudget {
    fn default() -> Self {
        Self::unbounded()
    }
}
