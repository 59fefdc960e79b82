//! Loop termination heuristics
//!
//! None of these prove the feed is exhausted. They bound the work a crawl
//! does when the page stops producing new records.

use crate::config::ScrapingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a crawl stopped scrolling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// The iteration budget was spent
    MaxIterations,

    /// Several consecutive iterations produced no new records
    Stalled,

    /// The scroll position stopped moving
    PositionUnchanged,

    /// The requested number of records was collected
    CountCapReached,

    /// Process memory went over the configured limit
    MemoryLimit,

    /// The browser session stopped answering mid-crawl
    SessionLost,
}

impl StopReason {
    /// Returns true if the record set may be missing reachable records
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::MemoryLimit | Self::SessionLost)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxIterations => write!(f, "iteration limit reached"),
            Self::Stalled => write!(f, "no new posts"),
            Self::PositionUnchanged => write!(f, "scroll position unchanged"),
            Self::CountCapReached => write!(f, "post limit reached"),
            Self::MemoryLimit => write!(f, "memory limit exceeded"),
            Self::SessionLost => write!(f, "browser session lost"),
        }
    }
}

/// Counters the crawl loop updates once per iteration
#[derive(Debug, Clone, Default)]
pub struct CrawlProgress {
    iterations: u32,
    consecutive_stalls: u32,
    /// Last three position measurements, newest last
    positions: [Option<f64>; 3],
}

impl CrawlProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed iteration
    ///
    /// # Arguments
    ///
    /// * `net_new` - Records added to the store by this iteration
    /// * `position` - Scroll marker measured after extraction, if readable
    pub fn record(&mut self, net_new: usize, position: Option<f64>) {
        self.iterations += 1;
        if net_new == 0 {
            self.consecutive_stalls += 1;
        } else {
            self.consecutive_stalls = 0;
        }
        self.positions.rotate_left(1);
        self.positions[2] = position;
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn consecutive_stalls(&self) -> u32 {
        self.consecutive_stalls
    }

    /// Returns true if the newest measurement equals the two before it
    fn position_repeated(&self) -> bool {
        match self.positions {
            [Some(a), Some(b), Some(c)] => a == b && b == c,
            _ => false,
        }
    }
}

/// Decides when the scroll loop ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    pub max_iterations: u32,
    pub stall_limit: u32,
    /// Iterations that must pass before an unchanged position counts
    pub position_warmup: u32,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self::from_config(&ScrapingConfig::default())
    }
}

impl TerminationPolicy {
    pub fn from_config(config: &ScrapingConfig) -> Self {
        Self {
            max_iterations: config.max_scroll_attempts,
            stall_limit: config.stall_limit,
            position_warmup: config.position_warmup,
        }
    }

    /// Checks the stop conditions in order: stalls, position, iterations
    pub fn evaluate(&self, progress: &CrawlProgress) -> Option<StopReason> {
        if progress.consecutive_stalls >= self.stall_limit {
            return Some(StopReason::Stalled);
        }
        if progress.iterations > self.position_warmup && progress.position_repeated() {
            return Some(StopReason::PositionUnchanged);
        }
        if progress.iterations >= self.max_iterations {
            return Some(StopReason::MaxIterations);
        }
        None
    }
}
