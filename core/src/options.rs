//! # Options
//!
//! This module contains all configuration options of the bottleneck solver.

use std::{fmt, time::Duration};

/// Solver-wide configuration options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Options {
    /// How the threshold index is searched
    pub strategy: SearchStrategy,
    /// Start the search at the first threshold that is not below
    /// [`crate::BottleneckSolver::lower_bound`]
    pub seed_lower_bound: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            strategy: SearchStrategy::default(),
            seed_lower_bound: true,
        }
    }
}

/// Strategies for searching the optimal threshold
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SearchStrategy {
    /// Test thresholds in increasing order until one is feasible
    SequentialUp,
    /// Start from the full edge set and require a strictly smaller bottleneck
    /// until infeasible
    SequentialDown,
    /// Bisect the interval of threshold indices
    #[default]
    BinarySearch,
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategy::SequentialUp => write!(f, "sequential-up"),
            SearchStrategy::SequentialDown => write!(f, "sequential-down"),
            SearchStrategy::BinarySearch => write!(f, "binary-search"),
        }
    }
}

/// Limits for a call to [`crate::BottleneckSolver::solve`]
#[derive(Clone, Copy, Default, Debug)]
pub struct Limits {
    /// The time budget, checked before testing each threshold
    pub time: Option<Duration>,
    /// The maximum number of SAT oracle calls to make
    pub oracle_calls: Option<usize>,
}

impl Limits {
    /// No limits
    pub fn none() -> Limits {
        Limits {
            time: None,
            oracle_calls: None,
        }
    }
}
