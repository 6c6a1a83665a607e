//! # BTSP Core
//!
//! Decides Hamiltonicity of graphs with a SAT oracle and lazily generated
//! connectivity cuts, and solves the bottleneck traveling salesman problem by
//! searching over edge weight thresholds.

use rustsat::solvers::SolverResult;

pub mod graph;
pub use graph::{Graph, InputError};

pub mod oracle;
pub use oracle::{RustSatOracle, SatOracle};

pub mod model;

pub mod separation;
pub use separation::{Separate, Separation};

pub mod hamiltonian;
pub use hamiltonian::{decide_hamiltonian, Decision, HamiltonianOracle};

pub mod bottleneck;
pub use bottleneck::{solve_bottleneck_tsp, BottleneckResult, BottleneckSolver};

pub mod options;
pub use options::{Limits, Options, SearchStrategy};

pub mod types;
pub use types::Tour;

pub mod fio;

pub(crate) mod termination;
pub use termination::MaybeTerminated;
pub use termination::MaybeTerminatedError;
pub use termination::Termination;

/// Statistics of the solver
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Stats {
    /// The number of calls to [`BottleneckSolver::solve`]
    pub n_solve_calls: usize,
    /// The number of thresholds tested
    pub n_thresholds: usize,
    /// The number of calls to the SAT oracle
    pub n_oracle_calls: usize,
    /// The number of rejected disconnected assignments
    pub n_refinements: usize,
    /// The number of connectivity cuts added
    pub n_cuts: usize,
    /// The number of tours found
    pub n_tours: usize,
    /// The number of clauses added to the oracles, including cuts
    pub n_clauses: usize,
    /// The number of cardinality constraints added to the oracles
    pub n_card_constraints: usize,
}

impl std::ops::AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        self.n_solve_calls += rhs.n_solve_calls;
        self.n_thresholds += rhs.n_thresholds;
        self.n_oracle_calls += rhs.n_oracle_calls;
        self.n_refinements += rhs.n_refinements;
        self.n_cuts += rhs.n_cuts;
        self.n_tours += rhs.n_tours;
        self.n_clauses += rhs.n_clauses;
        self.n_card_constraints += rhs.n_card_constraints;
    }
}

/// A logger to attach to a solver
pub trait WriteSolverLog {
    /// Adds a tested threshold to the log
    fn log_threshold(&mut self, idx: usize, weight: graph::Weight, feasible: bool)
        -> anyhow::Result<()>;
    /// Adds an oracle call to the log
    fn log_oracle_call(&mut self, result: SolverResult) -> anyhow::Result<()>;
    /// Adds a refinement with the given number of cuts to the log
    fn log_cuts(&mut self, n_cuts: usize) -> anyhow::Result<()>;
    /// Adds a found tour to the log
    fn log_tour(&mut self, tour: &Tour) -> anyhow::Result<()>;
    /// Adds a new routine starting to the log
    fn log_routine_start(&mut self, desc: &'static str) -> anyhow::Result<()>;
    /// Adds a new routine ending to the log
    fn log_routine_end(&mut self) -> anyhow::Result<()>;
    /// Adds end of solving to the log
    fn log_end_solve(&mut self) -> anyhow::Result<()>;
    /// Logs any string
    fn log_message(&mut self, msg: &str) -> anyhow::Result<()>;
}
