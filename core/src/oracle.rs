//! # Satisfiability Oracle
//!
//! The capability interface the Hamiltonian encoding needs from a SAT solver
//! and its implementation on top of incremental [`rustsat`] solvers.

use anyhow::Context;
use rustsat::{
    encodings::card::{self, BoundUpper},
    instances::{BasicVarManager, ManageVars},
    solvers::{SolveIncremental, SolveStats, SolverResult},
    types::{Assignment, Clause, Lit},
};
use rustsat_cadical::CaDiCaL;

/// The answer of a satisfiability oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// All constraints can be satisfied by the given assignment
    Sat(Assignment),
    /// The constraints are unsatisfiable
    Unsat,
}

impl Verdict {
    /// Converts the verdict to the corresponding [`SolverResult`] for logging
    pub fn result(&self) -> SolverResult {
        match self {
            Verdict::Sat(_) => SolverResult::Sat,
            Verdict::Unsat => SolverResult::Unsat,
        }
    }
}

/// Errors of the oracle backend
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("SAT oracle returned without a verdict")]
    NoVerdict,
}

/// Trait specifying the interface to a satisfiability oracle
///
/// All constraints are permanent for the lifetime of the oracle.
pub trait SatOracle {
    /// Allocates a fresh literal
    fn new_lit(&mut self) -> Lit;

    /// Requires that at most `k` of the given literals are true
    fn add_at_most(&mut self, lits: &[Lit], k: usize) -> anyhow::Result<()>;

    /// Requires that at least one of the given literals is true. The empty
    /// clause makes the oracle unsatisfiable.
    fn add_clause(&mut self, lits: &[Lit]) -> anyhow::Result<()>;

    /// Attempts to satisfy all constraints added so far
    fn solve(&mut self) -> anyhow::Result<Verdict>;
}

/// A [`SatOracle`] backed by an incremental [`rustsat`] solver. Cardinality
/// constraints are encoded to clauses with a totalizer.
///
/// # Generics
///
/// - `O`: the SAT solver backend
#[derive(Default)]
pub struct RustSatOracle<O = CaDiCaL<'static, 'static>> {
    /// The SAT solver backend
    oracle: O,
    /// The variable manager keeping track of variables
    var_manager: BasicVarManager,
}

impl<O> RustSatOracle<O> {
    pub fn new(oracle: O) -> Self {
        RustSatOracle {
            oracle,
            var_manager: BasicVarManager::default(),
        }
    }

    /// Gets a reference to the underlying solver
    pub fn backend(&self) -> &O {
        &self.oracle
    }
}

impl<O> SatOracle for RustSatOracle<O>
where
    O: SolveIncremental + SolveStats,
{
    fn new_lit(&mut self) -> Lit {
        self.var_manager.new_var().pos_lit()
    }

    fn add_at_most(&mut self, lits: &[Lit], k: usize) -> anyhow::Result<()> {
        if k >= lits.len() {
            return Ok(());
        }
        if k == 0 {
            for &l in lits {
                self.oracle.add_unit(!l)?;
            }
            return Ok(());
        }
        let mut encoding = card::Totalizer::from_iter(lits.iter().copied());
        encoding.encode_ub(k..k + 1, &mut self.oracle, &mut self.var_manager)?;
        for unit in encoding.enforce_ub(k)? {
            self.oracle.add_unit(unit)?;
        }
        Ok(())
    }

    fn add_clause(&mut self, lits: &[Lit]) -> anyhow::Result<()> {
        self.oracle
            .add_clause(Clause::from_iter(lits.iter().copied()))?;
        Ok(())
    }

    fn solve(&mut self) -> anyhow::Result<Verdict> {
        match self.oracle.solve().context("SAT oracle failed")? {
            SolverResult::Sat => {
                let solution = match self.var_manager.max_var() {
                    Some(max_var) => self.oracle.solution(max_var)?,
                    None => std::iter::empty::<Lit>().collect(),
                };
                Ok(Verdict::Sat(solution))
            }
            SolverResult::Unsat => Ok(Verdict::Unsat),
            SolverResult::Interrupted => anyhow::bail!(Error::NoVerdict),
        }
    }
}
