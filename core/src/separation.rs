//! # Lazy Constraint Generation
//!
//! A generic solve-check-refine loop: a [`CutModel`] is solved, a [`Separate`]
//! strategy inspects the assignment and either accepts it or returns cuts that
//! exclude it, and the cuts are appended to the model before solving again.
//!
//! [`ConnectivitySeparator`] is the strategy for subtour elimination: it
//! rejects assignments whose selected edges fall apart into several
//! components.

use anyhow::Context;
use rustsat::types::{Assignment, Lit, RsHashSet};

use crate::{
    graph::{self, Graph, Vertex},
    model::EdgeVarMap,
    oracle::Verdict,
    WriteSolverLog,
};

/// A constraint model that can only be strengthened
pub trait CutModel {
    /// Solves the model with all cuts added so far
    fn solve(&mut self) -> anyhow::Result<Verdict>;
    /// Appends a clause excluding part of the search space
    fn add_cut(&mut self, cut: &[Lit]) -> anyhow::Result<()>;
}

/// The outcome of checking a candidate assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Separation {
    /// The assignment satisfies all implicit constraints
    Accept,
    /// The assignment violates implicit constraints, the clauses exclude it
    Reject(Vec<Vec<Lit>>),
}

/// A separation strategy
pub trait Separate {
    /// Checks a candidate assignment
    fn check(&mut self, assignment: &Assignment) -> anyhow::Result<Separation>;
}

/// Statistics of a refinement loop
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct RefineStats {
    /// The number of calls to the SAT oracle
    pub n_oracle_calls: usize,
    /// The number of rejected candidate assignments
    pub n_refinements: usize,
    /// The number of cuts added
    pub n_cuts: usize,
}

/// Solves the model until the separator accepts an assignment or the model
/// becomes unsatisfiable. Returns the accepted assignment, if any.
pub fn refine<M, S, L>(
    model: &mut M,
    separator: &mut S,
    mut logger: Option<&mut L>,
    stats: &mut RefineStats,
) -> anyhow::Result<Option<Assignment>>
where
    M: CutModel + ?Sized,
    S: Separate + ?Sized,
    L: WriteSolverLog + ?Sized,
{
    loop {
        let verdict = model.solve()?;
        stats.n_oracle_calls += 1;
        if let Some(logger) = logger.as_deref_mut() {
            logger
                .log_oracle_call(verdict.result())
                .context("logger failed")?;
        }
        let assignment = match verdict {
            Verdict::Sat(assignment) => assignment,
            Verdict::Unsat => return Ok(None),
        };
        match separator.check(&assignment)? {
            Separation::Accept => return Ok(Some(assignment)),
            Separation::Reject(cuts) => {
                anyhow::ensure!(!cuts.is_empty(), "separator rejected without a cut");
                stats.n_refinements += 1;
                stats.n_cuts += cuts.len();
                if let Some(logger) = logger.as_deref_mut() {
                    logger.log_cuts(cuts.len()).context("logger failed")?;
                }
                for cut in &cuts {
                    model.add_cut(cut)?;
                }
            }
        }
    }
}

/// Rejects assignments whose selected edges do not connect all vertices. For
/// every connected component, the cut requires one of the edges leaving the
/// component to be selected.
pub struct ConnectivitySeparator<'g> {
    graph: &'g Graph,
    vars: &'g EdgeVarMap,
}

impl<'g> ConnectivitySeparator<'g> {
    pub fn new(graph: &'g Graph, vars: &'g EdgeVarMap) -> Self {
        ConnectivitySeparator { graph, vars }
    }

    /// Literals of all edges with exactly one endpoint in `component`
    fn crossing(&self, component: &[Vertex]) -> Vec<Lit> {
        let inside: RsHashSet<Vertex> = component.iter().copied().collect();
        self.graph
            .edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| inside.contains(&e.u) != inside.contains(&e.v))
            .map(|(idx, _)| self.vars.lit_at(idx))
            .collect()
    }
}

impl Separate for ConnectivitySeparator<'_> {
    fn check(&mut self, assignment: &Assignment) -> anyhow::Result<Separation> {
        let selected = self.vars.selected(self.graph, assignment);
        let components = graph::connected_components(
            self.graph.vertices(),
            selected.iter().map(|e| (e.u, e.v)),
        );
        if components.len() == 1 {
            return Ok(Separation::Accept);
        }
        if components.is_empty() {
            // nothing to connect, exclude everything
            return Ok(Separation::Reject(vec![vec![]]));
        }
        Ok(Separation::Reject(
            components.iter().map(|comp| self.crossing(comp)).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use rustsat::types::{Assignment, Lit};

    use super::{refine, ConnectivitySeparator, CutModel, RefineStats, Separate, Separation};
    use crate::{
        graph::Graph,
        model::EdgeVarMap,
        oracle::{RustSatOracle, SatOracle, Verdict},
        WriteSolverLog,
    };

    fn assignment_selecting(vars: &EdgeVarMap, graph: &Graph, edges: &[(u32, u32)]) -> Assignment {
        graph
            .edges()
            .iter()
            .map(|e| {
                let lit = vars.lit(e.u, e.v).unwrap();
                if edges.contains(&(e.u, e.v)) {
                    lit
                } else {
                    !lit
                }
            })
            .collect()
    }

    #[test]
    fn accepts_spanning_cycle() {
        let graph = Graph::complete(4, |_, _| 1).unwrap();
        let mut oracle: RustSatOracle = RustSatOracle::default();
        let vars = EdgeVarMap::new(&graph, &mut oracle);
        let sol = assignment_selecting(&vars, &graph, &[(0, 1), (1, 2), (2, 3), (0, 3)]);
        let mut sep = ConnectivitySeparator::new(&graph, &vars);
        assert_eq!(sep.check(&sol).unwrap(), Separation::Accept);
    }

    #[test]
    fn cuts_split_components() {
        // two triangles 0-1-2 and 3-4-5 bridged by 2-3 and 0-5
        let graph = Graph::from_edges([
            (0, 1, 1),
            (1, 2, 1),
            (0, 2, 1),
            (3, 4, 1),
            (4, 5, 1),
            (3, 5, 1),
            (2, 3, 1),
            (0, 5, 1),
        ])
        .unwrap();
        let mut oracle: RustSatOracle = RustSatOracle::default();
        let vars = EdgeVarMap::new(&graph, &mut oracle);
        let sol = assignment_selecting(
            &vars,
            &graph,
            &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)],
        );
        let mut sep = ConnectivitySeparator::new(&graph, &vars);
        let Separation::Reject(cuts) = sep.check(&sol).unwrap() else {
            panic!("disconnected assignment accepted")
        };
        let bridges = vec![vars.lit(2, 3).unwrap(), vars.lit(0, 5).unwrap()];
        assert_eq!(cuts, vec![bridges.clone(), bridges]);
    }

    #[derive(Default)]
    struct Counter {
        oracle_calls: usize,
        cuts: usize,
    }

    impl WriteSolverLog for Counter {
        fn log_threshold(&mut self, _: usize, _: u64, _: bool) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_oracle_call(&mut self, _: rustsat::solvers::SolverResult) -> anyhow::Result<()> {
            self.oracle_calls += 1;
            Ok(())
        }
        fn log_cuts(&mut self, n_cuts: usize) -> anyhow::Result<()> {
            self.cuts += n_cuts;
            Ok(())
        }
        fn log_tour(&mut self, _: &crate::Tour) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_routine_start(&mut self, _: &'static str) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_routine_end(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_end_solve(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        fn log_message(&mut self, _: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Model over a single literal that the separator rejects a fixed number
    /// of times
    struct Toy {
        oracle: RustSatOracle,
        lit: Lit,
    }

    impl CutModel for Toy {
        fn solve(&mut self) -> anyhow::Result<Verdict> {
            self.oracle.solve()
        }
        fn add_cut(&mut self, cut: &[Lit]) -> anyhow::Result<()> {
            self.oracle.add_clause(cut)
        }
    }

    struct RejectPositive(Lit);

    impl Separate for RejectPositive {
        fn check(&mut self, assignment: &Assignment) -> anyhow::Result<Separation> {
            if assignment.lit_value(self.0) == rustsat::types::TernaryVal::True {
                Ok(Separation::Reject(vec![vec![!self.0]]))
            } else {
                Ok(Separation::Accept)
            }
        }
    }

    #[test]
    fn refine_loop() {
        let mut oracle = RustSatOracle::default();
        let lit = oracle.new_lit();
        oracle.add_clause(&[lit]).unwrap();
        let mut model = Toy { oracle, lit };
        let mut sep = RejectPositive(model.lit);
        let mut stats = RefineStats::default();
        let mut logger = Counter::default();
        let res = refine(&mut model, &mut sep, Some(&mut logger), &mut stats).unwrap();
        // the only model is rejected, the cut makes it unsat
        assert!(res.is_none());
        assert_eq!(
            stats,
            RefineStats {
                n_oracle_calls: 2,
                n_refinements: 1,
                n_cuts: 1,
            }
        );
        assert_eq!(logger.oracle_calls, 2);
        assert_eq!(logger.cuts, 1);
    }
}
