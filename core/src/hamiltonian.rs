//! # Hamiltonian Cycle Oracle
//!
//! Decides whether a graph has a Hamiltonian cycle. The degree constraints of
//! [`HamiltonianModel`] are solved repeatedly and disconnected solutions are
//! cut off by the [`ConnectivitySeparator`] until either a single cycle is
//! found or the model becomes unsatisfiable.

use anyhow::Context;

use crate::{
    graph::Graph,
    model::{EdgeVarMap, HamiltonianModel},
    oracle::{RustSatOracle, SatOracle},
    separation::{self, ConnectivitySeparator, RefineStats},
    Stats, Tour, WriteSolverLog,
};

/// The answer to a Hamiltonicity query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The graph has the given Hamiltonian cycle
    Cycle(Tour),
    /// The graph has no Hamiltonian cycle
    NoCycle,
}

impl Decision {
    pub fn is_cycle(&self) -> bool {
        matches!(self, Decision::Cycle(_))
    }
}

/// Hamiltonicity oracle for a single graph
///
/// # Generics
///
/// - `O`: the SAT oracle
pub struct HamiltonianOracle<O = RustSatOracle> {
    graph: Graph,
    vars: EdgeVarMap,
    model: HamiltonianModel<O>,
    refine_stats: RefineStats,
}

impl<O: SatOracle + Default> HamiltonianOracle<O> {
    /// Builds the oracle with a default-initialized SAT oracle
    pub fn new(graph: Graph) -> anyhow::Result<Self> {
        Self::with_oracle(graph, O::default())
    }
}

impl<O: SatOracle> HamiltonianOracle<O> {
    /// Builds the oracle on top of a fresh SAT oracle
    pub fn with_oracle(graph: Graph, mut oracle: O) -> anyhow::Result<Self> {
        let vars = EdgeVarMap::new(&graph, &mut oracle);
        let model = HamiltonianModel::new(&graph, &vars, oracle)?;
        Ok(HamiltonianOracle {
            graph,
            vars,
            model,
            refine_stats: RefineStats::default(),
        })
    }

    /// Decides whether the graph has a Hamiltonian cycle
    pub fn decide(&mut self) -> anyhow::Result<Decision> {
        self.decide_logged::<dyn WriteSolverLog>(None)
    }

    /// Decides whether the graph has a Hamiltonian cycle, writing oracle calls
    /// and cuts to the logger
    pub fn decide_logged<L>(&mut self, logger: Option<&mut L>) -> anyhow::Result<Decision>
    where
        L: WriteSolverLog + ?Sized,
    {
        let mut separator = ConnectivitySeparator::new(&self.graph, &self.vars);
        let Some(assignment) = separation::refine(
            &mut self.model,
            &mut separator,
            logger,
            &mut self.refine_stats,
        )?
        else {
            return Ok(Decision::NoCycle);
        };
        let selected = self.vars.selected(&self.graph, &assignment);
        let tour = Tour::from_edges(&self.graph, selected)
            .context("accepted assignment is not a Hamiltonian cycle")?;
        Ok(Decision::Cycle(tour))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Gets statistics of all decisions made by this oracle
    pub fn stats(&self) -> Stats {
        let model = self.model.stats();
        Stats {
            n_oracle_calls: self.refine_stats.n_oracle_calls,
            n_refinements: self.refine_stats.n_refinements,
            n_cuts: self.refine_stats.n_cuts,
            n_clauses: model.n_clauses,
            n_card_constraints: model.n_card_constraints,
            ..Default::default()
        }
    }
}

/// Decides whether `graph` has a Hamiltonian cycle using the default SAT
/// oracle. Graphs with fewer than three vertices are rejected with an
/// [`crate::InputError`].
pub fn decide_hamiltonian(graph: &Graph) -> anyhow::Result<Decision> {
    graph.validate()?;
    HamiltonianOracle::<RustSatOracle>::new(graph.clone())?.decide()
}

#[cfg(test)]
mod tests {
    use rustsat::types::Lit;

    use super::{decide_hamiltonian, Decision, HamiltonianOracle};
    use crate::{
        graph::{self, Graph},
        oracle::{SatOracle, Verdict},
        InputError,
    };

    fn cycle_graph(n: u32) -> Graph {
        Graph::from_edges((0..n).map(|v| (v, (v + 1) % n, 1))).unwrap()
    }

    fn petersen() -> Graph {
        let mut edges = vec![];
        for i in 0..5 {
            edges.push((i, (i + 1) % 5, 1));
            edges.push((i, i + 5, 1));
            edges.push((i + 5, (i + 2) % 5 + 5, 1));
        }
        Graph::from_edges(edges).unwrap()
    }

    fn assert_hamiltonian(graph: &Graph, decision: &Decision) {
        let Decision::Cycle(tour) = decision else {
            panic!("expected a cycle, got {decision:?}")
        };
        assert_eq!(tour.edges().len(), graph.n_vertices());
        let sub = graph.edge_subgraph(tour.edges());
        for v in graph.vertices() {
            assert_eq!(sub.degree(v), 2);
        }
        let comps = graph::connected_components(sub.vertices(), sub.edges().iter().map(|e| e.key()));
        assert_eq!(comps.len(), 1);
    }

    #[test]
    fn cycle_graphs() {
        for n in 3..=8 {
            let graph = cycle_graph(n);
            assert_hamiltonian(&graph, &decide_hamiltonian(&graph).unwrap());
        }
    }

    #[test]
    fn star_has_no_cycle() {
        for n in 4..=6 {
            let graph = Graph::from_edges((1..n).map(|v| (0, v, 1))).unwrap();
            assert_eq!(decide_hamiltonian(&graph).unwrap(), Decision::NoCycle);
        }
    }

    #[test]
    fn boundary() {
        let triangle = cycle_graph(3);
        assert_hamiltonian(&triangle, &decide_hamiltonian(&triangle).unwrap());
        let path = Graph::from_edges([(0, 1, 1), (1, 2, 1)]).unwrap();
        assert_eq!(decide_hamiltonian(&path).unwrap(), Decision::NoCycle);
    }

    #[test]
    fn disjoint_triangles_need_cut() {
        let graph = Graph::from_edges([
            (0, 1, 1),
            (1, 2, 1),
            (0, 2, 1),
            (3, 4, 1),
            (4, 5, 1),
            (3, 5, 1),
        ])
        .unwrap();
        let mut oracle = HamiltonianOracle::<crate::RustSatOracle>::new(graph).unwrap();
        assert_eq!(oracle.decide().unwrap(), Decision::NoCycle);
        let stats = oracle.stats();
        assert!(stats.n_refinements >= 1);
        assert_eq!(stats.n_oracle_calls, stats.n_refinements + 1);
    }

    #[test]
    fn prism() {
        let graph = Graph::from_edges([
            (0, 1, 1),
            (1, 2, 1),
            (0, 2, 1),
            (3, 4, 1),
            (4, 5, 1),
            (3, 5, 1),
            (0, 3, 1),
            (1, 4, 1),
            (2, 5, 1),
        ])
        .unwrap();
        assert_hamiltonian(&graph, &decide_hamiltonian(&graph).unwrap());
    }

    #[test]
    fn petersen_has_no_cycle() {
        let graph = petersen();
        assert_eq!(graph.n_edges(), 15);
        assert_eq!(decide_hamiltonian(&graph).unwrap(), Decision::NoCycle);
    }

    #[test]
    fn idempotent() {
        let graph = Graph::complete(6, |u, v| (u + v + 1).into()).unwrap();
        let first = decide_hamiltonian(&graph).unwrap();
        for _ in 0..3 {
            assert_eq!(decide_hamiltonian(&graph).unwrap().is_cycle(), first.is_cycle());
        }
        let mut oracle = HamiltonianOracle::<crate::RustSatOracle>::new(graph.clone()).unwrap();
        assert!(oracle.decide().unwrap().is_cycle());
        assert!(oracle.decide().unwrap().is_cycle());
    }

    #[test]
    fn too_few_vertices() {
        let graph = Graph::from_edges([(0, 1, 1)]).unwrap();
        let err = decide_hamiltonian(&graph).unwrap_err();
        assert_eq!(err.downcast_ref(), Some(&InputError::TooFewVertices(2)));
    }

    /// Oracle that fails on solving
    #[derive(Default)]
    struct Faulty(u32);

    impl SatOracle for Faulty {
        fn new_lit(&mut self) -> Lit {
            self.0 += 1;
            Lit::positive(self.0 - 1)
        }
        fn add_at_most(&mut self, _: &[Lit], _: usize) -> anyhow::Result<()> {
            Ok(())
        }
        fn add_clause(&mut self, _: &[Lit]) -> anyhow::Result<()> {
            Ok(())
        }
        fn solve(&mut self) -> anyhow::Result<Verdict> {
            anyhow::bail!("backend crashed")
        }
    }

    #[test]
    fn oracle_fault_is_error() {
        let mut oracle = HamiltonianOracle::<Faulty>::new(cycle_graph(4)).unwrap();
        assert!(oracle.decide().is_err());
    }
}
