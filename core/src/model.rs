//! # Hamiltonian Cycle Encoding
//!
//! Translates a graph into the degree constraints every Hamiltonian cycle
//! satisfies. Connectivity is not encoded up front but enforced lazily by
//! cuts, see [`crate::separation`].

use rustsat::types::{Assignment, Lit, RsHashMap, TernaryVal};

use crate::{
    graph::{Edge, Graph, Vertex},
    oracle::{SatOracle, Verdict},
    separation::CutModel,
};

/// Bijection between the edges of a graph and the decision literals selecting
/// them. Both orientations of an edge map to the same literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeVarMap {
    /// Literals indexed by edge index
    lits: Vec<Lit>,
    by_key: RsHashMap<(Vertex, Vertex), Lit>,
}

impl EdgeVarMap {
    /// Allocates one literal per edge of the graph in the oracle
    pub fn new<O: SatOracle + ?Sized>(graph: &Graph, oracle: &mut O) -> Self {
        let lits: Vec<Lit> = graph.edges().iter().map(|_| oracle.new_lit()).collect();
        let by_key = graph
            .edges()
            .iter()
            .zip(&lits)
            .map(|(e, &l)| (e.key(), l))
            .collect();
        EdgeVarMap { lits, by_key }
    }

    /// Looks up the literal of the edge between two vertices
    pub fn lit(&self, a: Vertex, b: Vertex) -> Option<Lit> {
        self.by_key
            .get(&(std::cmp::min(a, b), std::cmp::max(a, b)))
            .copied()
    }

    /// Gets the literal of the edge with the given index
    pub fn lit_at(&self, edge_idx: usize) -> Lit {
        self.lits[edge_idx]
    }

    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    /// Collects the edges of `graph` whose literal is true in the assignment
    pub fn selected<'g>(&self, graph: &'g Graph, assignment: &Assignment) -> Vec<&'g Edge> {
        debug_assert_eq!(graph.n_edges(), self.lits.len());
        graph
            .edges()
            .iter()
            .zip(&self.lits)
            .filter(|&(_, &l)| assignment.lit_value(l) == TernaryVal::True)
            .map(|(e, _)| e)
            .collect()
    }
}

/// Counters of the constraints a model emitted
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct ModelStats {
    /// The number of clauses, including cuts
    pub n_clauses: usize,
    /// The number of cardinality constraints
    pub n_card_constraints: usize,
    /// The number of cuts added after construction
    pub n_cuts: usize,
}

/// The boolean constraint model of one Hamiltonicity query
///
/// After construction, constraints can only be added through
/// [`CutModel::add_cut`]; nothing is ever removed.
pub struct HamiltonianModel<O> {
    oracle: O,
    stats: ModelStats,
}

impl<O: SatOracle> HamiltonianModel<O> {
    /// Encodes that every vertex of `graph` has exactly two selected incident
    /// edges and that at most `|V|` edges are selected overall
    ///
    /// Graphs with fewer than three vertices and vertices with degree below
    /// two do not fail here but make the model unsatisfiable.
    pub fn new(graph: &Graph, vars: &EdgeVarMap, oracle: O) -> anyhow::Result<Self> {
        let mut model = HamiltonianModel {
            oracle,
            stats: ModelStats::default(),
        };
        if graph.n_vertices() < 3 {
            model.clause(&[])?;
        }
        model.at_most(vars.lits(), graph.n_vertices())?;
        for v in graph.vertices() {
            let incident: Vec<Lit> = graph.incident(v).map(|(idx, _)| vars.lit_at(idx)).collect();
            model.clause(&incident)?;
            model.at_most(&incident, 2)?;
            let negated: Vec<Lit> = incident.iter().map(|&l| !l).collect();
            match incident.len().checked_sub(2) {
                Some(k) => model.at_most(&negated, k)?,
                // fewer than two incident edges can never reach degree two
                None => model.clause(&[])?,
            }
        }
        Ok(model)
    }

    fn clause(&mut self, lits: &[Lit]) -> anyhow::Result<()> {
        self.stats.n_clauses += 1;
        self.oracle.add_clause(lits)
    }

    fn at_most(&mut self, lits: &[Lit], k: usize) -> anyhow::Result<()> {
        self.stats.n_card_constraints += 1;
        self.oracle.add_at_most(lits, k)
    }

    pub fn stats(&self) -> ModelStats {
        self.stats
    }
}

impl<O: SatOracle> CutModel for HamiltonianModel<O> {
    fn solve(&mut self) -> anyhow::Result<Verdict> {
        self.oracle.solve()
    }

    fn add_cut(&mut self, cut: &[Lit]) -> anyhow::Result<()> {
        self.stats.n_cuts += 1;
        self.clause(cut)
    }
}
