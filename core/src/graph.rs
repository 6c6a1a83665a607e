//! # Weighted Undirected Graphs
//!
//! The graph representation the solvers operate on, together with the
//! connectivity utility used by the separation routine and input validation.

use std::collections::BTreeMap;

use petgraph::unionfind::UnionFind;
use rustsat::types::RsHashMap;

/// Vertex identifier
pub type Vertex = u32;
/// Edge weight, must be strictly positive
pub type Weight = u64;

/// Errors for malformed input graphs
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Graph has {0} vertices but at least 3 are required")]
    TooFewVertices(usize),
    #[error("Edge ({0}, {1}) has a non-positive weight")]
    NonPositiveWeight(Vertex, Vertex),
    #[error("Self-loop at vertex {0}")]
    SelfLoop(Vertex),
    #[error("Duplicate edge ({0}, {1})")]
    DuplicateEdge(Vertex, Vertex),
    #[error("Graph is not complete, edge ({0}, {1}) is missing")]
    NotComplete(Vertex, Vertex),
    #[error("Edge references unknown vertex {0}")]
    UnknownVertex(Vertex),
}

/// An undirected weighted edge. The endpoints are stored with `u < v`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub u: Vertex,
    pub v: Vertex,
    pub weight: Weight,
}

impl Edge {
    /// Creates a new edge, normalizing the endpoint order
    pub fn new(a: Vertex, b: Vertex, weight: Weight) -> Self {
        Edge {
            u: std::cmp::min(a, b),
            v: std::cmp::max(a, b),
            weight,
        }
    }

    /// The orientation-independent key of the edge
    pub fn key(&self) -> (Vertex, Vertex) {
        (self.u, self.v)
    }

    /// Gets the endpoint opposite of `x`, if `x` is an endpoint
    pub fn other(&self, x: Vertex) -> Option<Vertex> {
        if x == self.u {
            Some(self.v)
        } else if x == self.v {
            Some(self.u)
        } else {
            None
        }
    }
}

/// Normalizes an unordered vertex pair
fn key(a: Vertex, b: Vertex) -> (Vertex, Vertex) {
    (std::cmp::min(a, b), std::cmp::max(a, b))
}

/// A simple undirected graph with positive edge weights
///
/// Vertices are kept in ascending order, edges in insertion order. Both
/// orientations of an edge refer to the same edge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Graph {
    /// Maps every vertex to the indices of its incident edges
    adjacency: BTreeMap<Vertex, Vec<usize>>,
    edges: Vec<Edge>,
    index: RsHashMap<(Vertex, Vertex), usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph with vertices `0..n` and no edges
    pub fn with_vertices(n: u32) -> Self {
        let mut graph = Graph::new();
        for v in 0..n {
            graph.add_vertex(v);
        }
        graph
    }

    /// Builds a graph from weighted edges. The vertex set consists of all
    /// edge endpoints.
    pub fn from_edges<I>(edges: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (Vertex, Vertex, Weight)>,
    {
        let mut graph = Graph::new();
        for (u, v, w) in edges {
            graph.add_edge(u, v, w)?;
        }
        Ok(graph)
    }

    /// Builds the complete graph on vertices `0..n` with weights given by a
    /// function of the (ordered) endpoints
    pub fn complete<F>(n: u32, mut weight: F) -> anyhow::Result<Self>
    where
        F: FnMut(Vertex, Vertex) -> Weight,
    {
        let mut graph = Graph::with_vertices(n);
        for u in 0..n {
            for v in u + 1..n {
                graph.add_edge(u, v, weight(u, v))?;
            }
        }
        Ok(graph)
    }

    /// Adds an isolated vertex. Returns false if the vertex already existed.
    pub fn add_vertex(&mut self, v: Vertex) -> bool {
        if self.adjacency.contains_key(&v) {
            return false;
        }
        self.adjacency.insert(v, vec![]);
        true
    }

    /// Adds an edge, implicitly adding missing endpoints
    pub fn add_edge(&mut self, a: Vertex, b: Vertex, weight: Weight) -> anyhow::Result<()> {
        if a == b {
            anyhow::bail!(InputError::SelfLoop(a));
        }
        if weight == 0 {
            anyhow::bail!(InputError::NonPositiveWeight(a, b));
        }
        if self.index.contains_key(&key(a, b)) {
            anyhow::bail!(InputError::DuplicateEdge(a, b));
        }
        self.push_edge(Edge::new(a, b, weight));
        Ok(())
    }

    fn push_edge(&mut self, edge: Edge) {
        let idx = self.edges.len();
        self.adjacency.entry(edge.u).or_default().push(idx);
        self.adjacency.entry(edge.v).or_default().push(idx);
        self.index.insert(edge.key(), idx);
        self.edges.push(edge);
    }

    pub fn n_vertices(&self) -> usize {
        self.adjacency.len()
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    /// Iterates over the vertices in ascending order
    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn contains_vertex(&self, v: Vertex) -> bool {
        self.adjacency.contains_key(&v)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Looks up the edge between two vertices in either orientation
    pub fn edge(&self, a: Vertex, b: Vertex) -> Option<&Edge> {
        self.edge_index(a, b).map(|idx| &self.edges[idx])
    }

    /// Gets the index of the edge between two vertices in either orientation
    pub fn edge_index(&self, a: Vertex, b: Vertex) -> Option<usize> {
        self.index.get(&key(a, b)).copied()
    }

    /// Iterates over the indices and edges incident to `v`
    pub fn incident(&self, v: Vertex) -> impl Iterator<Item = (usize, &Edge)> + '_ {
        self.adjacency
            .get(&v)
            .into_iter()
            .flatten()
            .map(move |&idx| (idx, &self.edges[idx]))
    }

    pub fn degree(&self, v: Vertex) -> usize {
        self.adjacency.get(&v).map_or(0, Vec::len)
    }

    /// Checks whether every pair of distinct vertices is connected
    pub fn is_complete(&self) -> bool {
        self.missing_edge().is_none()
    }

    fn missing_edge(&self) -> Option<(Vertex, Vertex)> {
        let n = self.n_vertices();
        if self.edges.len() == n * n.saturating_sub(1) / 2 {
            return None;
        }
        let vertices: Vec<_> = self.vertices().collect();
        for (i, &u) in vertices.iter().enumerate() {
            for &v in &vertices[i + 1..] {
                if !self.index.contains_key(&key(u, v)) {
                    return Some((u, v));
                }
            }
        }
        None
    }

    /// The subgraph with the given edges over the _full_ vertex set of this
    /// graph. Vertex identities are preserved and vertices not touched by any
    /// of the edges stay in the subgraph as isolated vertices.
    pub fn edge_subgraph<'a, I>(&self, edges: I) -> Graph
    where
        I: IntoIterator<Item = &'a Edge>,
    {
        let mut sub = Graph {
            adjacency: self.adjacency.keys().map(|&v| (v, vec![])).collect(),
            edges: vec![],
            index: RsHashMap::default(),
        };
        for edge in edges {
            debug_assert_eq!(self.edge(edge.u, edge.v), Some(edge));
            if !sub.index.contains_key(&edge.key()) {
                sub.push_edge(*edge);
            }
        }
        sub
    }

    /// Checks the requirements every input graph must fulfill. Self-loops,
    /// duplicate edges and non-positive weights are already rejected when
    /// adding edges.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.n_vertices() < 3 {
            anyhow::bail!(InputError::TooFewVertices(self.n_vertices()));
        }
        Ok(())
    }

    /// Like [`Graph::validate`] but additionally requires the graph to be complete
    pub fn validate_complete(&self) -> anyhow::Result<()> {
        self.validate()?;
        if let Some((u, v)) = self.missing_edge() {
            anyhow::bail!(InputError::NotComplete(u, v));
        }
        Ok(())
    }
}

/// Partitions the given vertices into the connected components induced by the
/// given edges. Edges with an endpoint outside of `vertices` are ignored.
///
/// Components are returned in order of their smallest vertex and each
/// component is sorted.
pub fn connected_components<V, E>(vertices: V, edges: E) -> Vec<Vec<Vertex>>
where
    V: IntoIterator<Item = Vertex>,
    E: IntoIterator<Item = (Vertex, Vertex)>,
{
    let mut verts: Vec<Vertex> = vertices.into_iter().collect();
    verts.sort_unstable();
    verts.dedup();
    let pos: RsHashMap<Vertex, usize> = verts.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let mut sets = UnionFind::<usize>::new(verts.len());
    for (a, b) in edges {
        let (Some(&a), Some(&b)) = (pos.get(&a), pos.get(&b)) else {
            continue;
        };
        sets.union(a, b);
    }

    let mut by_root: BTreeMap<usize, Vec<Vertex>> = BTreeMap::new();
    for (i, &v) in verts.iter().enumerate() {
        by_root.entry(sets.find_mut(i)).or_default().push(v);
    }
    let mut components: Vec<Vec<Vertex>> = by_root.into_values().collect();
    components.sort_unstable_by_key(|comp| comp[0]);
    components
}
