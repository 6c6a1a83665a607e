//! # Types
//!
//! Shared result types of the solvers.

use std::fmt;

use rustsat::types::RsHashMap;

use crate::graph::{Edge, Graph, Vertex, Weight};

/// Reasons why a set of edges is not a Hamiltonian cycle
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TourError {
    #[error("A tour of {expected} vertices needs {expected} edges, got {found}")]
    WrongLength { expected: usize, found: usize },
    #[error("Edge ({0}, {1}) is not in the graph")]
    UnknownEdge(Vertex, Vertex),
    #[error("Vertex {0} has {1} tour edges instead of 2")]
    BadDegree(Vertex, usize),
    #[error("Tour edges form a cycle of only {0} vertices")]
    Subtour(usize),
}

/// A Hamiltonian cycle
///
/// The vertex sequence starts at the smallest vertex of the graph, the edge
/// at position `i` connects vertex `i` to vertex `i + 1` (wrapping around).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tour {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

impl Tour {
    /// Orders a set of cycle edges into a tour, checking that they form a
    /// single cycle through all vertices of `graph`
    pub fn from_edges<'a, I>(graph: &Graph, edges: I) -> anyhow::Result<Tour>
    where
        I: IntoIterator<Item = &'a Edge>,
    {
        let edges: Vec<&Edge> = edges.into_iter().collect();
        let n = graph.n_vertices();
        if edges.len() != n {
            anyhow::bail!(TourError::WrongLength {
                expected: n,
                found: edges.len(),
            });
        }
        let mut adjacent: RsHashMap<Vertex, Vec<&Edge>> = RsHashMap::default();
        for &edge in &edges {
            if graph.edge(edge.u, edge.v) != Some(edge) {
                anyhow::bail!(TourError::UnknownEdge(edge.u, edge.v));
            }
            adjacent.entry(edge.u).or_default().push(edge);
            adjacent.entry(edge.v).or_default().push(edge);
        }
        for v in graph.vertices() {
            let deg = adjacent.get(&v).map_or(0, Vec::len);
            if deg != 2 {
                anyhow::bail!(TourError::BadDegree(v, deg));
            }
        }
        let Some(start) = graph.vertices().next() else {
            anyhow::bail!(TourError::WrongLength {
                expected: 3,
                found: 0,
            });
        };

        let mut vertices = Vec::with_capacity(n);
        let mut ordered = Vec::with_capacity(n);
        // leave the start towards its smaller neighbor
        let Some(&first) = adjacent[&start].iter().min_by_key(|e| e.other(start)) else {
            anyhow::bail!(TourError::BadDegree(start, 0));
        };
        let mut edge = first;
        let mut cur = start;
        loop {
            vertices.push(cur);
            ordered.push(*edge);
            cur = if edge.u == cur { edge.v } else { edge.u };
            if cur == start || vertices.len() > n {
                break;
            }
            let prev = edge;
            let Some(&next) = adjacent[&cur].iter().find(|&&e| e != prev) else {
                anyhow::bail!(TourError::BadDegree(cur, 1));
            };
            edge = next;
        }
        if vertices.len() != n {
            anyhow::bail!(TourError::Subtour(vertices.len()));
        }
        Ok(Tour {
            vertices,
            edges: ordered,
        })
    }

    /// The vertices in visiting order, without returning to the start
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The edges in visiting order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The maximum weight of a tour edge
    pub fn bottleneck(&self) -> Weight {
        self.edges.iter().map(|e| e.weight).max().unwrap_or(0)
    }

    pub fn total_weight(&self) -> Weight {
        self.edges.iter().map(|e| e.weight).sum()
    }
}

impl fmt::Display for Tour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in &self.vertices {
            write!(f, "{v} -> ")?;
        }
        match self.vertices.first() {
            Some(start) => write!(f, "{start}"),
            None => Ok(()),
        }
    }
}
