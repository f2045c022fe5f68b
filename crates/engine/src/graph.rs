//! Trust graph representation
//!
//! Immutable snapshot of raw trust allocations, stored as an index arena so
//! the propagation engines can work on dense vertex indices.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use tracing::debug;
use trustgraph_common::errors::{Result, TrustError};

/// Bounds every vertex identifier must satisfy
///
/// `Ord` breaks rank ties deterministically, `Display` feeds error messages
/// and snapshot fingerprints.
pub trait VertexId:
    Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

impl<T> VertexId for T where
    T: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

/// Outgoing allocation from a giver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    /// Receiver vertex index
    pub receiver: usize,

    /// Raw weight as reported by the giver
    pub weight: f64,
}

/// In-memory trust graph
#[derive(Debug, Clone)]
pub struct TrustGraph<V> {
    /// Vertex ids in index order
    vertices: Vec<V>,

    /// Reverse lookup: id -> index
    index: HashMap<V, usize>,

    /// Adjacency list: giver index -> allocations it made
    outgoing: Vec<Vec<Allocation>>,
}

impl<V: VertexId> TrustGraph<V> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            index: HashMap::new(),
            outgoing: Vec::new(),
        }
    }

    /// Start building a graph one allocation at a time
    pub fn builder() -> TrustGraphBuilder<V> {
        TrustGraphBuilder { graph: Self::new() }
    }

    /// Build a graph from `giver -> (receiver -> weight)` allocations
    ///
    /// Givers are indexed first in iteration order, then receivers that never
    /// appear as givers in the order they are first seen. Such receivers get
    /// an empty allocation map.
    pub fn from_allocations<I, A>(allocations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (V, A)>,
        A: IntoIterator<Item = (V, f64)>,
    {
        let rows: Vec<(V, A)> = allocations.into_iter().collect();

        let mut builder = Self::builder();
        for (giver, _) in &rows {
            builder.vertex(giver.clone());
        }
        for (giver, targets) in rows {
            for (receiver, weight) in targets {
                builder.allocate(giver.clone(), receiver, weight)?;
            }
        }

        Ok(builder.build())
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Get all vertices in index order
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    /// Get the vertex at an index
    pub fn vertex(&self, index: usize) -> &V {
        &self.vertices[index]
    }

    /// Get the index of a vertex
    pub fn index_of(&self, id: &V) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Get allocations made by the vertex at `giver`
    pub fn allocations(&self, giver: usize) -> &[Allocation] {
        self.outgoing.get(giver).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get the raw weight `giver -> receiver`, if allocated
    pub fn weight(&self, giver: &V, receiver: &V) -> Option<f64> {
        let giver = self.index_of(giver)?;
        let receiver = self.index_of(receiver)?;
        self.allocations(giver)
            .iter()
            .find(|a| a.receiver == receiver)
            .map(|a| a.weight)
    }

    /// Get allocation count (outgoing edges, self-loops included)
    pub fn allocation_count(&self) -> usize {
        self.outgoing.iter().map(Vec::len).sum()
    }

    /// Replace every allocation of `giver`, keeping the rest of the graph
    pub fn with_allocations_of<A>(&self, giver: &V, targets: A) -> Result<Self>
    where
        A: IntoIterator<Item = (V, f64)>,
    {
        let mut builder = TrustGraphBuilder { graph: self.clone() };
        let index = builder.vertex(giver.clone());
        builder.graph.outgoing[index].clear();
        for (receiver, weight) in targets {
            builder.allocate(giver.clone(), receiver, weight)?;
        }
        Ok(builder.build())
    }

    /// SHA-256 digest of the snapshot
    ///
    /// Identical vertex order and allocations give identical fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.vertices.len() as u64).to_le_bytes());
        for (id, allocations) in self.vertices.iter().zip(&self.outgoing) {
            hasher.update(id.to_string().as_bytes());
            hasher.update([0u8]);
            hasher.update((allocations.len() as u64).to_le_bytes());
            for allocation in allocations {
                hasher.update((allocation.receiver as u64).to_le_bytes());
                hasher.update(allocation.weight.to_bits().to_le_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

impl TrustGraph<String> {
    /// Parse the `{ giver: { receiver: weight } }` JSON shape
    pub fn from_json(value: &Value) -> Result<Self> {
        let givers = value
            .as_object()
            .ok_or_else(|| TrustError::invalid_graph("expected an object of allocation maps"))?;

        let mut rows = Vec::with_capacity(givers.len());
        for (giver, targets) in givers {
            let targets = targets.as_object().ok_or_else(|| {
                TrustError::invalid_graph(format!("allocations of {} must be an object", giver))
            })?;

            let mut row = Vec::with_capacity(targets.len());
            for (receiver, weight) in targets {
                let weight = weight.as_f64().ok_or_else(|| {
                    TrustError::invalid_graph(format!(
                        "weight of allocation {} -> {} must be a number",
                        giver, receiver
                    ))
                })?;
                row.push((receiver.clone(), weight));
            }
            rows.push((giver.clone(), row));
        }

        let graph = Self::from_allocations(rows)?;
        debug!(
            vertices = graph.vertex_count(),
            allocations = graph.allocation_count(),
            "Trust graph parsed"
        );
        Ok(graph)
    }

    /// Parse a JSON document
    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_json(&value)
    }
}

impl<V: VertexId> Default for TrustGraph<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental graph construction
pub struct TrustGraphBuilder<V> {
    graph: TrustGraph<V>,
}

impl<V: VertexId> TrustGraphBuilder<V> {
    /// Register a vertex, returning its index
    pub fn vertex(&mut self, id: V) -> usize {
        if let Some(&index) = self.graph.index.get(&id) {
            return index;
        }

        let index = self.graph.vertices.len();
        self.graph.index.insert(id.clone(), index);
        self.graph.vertices.push(id);
        self.graph.outgoing.push(Vec::new());
        index
    }

    /// Record `giver -> receiver` with `weight`, replacing an earlier weight
    /// for the same pair
    pub fn allocate(&mut self, giver: V, receiver: V, weight: f64) -> Result<&mut Self> {
        if !weight.is_finite() {
            return Err(TrustError::NonFiniteWeight {
                giver: giver.to_string(),
                receiver: receiver.to_string(),
            });
        }
        if weight < 0.0 {
            return Err(TrustError::NegativeWeight {
                giver: giver.to_string(),
                receiver: receiver.to_string(),
                weight,
            });
        }

        let giver = self.vertex(giver);
        let receiver = self.vertex(receiver);
        let row = &mut self.graph.outgoing[giver];
        match row.iter_mut().find(|a| a.receiver == receiver) {
            Some(existing) => existing.weight = weight,
            None => row.push(Allocation { receiver, weight }),
        }

        Ok(self)
    }

    pub fn build(self) -> TrustGraph<V> {
        self.graph
    }
}
