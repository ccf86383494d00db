//! In-memory source graph and vector storage contracts.
//!
//! The on-disk writer consumes these seams; graph construction itself
//! (Vamana passes, pruning) happens upstream and is not part of this
//! crate. [`ListGraph`] is the concrete carrier: an adjacency-list graph
//! whose node ids survive deletion as holes until the caller runs
//! [`ListGraph::cleanup`] and renumbers at write time.

use std::collections::HashSet;

use smallvec::SmallVec;

use crate::error::{IndexError, Result};

/// A directed proximity graph the writer can serialize.
pub trait SourceGraph {
    /// Number of live nodes.
    fn size(&self) -> usize;

    /// Fixed upper bound on neighbors per node (M).
    fn max_degree(&self) -> usize;

    /// Search entry point, in the source id space.
    fn entry_node(&self) -> i32;

    /// Exclusive upper bound on node ids; ids in `[0, bound)` may be holes.
    fn id_upper_bound(&self) -> i32;

    fn contains_node(&self, node: i32) -> bool;

    /// Out-neighbors of `node`; empty for holes.
    fn neighbors(&self, node: i32) -> &[i32];

    /// Nodes marked deleted but not yet compacted away.
    fn tombstone_count(&self) -> usize {
        0
    }
}

/// Random access to the vectors behind a graph's node ids.
pub trait VectorSource {
    fn dimension(&self) -> usize;

    fn vector(&self, node: i32) -> &[f32];
}

/// Adjacency-list graph with tombstoned deletion.
///
/// Typical degree is M≈16-32, so adjacency lists stay inline in a
/// `SmallVec` until they outgrow it.
#[derive(Debug, Clone)]
pub struct ListGraph {
    adjacency: Vec<Option<SmallVec<[i32; 32]>>>,
    deleted: HashSet<i32>,
    live: usize,
    max_degree: usize,
    entry_node: i32,
}

impl ListGraph {
    pub fn new(max_degree: usize) -> Self {
        Self {
            adjacency: Vec::new(),
            deleted: HashSet::new(),
            live: 0,
            max_degree,
            entry_node: 0,
        }
    }

    /// Append a node and return its id.
    pub fn add_node(&mut self, neighbors: &[i32]) -> Result<i32> {
        if neighbors.len() > self.max_degree {
            return Err(IndexError::Precondition(format!(
                "node degree {} exceeds max degree {}",
                neighbors.len(),
                self.max_degree
            )));
        }
        let id = self.adjacency.len() as i32;
        self.adjacency.push(Some(SmallVec::from_slice(neighbors)));
        self.live += 1;
        Ok(id)
    }

    /// Replace the neighbor list of an existing node.
    pub fn set_neighbors(&mut self, node: i32, neighbors: &[i32]) -> Result<()> {
        if neighbors.len() > self.max_degree {
            return Err(IndexError::Precondition(format!(
                "node degree {} exceeds max degree {}",
                neighbors.len(),
                self.max_degree
            )));
        }
        match self.adjacency.get_mut(node as usize) {
            Some(Some(list)) => {
                *list = SmallVec::from_slice(neighbors);
                Ok(())
            }
            _ => Err(IndexError::Precondition(format!(
                "node {node} does not exist"
            ))),
        }
    }

    pub fn set_entry_node(&mut self, node: i32) {
        self.entry_node = node;
    }

    /// Tombstone a node. It still occupies its id until [`Self::cleanup`].
    pub fn mark_deleted(&mut self, node: i32) {
        if self.contains_node(node) {
            self.deleted.insert(node);
        }
    }

    /// Compact tombstones: drop deleted nodes and every edge pointing at
    /// them. Surviving nodes keep their original ids (holes remain holes);
    /// renumbering is the writer's job.
    pub fn cleanup(&mut self) {
        if self.deleted.is_empty() {
            return;
        }
        for &node in &self.deleted {
            if self.adjacency[node as usize].take().is_some() {
                self.live -= 1;
            }
        }
        let deleted = std::mem::take(&mut self.deleted);
        for slot in self.adjacency.iter_mut().flatten() {
            slot.retain(|n| !deleted.contains(n));
        }
        if deleted.contains(&self.entry_node) {
            self.entry_node = self
                .adjacency
                .iter()
                .position(Option::is_some)
                .map(|i| i as i32)
                .unwrap_or(0);
        }
    }
}

impl SourceGraph for ListGraph {
    fn size(&self) -> usize {
        self.live
    }

    fn max_degree(&self) -> usize {
        self.max_degree
    }

    fn entry_node(&self) -> i32 {
        self.entry_node
    }

    fn id_upper_bound(&self) -> i32 {
        self.adjacency.len() as i32
    }

    fn contains_node(&self, node: i32) -> bool {
        node >= 0
            && self
                .adjacency
                .get(node as usize)
                .is_some_and(Option::is_some)
    }

    fn neighbors(&self, node: i32) -> &[i32] {
        self.adjacency
            .get(node as usize)
            .and_then(Option::as_deref)
            .unwrap_or(&[])
    }

    fn tombstone_count(&self) -> usize {
        self.deleted.len()
    }
}

/// Flat row-major f32 vector storage indexed by node id.
#[derive(Debug, Clone, Default)]
pub struct SliceVectors {
    data: Vec<f32>,
    dimension: usize,
}

impl SliceVectors {
    pub fn new(dimension: usize) -> Self {
        Self {
            data: Vec::new(),
            dimension,
        }
    }

    pub fn push(&mut self, vector: &[f32]) {
        assert_eq!(vector.len(), self.dimension);
        self.data.extend_from_slice(vector);
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl VectorSource for SliceVectors {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vector(&self, node: i32) -> &[f32] {
        let start = node as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> ListGraph {
        let mut g = ListGraph::new(2);
        g.add_node(&[1, 2]).unwrap();
        g.add_node(&[0, 2]).unwrap();
        g.add_node(&[0, 1]).unwrap();
        g
    }

    #[test]
    fn cleanup_keeps_original_ids() {
        let mut g = triangle();
        g.mark_deleted(0);
        assert_eq!(g.tombstone_count(), 1);
        g.cleanup();

        assert_eq!(g.size(), 2);
        assert_eq!(g.id_upper_bound(), 3);
        assert!(!g.contains_node(0));
        assert_eq!(g.neighbors(1), &[2]);
        assert_eq!(g.neighbors(2), &[1]);
        assert_eq!(g.tombstone_count(), 0);
    }

    #[test]
    fn cleanup_moves_entry_off_deleted_node() {
        let mut g = triangle();
        g.set_entry_node(0);
        g.mark_deleted(0);
        g.cleanup();
        assert!(g.contains_node(g.entry_node()));
    }

    #[test]
    fn degree_guard() {
        let mut g = ListGraph::new(1);
        assert!(g.add_node(&[1, 2]).is_err());
    }
}
