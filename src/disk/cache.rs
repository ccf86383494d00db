//! Hot-node cache layered over a view.
//!
//! Pins the BFS neighborhood of the entry node up to a node budget; those
//! are the nodes every search touches first. Entries are immutable
//! snapshots taken at fill time; misses fall through to the wrapped view
//! and never mutate the cache, so a filled cache is freely shareable
//! read-only.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::disk::feature::FeatureId;
use crate::disk::view::{OnDiskGraphIndex, OnDiskView};
use crate::error::Result;
use crate::io::ReaderFactory;

/// Immutable snapshot of one node's decoded record.
#[derive(Debug, Clone)]
pub struct CachedNode {
    pub neighbors: Box<[i32]>,
    /// Present when the artifact carries inline vectors.
    pub vector: Option<Box<[f32]>>,
}

/// Pinned-node cache. Pinned entries are never evicted.
#[derive(Debug, Default)]
pub struct GraphCache {
    nodes: HashMap<i32, CachedNode>,
}

impl GraphCache {
    /// Eagerly load the BFS neighborhood of the entry node, up to
    /// `capacity` nodes. Each pinned record's sanity ordinal is verified
    /// during the fill.
    pub fn pin_bfs<F: ReaderFactory>(
        index: &OnDiskGraphIndex<F>,
        capacity: usize,
    ) -> Result<Self> {
        let mut nodes = HashMap::new();
        if index.size() == 0 || capacity == 0 {
            return Ok(Self { nodes });
        }

        let mut view = index.view()?;
        let keep_vectors = index.feature_set().contains(FeatureId::InlineVectors);
        let entry = index.entry_node();
        let mut queue = VecDeque::from([entry]);
        let mut seen = HashSet::from([entry]);

        while let Some(node) = queue.pop_front() {
            if nodes.len() >= capacity {
                break;
            }
            view.validate_record(node)?;
            let neighbors: Box<[i32]> = view.neighbors(node)?.into();
            let vector = if keep_vectors {
                Some(view.vector(node)?.into_boxed_slice())
            } else {
                None
            };
            for &neighbor in &neighbors {
                if seen.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
            nodes.insert(node, CachedNode { neighbors, vector });
        }

        debug!(pinned = nodes.len(), capacity, "cache.pin");
        Ok(Self { nodes })
    }

    pub fn get(&self, node: i32) -> Option<&CachedNode> {
        self.nodes.get(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A view that answers from the cache when it can.
pub struct CachingView<'a, F: ReaderFactory> {
    cache: &'a GraphCache,
    view: OnDiskView<'a, F>,
}

impl<'a, F: ReaderFactory> CachingView<'a, F> {
    pub fn new(cache: &'a GraphCache, view: OnDiskView<'a, F>) -> Self {
        Self { cache, view }
    }

    pub fn size(&self) -> usize {
        self.view.size()
    }

    pub fn dimension(&self) -> usize {
        self.view.dimension()
    }

    pub fn max_degree(&self) -> usize {
        self.view.max_degree()
    }

    pub fn entry_node(&self) -> i32 {
        self.view.entry_node()
    }

    pub fn neighbors(&mut self, node: i32) -> Result<&[i32]> {
        if let Some(cached) = self.cache.get(node) {
            return Ok(&cached.neighbors);
        }
        self.view.neighbors(node)
    }

    pub fn vector(&mut self, node: i32) -> Result<Vec<f32>> {
        if let Some(vector) = self.cache.get(node).and_then(|c| c.vector.as_deref()) {
            return Ok(vector.to_vec());
        }
        self.view.vector(node)
    }

    pub fn close(&mut self) {
        self.view.close();
    }
}
