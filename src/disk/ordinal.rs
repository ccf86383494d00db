//! Ordinal renumbering: source node ids to dense on-disk ordinals.
//!
//! On disk every node is addressed by an ordinal in `[0, N)`. Sequential
//! renumbering compacts the (possibly holey) source id space while
//! preserving relative order; callers may instead supply an arbitrary
//! injective mapping, e.g. for spatial reordering. The writer proves the
//! mapping is a bijection onto `[0, N)` before emitting anything.

use std::collections::HashMap;

use crate::error::{IndexError, Result};
use crate::graph::SourceGraph;

/// Total injective mapping from source node ids onto dense ordinals.
#[derive(Debug, Clone, Default)]
pub struct OrdinalMap {
    forward: HashMap<i32, i32>,
}

impl OrdinalMap {
    /// Dense renumbering of `graph`'s live ids, monotonic in the source
    /// order: i < j implies map\[i\] < map\[j\].
    pub fn sequential(graph: &impl SourceGraph) -> Self {
        let mut forward = HashMap::with_capacity(graph.size());
        let mut next = 0;
        for id in 0..graph.id_upper_bound() {
            if graph.contains_node(id) {
                forward.insert(id, next);
                next += 1;
            }
        }
        Self { forward }
    }

    /// Wrap a caller-supplied mapping; validated at write time.
    pub fn from_map(forward: HashMap<i32, i32>) -> Self {
        Self { forward }
    }

    pub fn get(&self, old: i32) -> Option<i32> {
        self.forward.get(&old).copied()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Build the new→old inversion of length `n`, proving the mapping is
    /// a bijection onto `[0, n)`.
    pub(crate) fn invert(&self, n: usize) -> Result<Vec<i32>> {
        let mut inverted = vec![-1i32; n];
        for (&old, &new) in &self.forward {
            if new < 0 || new as usize >= n {
                return Err(IndexError::Precondition(format!(
                    "mapping produced out-of-range ordinal {new} for node {old} (N = {n})"
                )));
            }
            if inverted[new as usize] != -1 {
                return Err(IndexError::Precondition(format!(
                    "mapping is not injective: ordinal {new} assigned twice"
                )));
            }
            inverted[new as usize] = old;
        }
        Ok(inverted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ListGraph;

    #[test]
    fn sequential_is_monotonic_over_holes() {
        let mut g = ListGraph::new(2);
        for _ in 0..5 {
            g.add_node(&[]).unwrap();
        }
        g.mark_deleted(0);
        g.mark_deleted(3);
        g.cleanup();

        let map = OrdinalMap::sequential(&g);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(1), Some(0));
        assert_eq!(map.get(2), Some(1));
        assert_eq!(map.get(4), Some(2));
        assert_eq!(map.get(0), None);
    }

    #[test]
    fn invert_rejects_duplicates_and_range() {
        let dup = OrdinalMap::from_map(HashMap::from([(0, 1), (1, 1)]));
        assert!(dup.invert(2).is_err());

        let oob = OrdinalMap::from_map(HashMap::from([(0, 0), (1, 2)]));
        assert!(oob.invert(2).is_err());
    }

    #[test]
    fn invert_recovers_old_ids() {
        let map = OrdinalMap::from_map(HashMap::from([(10, 2), (20, 0), (30, 1)]));
        assert_eq!(map.invert(3).unwrap(), vec![20, 30, 10]);
    }
}
