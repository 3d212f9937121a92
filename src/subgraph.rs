//! Induced subgraph extraction.
//!
//! Two flavors produce identical output:
//! - [`Graph::induced_subgraph`]: a sequential two-pass copy, allocating fresh arrays.
//! - [`SubgraphBuffers::extract_parallel`]: a lock-free multi-pass copy over
//!   disjoint vertex ranges that reuses buffers sized once to the parent graph.
//!
//! In both, new vertex `i` is original vertex `reverse_map[i]`. Masked vertices keep their
//! relative order, so every neighbor list in the result stays sorted.

use crate::graph::Graph;
use rayon::prelude::*;
use std::ops::Range;

/// Marker stored in the forward map for vertices outside the mask.
pub const NOT_IN_SUBGRAPH: usize = usize::MAX;

impl Graph {
    /// Returns the subgraph induced by the vertices with `mask[u] == true`,
    /// together with the reverse map (new id to original id).
    ///
    /// # Panics
    /// Panics if `mask.len() != self.len()`.
    pub fn induced_subgraph(&self, mask: &[bool]) -> (Graph, Vec<usize>) {
        assert_eq!(mask.len(), self.len(), "mask length must match vertex count");

        let mut forward = vec![NOT_IN_SUBGRAPH; self.len()];
        let mut reverse = Vec::new();
        let mut arcs = 0usize;
        for u in (0..self.len()).filter(|&u| mask[u]) {
            forward[u] = reverse.len();
            reverse.push(u);
            arcs += self.neighbors(u).iter().filter(|&&v| mask[v]).count();
        }

        let mut offsets = Vec::with_capacity(reverse.len() + 1);
        let mut neighbors = Vec::with_capacity(arcs);
        let mut weights = Vec::with_capacity(reverse.len());
        offsets.push(0);
        for &u in &reverse {
            weights.push(self.weight(u));
            neighbors.extend(
                self.neighbors(u)
                    .iter()
                    .filter(|&&v| mask[v])
                    .map(|&v| forward[v]),
            );
            offsets.push(neighbors.len());
        }

        (
            Graph {
                offsets,
                neighbors,
                weights,
            },
            reverse,
        )
    }
}

/// Reusable buffers for repeated parallel subgraph extraction from one parent graph.
///
/// Capacity is reserved for the whole parent up front so later rounds never grow the
/// arrays. The extracted graph and both maps stay valid until the next extraction.
#[derive(Debug, Default)]
pub struct SubgraphBuffers {
    graph: Graph,
    forward: Vec<usize>,
    reverse: Vec<usize>,
    /// Per worker: (masked vertices, surviving arcs) in its vertex range.
    counts: Vec<(usize, usize)>,
    /// Per worker: exclusive prefix sums of `counts`.
    starts: Vec<(usize, usize)>,
}

impl SubgraphBuffers {
    /// Allocates buffers large enough for any induced subgraph of `parent`.
    pub fn new(parent: &Graph) -> Self {
        let n = parent.len();
        Self {
            graph: Graph {
                offsets: Vec::with_capacity(n + 1),
                neighbors: Vec::with_capacity(parent.arc_count()),
                weights: Vec::with_capacity(n),
            },
            forward: Vec::with_capacity(n),
            reverse: Vec::with_capacity(n),
            counts: Vec::new(),
            starts: Vec::new(),
        }
    }

    /// Extracts the subgraph induced by `mask` using `workers` parallel tasks on the
    /// current rayon pool.
    ///
    /// Pass 1 counts vertices and arcs per worker range. Exclusive prefix sums then fix
    /// every worker's write position, so pass 2 (forward map, reverse map, weights) and
    /// pass 3 (offsets, arcs) write into disjoint slices without synchronization.
    ///
    /// # Panics
    /// Panics if `mask.len() != parent.len()`.
    pub fn extract_parallel(&mut self, parent: &Graph, mask: &[bool], workers: usize) -> &Graph {
        let n = parent.len();
        assert_eq!(mask.len(), n, "mask length must match vertex count");

        let workers = workers.clamp(1, n.max(1));
        let chunk = n.div_ceil(workers).max(1);

        let Self {
            graph,
            forward,
            reverse,
            counts,
            starts,
        } = self;

        // Pass 1: count.
        (0..workers)
            .into_par_iter()
            .map(|t| {
                worker_range(t, chunk, n)
                    .filter(|&u| mask[u])
                    .fold((0, 0), |(vertices, arcs), u| {
                        let kept = parent.neighbors(u).iter().filter(|&&v| mask[v]).count();
                        (vertices + 1, arcs + kept)
                    })
            })
            .collect_into_vec(counts);

        starts.clear();
        let (mut sub_n, mut sub_m) = (0usize, 0usize);
        for &(vertices, arcs) in counts.iter() {
            starts.push((sub_n, sub_m));
            sub_n += vertices;
            sub_m += arcs;
        }

        forward.clear();
        forward.resize(n, NOT_IN_SUBGRAPH);
        reverse.clear();
        reverse.resize(sub_n, 0);
        graph.weights.clear();
        graph.weights.resize(sub_n, 0);
        graph.offsets.clear();
        graph.offsets.resize(sub_n + 1, 0);
        graph.neighbors.clear();
        graph.neighbors.resize(sub_m, 0);

        // Pass 2: forward map, reverse map, weights.
        let reverse_parts = split_by_counts(reverse, counts.iter().map(|c| c.0));
        let weight_parts = split_by_counts(&mut graph.weights, counts.iter().map(|c| c.0));
        forward
            .par_chunks_mut(chunk)
            .zip(reverse_parts)
            .zip(weight_parts)
            .zip(starts.par_iter())
            .enumerate()
            .for_each(|(t, (((fwd, rev), wts), &(first, _)))| {
                let base = t * chunk;
                let mut k = 0;
                for (i, slot) in fwd.iter_mut().enumerate() {
                    let u = base + i;
                    if mask[u] {
                        *slot = first + k;
                        rev[k] = u;
                        wts[k] = parent.weight(u);
                        k += 1;
                    }
                }
            });

        // Pass 3: offsets and arcs.
        let forward: &[usize] = forward;
        let offset_parts = split_by_counts(&mut graph.offsets[..sub_n], counts.iter().map(|c| c.0));
        let arc_parts = split_by_counts(&mut graph.neighbors, counts.iter().map(|c| c.1));
        offset_parts
            .into_par_iter()
            .zip(arc_parts)
            .zip(starts.par_iter())
            .enumerate()
            .for_each(|(t, ((offs, arcs), &(_, first_arc)))| {
                let mut k = 0;
                let mut a = 0;
                for u in worker_range(t, chunk, n).filter(|&u| mask[u]) {
                    offs[k] = first_arc + a;
                    k += 1;
                    for &v in parent.neighbors(u) {
                        if mask[v] {
                            arcs[a] = forward[v];
                            a += 1;
                        }
                    }
                }
            });
        graph.offsets[sub_n] = sub_m;

        &self.graph
    }

    /// The most recently extracted graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// New id to original id for the most recent extraction.
    pub fn reverse_map(&self) -> &[usize] {
        &self.reverse
    }

    /// Original id to new id, [`NOT_IN_SUBGRAPH`] for unmasked vertices.
    pub fn forward_map(&self) -> &[usize] {
        &self.forward
    }
}

#[inline]
fn worker_range(t: usize, chunk: usize, n: usize) -> Range<usize> {
    (t * chunk).min(n)..((t + 1) * chunk).min(n)
}

/// Splits `slice` into consecutive disjoint pieces of the given lengths.
fn split_by_counts<T>(mut slice: &mut [T], counts: impl Iterator<Item = usize>) -> Vec<&mut [T]> {
    let mut parts = Vec::new();
    for len in counts {
        let (head, tail) = std::mem::take(&mut slice).split_at_mut(len);
        parts.push(head);
        slice = tail;
    }
    parts
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    fn random_mask(rng: &mut XorShiftRng, n: usize, p: f64) -> Vec<bool> {
        (0..n).map(|_| rng.random_bool(p)).collect()
    }

    #[test]
    fn sequential_extraction_of_path() {
        // 0 - 1 - 2 - 3
        let g = Graph::from_edges(vec![1, 2, 3, 4], &[(0, 1), (1, 2), (2, 3)]).unwrap();
        let (sub, reverse) = g.induced_subgraph(&[false, true, true, true]);
        assert_eq!(reverse, vec![1, 2, 3]);
        assert_eq!(sub.weights(), &[2, 3, 4]);
        assert_eq!(sub.neighbors(0), &[1]);
        assert_eq!(sub.neighbors(1), &[0, 2]);
        assert_eq!(sub.neighbors(2), &[1]);
        assert!(sub.is_valid());
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        for trial in 0..12 {
            let n = 1 + trial * 13;
            let g = Graph::random(&mut rng, n, 0.2, 20);
            let mut buffers = SubgraphBuffers::new(&g);
            for workers in [1, 2, 3, 8, n + 5] {
                let mask = random_mask(&mut rng, n, 0.6);
                let (expected, expected_reverse) = g.induced_subgraph(&mask);
                let got = buffers.extract_parallel(&g, &mask, workers).clone();
                assert_eq!(got, expected, "n={n} workers={workers}");
                assert_eq!(buffers.reverse_map(), expected_reverse.as_slice());
                for (i, &u) in expected_reverse.iter().enumerate() {
                    assert_eq!(buffers.forward_map()[u], i);
                }
                assert!(got.is_valid());
            }
        }
    }

    #[test]
    fn buffers_are_reusable_across_masks() {
        let mut rng = XorShiftRng::seed_from_u64(9);
        let g = Graph::random(&mut rng, 60, 0.1, 5);
        let mut buffers = SubgraphBuffers::new(&g);

        let full = vec![true; g.len()];
        assert_eq!(buffers.extract_parallel(&g, &full, 4), &g);

        let none = vec![false; g.len()];
        let empty = buffers.extract_parallel(&g, &none, 4);
        assert!(empty.is_empty());
        assert_eq!(empty.offsets(), &[0]);
        assert!(buffers.forward_map().iter().all(|&f| f == NOT_IN_SUBGRAPH));

        let half: Vec<bool> = (0..g.len()).map(|u| u % 2 == 0).collect();
        let (expected, _) = g.induced_subgraph(&half);
        assert_eq!(buffers.extract_parallel(&g, &half, 3), &expected);
    }

    #[test]
    fn empty_parent_graph() {
        let g = Graph::empty();
        let mut buffers = SubgraphBuffers::new(&g);
        let sub = buffers.extract_parallel(&g, &[], 4);
        assert!(sub.is_empty());
        assert!(sub.is_valid());
    }
}
