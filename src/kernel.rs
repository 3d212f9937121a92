//! Kernelization: reduction rules that fix vertices in or out of every
//! optimal solution, and lifting solutions of the reduced graph back.
//!
//! [`kernelize`] drives a list of [`ReductionRule`]s over per-rule work queues.
//! Whenever a rule succeeds the driver restarts from the first rule, and the
//! neighborhood of every changed vertex is queued again for all rules.
//! [`ReducedGraph`] turns the resulting [`Reduction`] into the graph the
//! search actually runs on.

use crate::graph::{Graph, Weight};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Outcome of applying a rule to one vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The vertex belongs to some optimal solution: force it in.
    Include,
    /// Some optimal solution avoids the vertex: drop it.
    Exclude,
    /// The rule does not apply.
    Keep,
}

/// A reduction rule evaluated on one active vertex at a time.
pub trait ReductionRule: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decides vertex `u` given the currently active vertices.
    fn apply(&mut self, graph: &Graph, active: &[bool], u: usize) -> Decision;
}

/// Includes `u` when its weight is at least the total weight of its active neighbors.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeighborhoodRule;

impl ReductionRule for NeighborhoodRule {
    fn name(&self) -> &'static str {
        "neighborhood"
    }

    fn apply(&mut self, graph: &Graph, active: &[bool], u: usize) -> Decision {
        let neighborhood: Weight = graph
            .neighbors(u)
            .iter()
            .filter(|&&v| active[v])
            .map(|&v| graph.weight(v))
            .sum();
        if neighborhood <= graph.weight(u) {
            Decision::Include
        } else {
            Decision::Keep
        }
    }
}

/// Excludes `u` when some active neighbor `v` with `w(v) >= w(u)` has its
/// closed neighborhood inside `u`'s: any solution using `u` can use `v` instead.
#[derive(Clone, Debug, Default)]
pub struct DominationRule {
    marks: Vec<bool>,
}

impl ReductionRule for DominationRule {
    fn name(&self) -> &'static str {
        "domination"
    }

    fn apply(&mut self, graph: &Graph, active: &[bool], u: usize) -> Decision {
        if self.marks.len() < graph.len() {
            self.marks.resize(graph.len(), false);
        }
        for &v in graph.neighbors(u) {
            self.marks[v] = active[v];
        }

        let dominated = graph.neighbors(u).iter().any(|&v| {
            active[v]
                && graph.weight(v) >= graph.weight(u)
                && graph
                    .neighbors(v)
                    .iter()
                    .all(|&x| x == u || !active[x] || self.marks[x])
        });

        for &v in graph.neighbors(u) {
            self.marks[v] = false;
        }
        if dominated { Decision::Exclude } else { Decision::Keep }
    }
}

/// Result of [`kernelize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reduction {
    /// Vertices still undecided.
    pub active: Vec<bool>,
    /// Vertices forced into the solution.
    pub forced: Vec<bool>,
    /// Total weight of the forced vertices.
    pub offset: Weight,
}

impl Reduction {
    /// A reduction that decides nothing.
    pub fn identity(n: usize) -> Self {
        Self {
            active: vec![true; n],
            forced: vec![false; n],
            offset: 0,
        }
    }

    /// Number of vertices still undecided.
    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }
}

/// Deadline checks happen once per this many queue pops.
const DEADLINE_POLL: u64 = 1024;

/// Applies `rules` until none of them fires or `time_limit` runs out.
pub fn kernelize(graph: &Graph, rules: &mut [Box<dyn ReductionRule>], time_limit: Duration) -> Reduction {
    let n = graph.len();
    let start = Instant::now();
    let mut reduction = Reduction::identity(n);
    let mut queues: Vec<Vec<usize>> = rules.iter().map(|_| (0..n).rev().collect()).collect();
    let mut queued: Vec<Vec<bool>> = rules.iter().map(|_| vec![true; n]).collect();
    let mut applied = vec![0usize; rules.len()];

    let mut pops = 0u64;
    let mut rule = 0;
    while rule < rules.len() {
        if pops.is_multiple_of(DEADLINE_POLL) && start.elapsed() >= time_limit {
            debug!("kernelization stopped at the deadline");
            break;
        }
        let Some(u) = queues[rule].pop() else {
            rule += 1;
            continue;
        };
        pops += 1;
        queued[rule][u] = false;
        if !reduction.active[u] {
            continue;
        }

        match rules[rule].apply(graph, &reduction.active, u) {
            Decision::Keep => continue,
            Decision::Include => {
                reduction.active[u] = false;
                reduction.forced[u] = true;
                reduction.offset += graph.weight(u);
                for &v in graph.neighbors(u) {
                    reduction.active[v] = false;
                }
                for &v in graph.neighbors(u) {
                    requeue_neighbors(graph, &reduction.active, v, &mut queues, &mut queued);
                }
            }
            Decision::Exclude => {
                reduction.active[u] = false;
                requeue_neighbors(graph, &reduction.active, u, &mut queues, &mut queued);
            }
        }
        applied[rule] += 1;
        rule = 0;
    }

    for (r, count) in rules.iter().zip(&applied) {
        debug!(rule = r.name(), applied = count, "reduction rule summary");
    }
    info!(
        vertices = n,
        remaining = reduction.active_count(),
        offset = reduction.offset,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "kernelization finished"
    );
    reduction
}

fn requeue_neighbors(
    graph: &Graph,
    active: &[bool],
    u: usize,
    queues: &mut [Vec<usize>],
    queued: &mut [Vec<bool>],
) {
    for &v in graph.neighbors(u) {
        if !active[v] {
            continue;
        }
        for (queue, flags) in queues.iter_mut().zip(queued.iter_mut()) {
            if !flags[v] {
                flags[v] = true;
                queue.push(v);
            }
        }
    }
}

/// The default rule set used by the binary.
pub fn default_rules() -> Vec<Box<dyn ReductionRule>> {
    vec![
        Box::new(NeighborhoodRule) as Box<dyn ReductionRule>,
        Box::new(DominationRule::default()),
    ]
}

// ============================================================================
// Reduced graph
// ============================================================================

/// Errors raised when a reduction does not fit its graph.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KernelError {
    /// Array lengths differ from the vertex count.
    #[error("reduction covers {got} vertices but the graph has {expected}")]
    LengthMismatch {
        /// Vertex count of the graph.
        expected: usize,
        /// Length of the reduction arrays.
        got: usize,
    },
    /// A vertex is both forced and active.
    #[error("vertex {vertex} is both forced and active")]
    ForcedActive {
        /// The vertex.
        vertex: usize,
    },
    /// A forced vertex has a forced or active neighbor.
    #[error("forced vertex {u} conflicts with neighbor {v}")]
    ForcedConflict {
        /// The forced vertex.
        u: usize,
        /// The conflicting neighbor.
        v: usize,
    },
    /// The offset disagrees with the forced vertices.
    #[error("offset {offset} does not match forced weight {expected}")]
    OffsetMismatch {
        /// Offset stored in the reduction.
        offset: Weight,
        /// Weight of the forced vertices.
        expected: Weight,
    },
}

/// The graph induced by the active vertices, plus what is needed to lift
/// its solutions back to the original graph.
#[derive(Clone, Debug)]
pub struct ReducedGraph {
    graph: Graph,
    reverse_map: Vec<usize>,
    forced: Vec<bool>,
    offset: Weight,
}

impl ReducedGraph {
    /// Builds the reduced graph after checking that `reduction` is consistent
    /// with `original`.
    ///
    /// # Errors
    /// Returns a [`KernelError`] if lengths differ, a forced vertex is still
    /// active or touches an active or forced vertex, or the offset is wrong.
    pub fn new(original: &Graph, reduction: Reduction) -> Result<Self, KernelError> {
        let n = original.len();
        for len in [reduction.active.len(), reduction.forced.len()] {
            if len != n {
                return Err(KernelError::LengthMismatch { expected: n, got: len });
            }
        }
        let mut expected = 0;
        for u in (0..n).filter(|&u| reduction.forced[u]) {
            if reduction.active[u] {
                return Err(KernelError::ForcedActive { vertex: u });
            }
            if let Some(&v) = original
                .neighbors(u)
                .iter()
                .find(|&&v| reduction.active[v] || reduction.forced[v])
            {
                return Err(KernelError::ForcedConflict { u, v });
            }
            expected += original.weight(u);
        }
        if expected != reduction.offset {
            return Err(KernelError::OffsetMismatch {
                offset: reduction.offset,
                expected,
            });
        }

        let (graph, reverse_map) = original.induced_subgraph(&reduction.active);
        Ok(Self {
            graph,
            reverse_map,
            forced: reduction.forced,
            offset: reduction.offset,
        })
    }

    /// The reduced graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Reduced id to original id.
    pub fn reverse_map(&self) -> &[usize] {
        &self.reverse_map
    }

    /// Weight of the forced vertices.
    pub fn offset(&self) -> Weight {
        self.offset
    }

    /// Maps a solution of the reduced graph to the original graph, adding the
    /// forced vertices.
    pub fn lift(&self, solution: &[bool]) -> Vec<bool> {
        debug_assert_eq!(solution.len(), self.graph.len());
        let mut lifted = self.forced.clone();
        for (i, &u) in self.reverse_map.iter().enumerate() {
            if solution[i] {
                lifted[u] = true;
            }
        }
        lifted
    }

    /// Weight in the original graph of a reduced solution of weight `weight`.
    pub fn lift_weight(&self, weight: Weight) -> Weight {
        weight + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::validate_solution;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn brute_force(graph: &Graph) -> Weight {
        let n = graph.len();
        assert!(n <= 20);
        let mut best = 0;
        'outer: for bits in 0u32..(1 << n) {
            let mut weight = 0;
            for u in 0..n {
                if bits >> u & 1 == 1 {
                    if graph.neighbors(u).iter().any(|&v| bits >> v & 1 == 1) {
                        continue 'outer;
                    }
                    weight += graph.weight(u);
                }
            }
            best = best.max(weight);
        }
        best
    }

    #[test]
    fn neighborhood_rule_solves_star_leaves() {
        // Each leaf outweighs the light center, its only neighbor.
        let g = Graph::from_edges(vec![2, 5, 5, 5], &[(0, 1), (0, 2), (0, 3)]).unwrap();
        let mut rules = vec![Box::new(NeighborhoodRule) as Box<dyn ReductionRule>];
        let reduction = kernelize(&g, &mut rules, Duration::from_secs(5));
        assert_eq!(reduction.forced, vec![false, true, true, true]);
        assert_eq!(reduction.offset, 15);
        assert_eq!(reduction.active_count(), 0);
    }

    #[test]
    fn domination_rule_excludes_dominated_vertex() {
        // Triangle 0-1-2 plus pendant 3 on 0: N[1] = {0, 1, 2} is inside N[0].
        let g = Graph::from_edges(vec![1, 1, 1, 1], &[(0, 1), (0, 2), (1, 2), (0, 3)]).unwrap();
        let mut rule = DominationRule::default();
        let active = vec![true; 4];
        assert_eq!(rule.apply(&g, &active, 0), Decision::Exclude);
        assert_eq!(rule.apply(&g, &active, 3), Decision::Keep);
    }

    #[test]
    fn reduced_solutions_lift_to_optimal_weight() {
        let mut rng = XorShiftRng::seed_from_u64(1234);
        for _ in 0..20 {
            let g = Graph::random(&mut rng, 14, 0.2, 12);
            let reduction = kernelize(&g, &mut default_rules(), Duration::from_secs(5));
            let reduced = ReducedGraph::new(&g, reduction).expect("consistent reduction");
            let optimum = brute_force(&g);
            assert_eq!(reduced.lift_weight(brute_force(reduced.graph())), optimum);

            // Lifting the empty solution keeps only forced vertices.
            let lifted = reduced.lift(&vec![false; reduced.graph().len()]);
            assert_eq!(validate_solution(&g, &lifted), Ok(reduced.offset()));
        }
    }

    #[test]
    fn zero_time_limit_reduces_nothing() {
        let g = Graph::from_edges(vec![2, 5], &[(0, 1)]).unwrap();
        let reduction = kernelize(&g, &mut default_rules(), Duration::ZERO);
        assert_eq!(reduction, Reduction::identity(2));
    }

    #[test]
    fn inconsistent_reductions_are_rejected() {
        let g = Graph::from_edges(vec![1, 1], &[(0, 1)]).unwrap();
        let reduction = Reduction {
            active: vec![false, true],
            forced: vec![true, false],
            offset: 1,
        };
        assert_eq!(
            ReducedGraph::new(&g, reduction).unwrap_err(),
            KernelError::ForcedConflict { u: 0, v: 1 }
        );
        let reduction = Reduction {
            active: vec![false, false],
            forced: vec![true, false],
            offset: 3,
        };
        assert!(matches!(
            ReducedGraph::new(&g, reduction).unwrap_err(),
            KernelError::OffsetMismatch { .. }
        ));
        assert!(matches!(
            ReducedGraph::new(&g, Reduction::identity(3)).unwrap_err(),
            KernelError::LengthMismatch { .. }
        ));
    }
}
