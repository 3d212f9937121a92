//! Move operators on top of [`LocalSearch`]: alternating augmenting paths,
//! the explore loop, and random perturbation.

use crate::graph::{Graph, Weight};
use crate::local_search::LocalSearch;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::trace;

// ============================================================================
// Alternating augmenting paths
// ============================================================================

/// One step of an alternating path: include `add` for a net change of `gain`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PathStep {
    add: usize,
    gain: Weight,
}

/// Counters reported by [`LocalSearch::explore`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExploreStats {
    /// Iterations performed.
    pub iterations: u64,
    /// Iterations that raised the cost above the running best.
    pub improvements: u64,
    /// Iterations rolled back because they lowered the cost.
    pub rollbacks: u64,
    /// Iterations resolved by an alternating path.
    pub aap_moves: u64,
    /// Cost when the call returned.
    pub final_cost: Weight,
}

impl LocalSearch {
    /// Tries an alternating augmenting path anchored at `u`.
    ///
    /// The path starts either at a set vertex `u` (which will be dropped) or at
    /// an excluded vertex whose only set neighbor `x` is dropped in its place.
    /// From the last dropped vertex `s` it extends to an excluded, unlocked,
    /// unvisited neighbor `y` of `s` with one or two set neighbors that is not
    /// adjacent to anything already included on the path. Including `y` drops
    /// its other set neighbor, which becomes the next `s`. The walk stops when
    /// a step drops nothing new.
    ///
    /// The best prefix by cumulative gain (ties to the longer prefix) is applied
    /// through [`LocalSearch::add_vertex`] if its gain is non-negative.
    ///
    /// Returns whether the solution changed.
    pub fn aap(&mut self, graph: &Graph, u: usize) -> bool {
        if self.tabu[u] > 0 {
            return false;
        }
        self.path.clear();
        self.next_stamp();
        let stamp = self.stamp;

        let (mut current, base) = if self.contains(u) {
            self.visited[u] = stamp;
            (u, -graph.weight(u))
        } else if self.tightness(u) == 1 {
            let Some(x) = self.blocker(graph, u, None) else {
                return false;
            };
            if self.tabu[x] > 0 {
                return false;
            }
            self.visited[u] = stamp;
            self.visited[x] = stamp;
            self.included[u] = stamp;
            self.path.push(PathStep {
                add: u,
                gain: graph.weight(u) - graph.weight(x),
            });
            (x, 0)
        } else {
            return false;
        };

        while self.path.len() < self.config.max_path_len {
            let mut pick: Option<(usize, Option<usize>, Weight, f64)> = None;
            for &y in graph.neighbors(current) {
                if self.contains(y)
                    || self.tabu[y] > 0
                    || self.visited[y] == stamp
                    || !(1..=2).contains(&self.tightness(y))
                    || self.touches_included(graph, y)
                {
                    continue;
                }
                let next = if self.tightness(y) == 2 {
                    match self.blocker(graph, y, Some(current)) {
                        Some(z) if self.visited[z] == stamp => None,
                        Some(z) if self.tabu[z] > 0 => continue,
                        other => other,
                    }
                } else {
                    None
                };
                let gain = graph.weight(y) - next.map_or(0, |z| graph.weight(z));
                let score = self.jittered(gain);
                if pick.is_none_or(|(_, _, _, best)| score > best) {
                    pick = Some((y, next, gain, score));
                }
            }

            let Some((y, next, gain, _)) = pick else {
                break;
            };
            self.visited[y] = stamp;
            self.included[y] = stamp;
            self.path.push(PathStep { add: y, gain });
            match next {
                Some(z) => {
                    self.visited[z] = stamp;
                    current = z;
                }
                None => break,
            }
        }

        let mut total = base;
        let mut best_len = 0;
        let mut best_gain = Weight::MIN;
        for (i, step) in self.path.iter().enumerate() {
            total += step.gain;
            if total >= best_gain {
                best_gain = total;
                best_len = i + 1;
            }
        }
        if best_len == 0 || best_gain < 0 {
            return false;
        }

        let expected = self.cost() + best_gain;
        for i in 0..best_len {
            let y = self.path[i].add;
            self.add_vertex(graph, y);
        }
        debug_assert_eq!(self.cost(), expected, "alternating path gain mismatch");
        true
    }

    /// The set neighbor of `y` other than `skip`.
    fn blocker(&self, graph: &Graph, y: usize, skip: Option<usize>) -> Option<usize> {
        graph
            .neighbors(y)
            .iter()
            .copied()
            .find(|&v| Some(v) != skip && self.contains(v))
    }

    fn touches_included(&self, graph: &Graph, y: usize) -> bool {
        graph.neighbors(y).iter().any(|&v| self.included[v] == self.stamp)
    }

    fn next_stamp(&mut self) {
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.visited.fill(0);
            self.included.fill(0);
            self.stamp = 1;
        }
    }

    fn jittered(&mut self, gain: Weight) -> f64 {
        let jitter = self.config.aap_jitter;
        if jitter > 0.0 {
            gain as f64 * (1.0 + self.rng.random_range(-jitter..=jitter))
        } else {
            gain as f64
        }
    }

    // ========================================================================
    // Explore
    // ========================================================================

    /// Runs the main local-search loop for at most `budget` wall time and
    /// `max_iterations` iterations.
    ///
    /// Each iteration picks a random unlocked vertex `u` and tries
    /// [`LocalSearch::aap`]. If no path applies, `u` is flipped and locked, a few
    /// random queued vertices are flipped as well, the queue is drained, and
    /// `u` is released (and re-added if it has become free). Iterations that
    /// improve on the best cost seen in this call are committed, strictly worse
    /// ones are unwound, and ties are kept. Only costs above
    /// [`LocalSearch::best_cost`] are timestamped.
    pub fn explore(&mut self, graph: &Graph, budget: Duration, max_iterations: u64) -> ExploreStats {
        let mut stats = ExploreStats::default();
        let n = graph.len();
        let interval = self.config.time_check_interval.max(1);
        let start = Instant::now();
        let base = self.log_len();
        let mut best = self.cost();

        while n > 0 && stats.iterations < max_iterations {
            if stats.iterations.is_multiple_of(interval) && start.elapsed() >= budget {
                break;
            }
            stats.iterations += 1;

            let Some(u) = self.random_unlocked(n) else {
                continue;
            };
            if self.aap(graph, u) {
                stats.aap_moves += 1;
                self.greedy_fill(graph);
            } else {
                self.shake(graph, u);
            }

            if self.cost() > best {
                best = self.cost();
                stats.improvements += 1;
                self.record_discovery();
                self.truncate_log(base);
            } else if self.cost() < best {
                stats.rollbacks += 1;
                self.unwind(graph, base);
            } else {
                self.truncate_log(base);
            }
        }

        stats.final_cost = self.cost();
        trace!(
            iterations = stats.iterations,
            improvements = stats.improvements,
            rollbacks = stats.rollbacks,
            aap = stats.aap_moves,
            cost = stats.final_cost,
            "explore finished"
        );
        stats
    }

    fn shake(&mut self, graph: &Graph, u: usize) {
        self.flip_vertex(graph, u);
        self.lock(graph, u);

        let flips = self.rng.random_range(0..=self.config.max_shake_flips);
        for _ in 0..flips {
            if self.queue.is_empty() {
                break;
            }
            let mut picked = None;
            for _ in 0..self.config.tabu_attempts.max(1) {
                let v = self.queue[self.rng.random_range(0..self.queue.len())];
                if self.tabu[v] == 0 {
                    picked = Some(v);
                    break;
                }
            }
            if let Some(v) = picked {
                self.flip_vertex(graph, v);
            }
        }

        self.greedy_fill(graph);
        self.unlock(graph, u);
        if !self.contains(u) && self.tabu[u] == 0 && self.adjacent_weight(u) < graph.weight(u) {
            self.add_vertex(graph, u);
        }
    }

    /// Flips a random number (at least one) of random unlocked vertices,
    /// drains the queue and commits the result. A result above the best cost
    /// is recorded as a discovery.
    pub fn perturb(&mut self, graph: &Graph) {
        let n = graph.len();
        if n == 0 {
            return;
        }
        let flips = self.rng.random_range(1..=self.config.perturb_strength.max(1));
        for _ in 0..flips {
            if let Some(v) = self.random_unlocked(n) {
                self.flip_vertex(graph, v);
            }
        }
        self.greedy_fill(graph);
        self.commit();
        self.record_discovery();
    }
}

// ============================================================================
// Tests
// ============================================================================
