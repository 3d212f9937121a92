//! Incremental local-search state for one replica.
//!
//! [`LocalSearch`] holds a candidate independent set over a borrowed [`Graph`]
//! together with derived per-vertex data that every mutation updates in
//! `O(degree)`:
//!
//! - `adjacent_weight[v]`: total weight of `v`'s neighbors in the set,
//! - `tightness[v]`: number of `v`'s neighbors in the set.
//!
//! Guarded mutators ([`LocalSearch::add_vertex`], [`LocalSearch::remove_vertex`])
//! keep the set independent by cascading removals. They record every change in
//! an action log and enqueue every vertex whose neighborhood changed. The log
//! supports exact rollback with [`LocalSearch::unwind`]. The queue is drained
//! by [`LocalSearch::greedy_fill`].
//!
//! The graph is passed to every call rather than stored, so one engine can be
//! [`reset`](LocalSearch::reset) onto a different graph (the core engines are
//! re-targeted every round) without reallocating.

use crate::graph::{Graph, Weight};
use crate::moves::PathStep;
use rand::prelude::*;
use rand::rngs::SmallRng;
use std::time::{Duration, Instant};

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for a single engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Upper bound on the extra random flips drawn from the queue when an
    /// explore iteration shakes the solution.
    pub max_shake_flips: usize,
    /// How many times a random pick is resampled when it lands on a locked vertex.
    pub tabu_attempts: usize,
    /// Relative jitter applied to aap gains when choosing between continuations.
    pub aap_jitter: f64,
    /// Maximum number of steps in one alternating path.
    pub max_path_len: usize,
    /// Upper bound on random flips performed by [`LocalSearch::perturb`].
    pub perturb_strength: usize,
    /// Explore iterations between deadline checks.
    pub time_check_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_shake_flips: 8,
            tabu_attempts: 8,
            aap_jitter: 0.1,
            max_path_len: 256,
            perturb_strength: 16,
            time_check_interval: 1_000,
        }
    }
}

/// One entry of the action log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// The vertex was added to the set.
    Add(usize),
    /// The vertex was removed from the set.
    Remove(usize),
}

// ============================================================================
// Engine
// ============================================================================

/// Local-search state for one replica.
#[derive(Clone, Debug)]
pub struct LocalSearch {
    independent_set: Vec<bool>,
    cost: Weight,
    size: usize,
    adjacent_weight: Vec<Weight>,
    tightness: Vec<u32>,
    pub(crate) tabu: Vec<u32>,

    pub(crate) queue: Vec<usize>,
    in_queue: Vec<bool>,
    prev_queue: Vec<usize>,
    in_prev_queue: Vec<bool>,

    log: Vec<Action>,

    pub(crate) rng: SmallRng,
    clock: Instant,
    best_cost: Weight,
    best_time: Duration,

    pub(crate) config: EngineConfig,

    // Scratch space for 2-for-1 exchanges and alternating paths.
    candidates: Vec<usize>,
    pub(crate) path: Vec<PathStep>,
    pub(crate) visited: Vec<u32>,
    pub(crate) included: Vec<u32>,
    pub(crate) stamp: u32,
}

impl LocalSearch {
    /// Creates an engine with an empty solution on `graph`.
    pub fn new(graph: &Graph, seed: u64, config: EngineConfig) -> Self {
        let mut engine = Self {
            independent_set: Vec::new(),
            cost: 0,
            size: 0,
            adjacent_weight: Vec::new(),
            tightness: Vec::new(),
            tabu: Vec::new(),
            queue: Vec::new(),
            in_queue: Vec::new(),
            prev_queue: Vec::new(),
            in_prev_queue: Vec::new(),
            log: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            clock: Instant::now(),
            best_cost: 0,
            best_time: Duration::ZERO,
            config,
            candidates: Vec::new(),
            path: Vec::new(),
            visited: Vec::new(),
            included: Vec::new(),
            stamp: 0,
        };
        engine.reset(graph);
        engine
    }

    /// Re-initializes to an empty solution on `graph`, keeping allocations.
    ///
    /// Every vertex starts in the queue. The random state and the clock are kept.
    pub fn reset(&mut self, graph: &Graph) {
        let n = graph.len();
        refill(&mut self.independent_set, n, false);
        refill(&mut self.adjacent_weight, n, 0);
        refill(&mut self.tightness, n, 0);
        refill(&mut self.tabu, n, 0);
        refill(&mut self.in_queue, n, true);
        refill(&mut self.in_prev_queue, n, false);
        refill(&mut self.visited, n, 0);
        refill(&mut self.included, n, 0);
        self.queue.clear();
        self.queue.extend(0..n);
        self.prev_queue.clear();
        self.log.clear();
        self.cost = 0;
        self.size = 0;
        self.best_cost = 0;
        self.best_time = Duration::ZERO;
        self.stamp = 0;
    }

    // ------------------------------------------------------------------------
    // Guarded mutators
    // ------------------------------------------------------------------------

    /// Adds `u`, removing every neighbor currently in the set.
    ///
    /// `u` must be excluded and unlocked.
    pub fn add_vertex(&mut self, graph: &Graph, u: usize) {
        debug_assert!(!self.independent_set[u], "vertex {u} is already in the set");
        debug_assert_eq!(self.tabu[u], 0, "vertex {u} is locked");

        self.log.push(Action::Add(u));
        let w = graph.weight(u);
        self.independent_set[u] = true;
        self.cost += w;
        self.size += 1;

        for &v in graph.neighbors(u) {
            if self.independent_set[v] {
                self.remove_vertex(graph, v);
            }
            self.adjacent_weight[v] += w;
            self.tightness[v] += 1;
            self.enqueue(v);
        }
    }

    /// Removes `u` from the set.
    ///
    /// `u` must be in the set and unlocked.
    pub fn remove_vertex(&mut self, graph: &Graph, u: usize) {
        debug_assert!(self.independent_set[u], "vertex {u} is not in the set");
        debug_assert_eq!(self.tabu[u], 0, "vertex {u} is locked");

        self.log.push(Action::Remove(u));
        let w = graph.weight(u);
        self.independent_set[u] = false;
        self.cost -= w;
        self.size -= 1;
        self.enqueue(u);

        for &v in graph.neighbors(u) {
            self.adjacent_weight[v] -= w;
            self.tightness[v] -= 1;
            self.enqueue(v);
        }
    }

    /// Adds `u` if it is excluded, removes it otherwise.
    pub fn flip_vertex(&mut self, graph: &Graph, u: usize) {
        if self.independent_set[u] {
            self.remove_vertex(graph, u);
        } else {
            self.add_vertex(graph, u);
        }
    }

    // ------------------------------------------------------------------------
    // Raw inverses (rollback only)
    // ------------------------------------------------------------------------

    fn undo_add(&mut self, graph: &Graph, u: usize) {
        let w = graph.weight(u);
        self.independent_set[u] = false;
        self.cost -= w;
        self.size -= 1;
        for &v in graph.neighbors(u) {
            self.adjacent_weight[v] -= w;
            self.tightness[v] -= 1;
        }
    }

    fn undo_remove(&mut self, graph: &Graph, u: usize) {
        let w = graph.weight(u);
        self.independent_set[u] = true;
        self.cost += w;
        self.size += 1;
        for &v in graph.neighbors(u) {
            self.adjacent_weight[v] += w;
            self.tightness[v] += 1;
        }
    }

    /// Reverts every logged action above `checkpoint`, newest first.
    ///
    /// Restores the set, cost, size and derived fields exactly. The queue is
    /// left alone, and locks are ignored.
    pub fn unwind(&mut self, graph: &Graph, checkpoint: usize) {
        debug_assert!(
            checkpoint <= self.log.len(),
            "checkpoint {checkpoint} is above the log length {}",
            self.log.len()
        );
        while self.log.len() > checkpoint {
            match self.log.pop() {
                Some(Action::Add(u)) => self.undo_add(graph, u),
                Some(Action::Remove(u)) => self.undo_remove(graph, u),
                None => break,
            }
        }
    }

    /// Current log length; pass it to [`LocalSearch::unwind`] later to roll back.
    #[inline]
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Forgets the log, making the current solution permanent.
    #[inline]
    pub fn commit(&mut self) {
        self.log.clear();
    }

    pub(crate) fn truncate_log(&mut self, len: usize) {
        self.log.truncate(len);
    }

    // ------------------------------------------------------------------------
    // Queue and greedy improvement
    // ------------------------------------------------------------------------

    #[inline(always)]
    fn enqueue(&mut self, v: usize) {
        if !self.in_queue[v] {
            self.in_queue[v] = true;
            self.queue.push(v);
        }
    }

    /// Drains the queue to a fixpoint.
    ///
    /// Each generation is shuffled and then moved into the secondary buffer, so
    /// vertices enqueued while it is processed form the next generation. An
    /// excluded vertex is added when it outweighs its set neighbors. A set vertex
    /// tries a 2-for-1 exchange. Locked vertices are skipped. They return to the
    /// queue when [`LocalSearch::unlock`] releases them.
    pub fn greedy_fill(&mut self, graph: &Graph) {
        while !self.queue.is_empty() {
            self.queue.shuffle(&mut self.rng);
            std::mem::swap(&mut self.queue, &mut self.prev_queue);
            std::mem::swap(&mut self.in_queue, &mut self.in_prev_queue);

            for i in 0..self.prev_queue.len() {
                let u = self.prev_queue[i];
                self.in_prev_queue[u] = false;
                if self.tabu[u] > 0 {
                    continue;
                }
                if self.independent_set[u] {
                    self.try_two_for_one(graph, u);
                } else if self.adjacent_weight[u] < graph.weight(u) {
                    self.add_vertex(graph, u);
                }
            }
            self.prev_queue.clear();
        }
    }

    /// Replaces set vertex `u` by two non-adjacent neighbors whose only set
    /// neighbor is `u`, if their combined weight is larger. Picks the best pair.
    fn try_two_for_one(&mut self, graph: &Graph, u: usize) -> bool {
        self.candidates.clear();
        for &v in graph.neighbors(u) {
            if self.tightness[v] == 1 && self.tabu[v] == 0 {
                self.candidates.push(v);
            }
        }
        if self.candidates.len() < 2 {
            return false;
        }

        let target = graph.weight(u);
        let mut best: Option<(usize, usize, Weight)> = None;
        for (i, &v) in self.candidates.iter().enumerate() {
            // Both lists are sorted: walk them together to skip neighbors of v.
            let adjacent = graph.neighbors(v);
            let mut p = 0;
            for &x in &self.candidates[i + 1..] {
                while p < adjacent.len() && adjacent[p] < x {
                    p += 1;
                }
                if p < adjacent.len() && adjacent[p] == x {
                    continue;
                }
                let total = graph.weight(v) + graph.weight(x);
                if total > target && best.is_none_or(|(_, _, b)| total > b) {
                    best = Some((v, x, total));
                }
            }
        }

        match best {
            Some((v, x, _)) => {
                self.add_vertex(graph, v);
                self.add_vertex(graph, x);
                true
            }
            None => false,
        }
    }

    /// Adds vertices in index order whenever they outweigh their set neighbors.
    pub fn in_order_fill(&mut self, graph: &Graph) {
        for u in 0..graph.len() {
            if !self.independent_set[u] && self.tabu[u] == 0 && self.adjacent_weight[u] < graph.weight(u) {
                self.add_vertex(graph, u);
            }
        }
    }

    /// Adds every vertex of `mask` that is not already in the set.
    ///
    /// The caller is responsible for `mask` being independent; otherwise the
    /// cascade keeps only the later of two adjacent vertices.
    pub fn set_solution(&mut self, graph: &Graph, mask: &[bool]) {
        debug_assert_eq!(mask.len(), graph.len());
        for u in 0..graph.len() {
            if mask[u] && !self.independent_set[u] {
                self.add_vertex(graph, u);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Tabu
    // ------------------------------------------------------------------------

    /// Locks `u`, and all of its neighbors if `u` is in the set.
    ///
    /// Locks are reference counts, so nested locks are fine. `u` must keep its
    /// membership until the matching [`LocalSearch::unlock`].
    pub fn lock(&mut self, graph: &Graph, u: usize) {
        self.tabu[u] += 1;
        if self.independent_set[u] {
            for &v in graph.neighbors(u) {
                self.tabu[v] += 1;
            }
        }
    }

    /// Releases a lock taken by [`LocalSearch::lock`]. Vertices whose count
    /// drops to zero are enqueued.
    pub fn unlock(&mut self, graph: &Graph, u: usize) {
        debug_assert!(self.tabu[u] > 0, "vertex {u} is not locked");
        self.release(u);
        if self.independent_set[u] {
            for &v in graph.neighbors(u) {
                self.release(v);
            }
        }
    }

    #[inline]
    fn release(&mut self, v: usize) {
        self.tabu[v] -= 1;
        if self.tabu[v] == 0 {
            self.enqueue(v);
        }
    }

    /// Returns whether `u` is currently locked.
    #[inline]
    pub fn is_locked(&self, u: usize) -> bool {
        self.tabu[u] > 0
    }

    /// Draws a random unlocked vertex of `0..n`, resampling a bounded number of times.
    pub(crate) fn random_unlocked(&mut self, n: usize) -> Option<usize> {
        if n == 0 {
            return None;
        }
        for _ in 0..self.config.tabu_attempts.max(1) {
            let v = self.rng.random_range(0..n);
            if self.tabu[v] == 0 {
                return Some(v);
            }
        }
        None
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Total weight of the current set.
    #[inline]
    pub fn cost(&self) -> Weight {
        self.cost
    }

    /// Number of vertices in the current set.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns whether `u` is in the current set.
    #[inline(always)]
    pub fn contains(&self, u: usize) -> bool {
        self.independent_set[u]
    }

    /// Membership flags of the current set.
    #[inline]
    pub fn independent_set(&self) -> &[bool] {
        &self.independent_set
    }

    /// Total weight of `u`'s neighbors in the set.
    #[inline]
    pub fn adjacent_weight(&self, u: usize) -> Weight {
        self.adjacent_weight[u]
    }

    /// Number of `u`'s neighbors in the set.
    #[inline]
    pub fn tightness(&self, u: usize) -> u32 {
        self.tightness[u]
    }

    /// Number of vertices waiting in the queue.
    #[inline]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Vertices of the current set in ascending order.
    pub fn solution_vertices(&self) -> Vec<usize> {
        (0..self.independent_set.len()).filter(|&u| self.independent_set[u]).collect()
    }

    /// Best cost this engine has recorded.
    #[inline]
    pub fn best_cost(&self) -> Weight {
        self.best_cost
    }

    /// Time, relative to [`LocalSearch::clock`], of the last recorded improvement.
    #[inline]
    pub fn best_time(&self) -> Duration {
        self.best_time
    }

    /// Reference instant for discovery times.
    #[inline]
    pub fn clock(&self) -> Instant {
        self.clock
    }

    /// Replaces the reference instant for discovery times.
    pub fn set_clock(&mut self, clock: Instant) {
        self.clock = clock;
    }

    /// Records the current cost as the best if it improves on it, stamped with
    /// the elapsed time since the clock.
    pub fn record_discovery(&mut self) {
        if self.cost > self.best_cost {
            self.best_cost = self.cost;
            self.best_time = self.clock.elapsed();
        }
    }

    /// Like [`LocalSearch::record_discovery`], but stamps the improvement with
    /// `time` instead of now. Used when a merged core result was found earlier.
    pub fn adopt_discovery_time(&mut self, time: Duration) {
        if self.cost > self.best_cost {
            self.best_cost = self.cost;
            self.best_time = time;
        }
    }

    /// Recomputes every derived quantity from scratch and compares.
    ///
    /// # Errors
    /// Returns a description of the first inconsistency.
    pub fn check_consistency(&self, graph: &Graph) -> Result<(), String> {
        let n = graph.len();
        if self.independent_set.len() != n {
            return Err(format!(
                "engine tracks {} vertices, graph has {n}",
                self.independent_set.len()
            ));
        }
        let mut cost = 0;
        let mut size = 0;
        for u in 0..n {
            let mut weight = 0;
            let mut count = 0;
            for &v in graph.neighbors(u) {
                if self.independent_set[v] {
                    if self.independent_set[u] {
                        return Err(format!("adjacent vertices {u} and {v} are both in the set"));
                    }
                    weight += graph.weight(v);
                    count += 1;
                }
            }
            if weight != self.adjacent_weight[u] {
                return Err(format!(
                    "adjacent_weight[{u}] = {}, expected {weight}",
                    self.adjacent_weight[u]
                ));
            }
            if count != self.tightness[u] {
                return Err(format!("tightness[{u}] = {}, expected {count}", self.tightness[u]));
            }
            if self.independent_set[u] {
                cost += graph.weight(u);
                size += 1;
            }
        }
        if cost != self.cost {
            return Err(format!("cost = {}, expected {cost}", self.cost));
        }
        if size != self.size {
            return Err(format!("size = {}, expected {size}", self.size));
        }
        Ok(())
    }
}

fn refill<T: Clone>(buffer: &mut Vec<T>, n: usize, value: T) {
    buffer.clear();
    buffer.resize(n, value);
}

// ============================================================================
// Tests
// ============================================================================
