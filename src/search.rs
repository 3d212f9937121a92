//! Parallel multi-replica search with disagreement-core intensification.
//!
//! Each round:
//! 1. every replica runs [`LocalSearch::explore`] for one time slice,
//! 2. vertices on which the replicas disagree form the *core*,
//! 3. the core subgraph is extracted and every replica searches it with its
//!    own core engine, merging the result back according to [`MergePolicy`],
//! 4. small cores trigger perturbation of some replicas instead.
//!
//! Every phase is a rayon fork-join over the replicas (or over vertices), so
//! the end of each phase is the barrier between phases.

use crate::graph::{Graph, Weight};
use crate::local_search::{EngineConfig, LocalSearch};
use crate::moves::ExploreStats;
use crate::solution::{SolutionError, validate_solution};
use crate::subgraph::SubgraphBuffers;
use rand::Rng;
use rayon::prelude::*;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

// ============================================================================
// Configuration
// ============================================================================

/// When a replica adopts the result of its core search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// The best replica always merges. Others merge when the core result is
    /// not worse than their own weight on the core, or when their index is even.
    #[default]
    Diversify,
    /// Merge only when the core result is not worse.
    NotWorse,
    /// Always merge.
    Always,
}

impl MergePolicy {
    /// Decides whether replica `index` merges a core result of `core_cost`
    /// against its own weight `reference` on the core.
    pub fn accepts(self, index: usize, best: usize, reference: Weight, core_cost: Weight) -> bool {
        match self {
            Self::Diversify => index == best || core_cost >= reference || index.is_multiple_of(2),
            Self::NotWorse => core_cost >= reference,
            Self::Always => true,
        }
    }
}

/// How a core engine is initialized each round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoreSeeding {
    /// Start from the replica's own assignment restricted to the core.
    #[default]
    FromReplica,
    /// Start from the empty set.
    Empty,
}

/// Orchestrator parameters.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Number of full-graph replicas.
    pub replicas: usize,
    /// Worker threads (defaults to the replica count).
    pub threads: Option<usize>,
    /// Base seed; replica `i` derives its own seed from it.
    pub seed: u64,
    /// Wall time of one explore phase.
    pub step_time: Duration,
    /// Iteration cap of one explore phase.
    pub step_iterations: u64,
    /// Core phase length as a fraction of `step_time`, in `(0, 1]`.
    pub core_fraction: f64,
    /// Cores smaller than this trigger perturbation.
    pub min_core: usize,
    /// Merge rule for core results.
    pub merge_policy: MergePolicy,
    /// Initialization of core engines.
    pub core_seeding: CoreSeeding,
    /// Parameters shared by all engines.
    pub engine: EngineConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            replicas: 8,
            threads: None,
            seed: 0,
            step_time: Duration::from_secs(10),
            step_iterations: u64::MAX,
            core_fraction: 0.5,
            min_core: 512,
            merge_policy: MergePolicy::default(),
            core_seeding: CoreSeeding::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Checks parameter ranges.
    ///
    /// # Errors
    /// Returns [`SearchError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.replicas == 0 {
            return Err(SearchError::InvalidConfig("replicas must be at least 1".into()));
        }
        if self.threads == Some(0) {
            return Err(SearchError::InvalidConfig("threads must be at least 1".into()));
        }
        if self.step_time.is_zero() {
            return Err(SearchError::InvalidConfig("step_time must be positive".into()));
        }
        if !(self.core_fraction > 0.0 && self.core_fraction <= 1.0) {
            return Err(SearchError::InvalidConfig(format!(
                "core_fraction must be in (0, 1], got {}",
                self.core_fraction
            )));
        }
        Ok(())
    }
}

/// Errors raised by the orchestrator.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A configuration value is out of range.
    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),
    /// A replica index is out of range.
    #[error("replica {index} does not exist ({count} replicas)")]
    NoSuchReplica {
        /// Requested index.
        index: usize,
        /// Number of replicas.
        count: usize,
    },
    /// An initial solution is not an independent set of the graph.
    #[error("initial solution rejected: {0}")]
    InvalidSolution(#[from] SolutionError),
    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result of [`CoreSearch::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Weight of the best solution.
    pub cost: Weight,
    /// Number of vertices in the best solution.
    pub size: usize,
    /// When the best weight was first reached, since the search was created.
    pub time: Duration,
    /// Replica that held the best solution.
    pub replica: usize,
    /// Rounds completed over the lifetime of the search.
    pub rounds: u64,
    /// Membership flags of the best solution.
    pub independent_set: Vec<bool>,
}

// ============================================================================
// Orchestrator
// ============================================================================

#[derive(Clone, Debug, Default)]
struct BestSolution {
    found: bool,
    cost: Weight,
    size: usize,
    time: Duration,
    replica: usize,
    independent_set: Vec<bool>,
}

/// Multi-replica search over one graph.
pub struct CoreSearch {
    config: SearchConfig,
    pool: rayon::ThreadPool,
    replicas: Vec<LocalSearch>,
    core_replicas: Vec<LocalSearch>,
    agreement: Vec<u32>,
    core_mask: Vec<bool>,
    core: SubgraphBuffers,
    clock: Instant,
    warmed_up: bool,
    rounds: u64,
    best: BestSolution,
}

impl CoreSearch {
    /// Creates the worker pool and all engines for `graph`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the pool cannot be built.
    pub fn new(graph: &Graph, config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let p = config.replicas;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads.unwrap_or(p))
            .thread_name(|i| format!("dcore-worker-{i}"))
            .build()?;

        let clock = Instant::now();
        let engine = &config.engine;
        let (replicas, core_replicas) = pool.install(|| {
            let build = |i: usize| {
                let mut ls = LocalSearch::new(graph, splitmix64(config.seed ^ i as u64), engine.clone());
                ls.set_clock(clock);
                ls
            };
            let replicas: Vec<LocalSearch> = (0..p).into_par_iter().map(&build).collect();
            let core_replicas: Vec<LocalSearch> = (p..2 * p).into_par_iter().map(&build).collect();
            (replicas, core_replicas)
        });

        debug!(
            replicas = p,
            threads = pool.current_num_threads(),
            vertices = graph.len(),
            "core search initialized"
        );

        Ok(Self {
            pool,
            replicas,
            core_replicas,
            agreement: vec![0; graph.len()],
            core_mask: vec![false; graph.len()],
            core: SubgraphBuffers::new(graph),
            clock,
            warmed_up: false,
            rounds: 0,
            best: BestSolution::default(),
            config,
        })
    }

    /// Loads an initial solution into replica `index`.
    ///
    /// # Errors
    /// Returns an error if the replica does not exist or `mask` is not an
    /// independent set of `graph`.
    pub fn set_solution(&mut self, graph: &Graph, index: usize, mask: &[bool]) -> Result<(), SearchError> {
        let count = self.replicas.len();
        let ls = self
            .replicas
            .get_mut(index)
            .ok_or(SearchError::NoSuchReplica { index, count })?;
        let weight = validate_solution(graph, mask)?;
        ls.reset(graph);
        ls.set_solution(graph, mask);
        ls.commit();
        ls.record_discovery();
        debug!(replica = index, weight, "initial solution loaded");
        Ok(())
    }

    /// Loads the same initial solution into every replica.
    ///
    /// # Errors
    /// Returns an error if `mask` is not an independent set of `graph`.
    pub fn set_solution_all(&mut self, graph: &Graph, mask: &[bool]) -> Result<(), SearchError> {
        for index in 0..self.replicas.len() {
            self.set_solution(graph, index, mask)?;
        }
        Ok(())
    }

    /// Runs rounds until `time_limit` has passed or `max_rounds` rounds are done.
    ///
    /// The first call warm-starts every replica. With a zero budget the
    /// warm-start result is returned.
    pub fn run(&mut self, graph: &Graph, time_limit: Duration, max_rounds: u64) -> SearchOutcome {
        let start = Instant::now();
        if !self.warmed_up {
            self.warm_start(graph);
            self.warmed_up = true;
        }
        self.track_best();
        info!(
            replicas = self.replicas.len(),
            vertices = graph.len(),
            edges = graph.edge_count(),
            weight = self.best.cost,
            "search started"
        );

        let mut done = 0;
        while done < max_rounds {
            let elapsed = start.elapsed();
            if elapsed >= time_limit {
                break;
            }
            done += 1;
            self.rounds += 1;

            let slice = self.config.step_time.min(time_limit - elapsed);
            self.explore_phase(graph, slice);

            self.mark_core();
            let best = self.track_best();

            let core_budget = self
                .config
                .step_time
                .mul_f64(self.config.core_fraction)
                .min(time_limit.saturating_sub(start.elapsed()));
            let (core_vertices, core_edges) = self.intensify(graph, best, core_budget);

            // Merges may have produced a new best; it must be seen before perturbing.
            let best = self.track_best();
            if core_vertices < self.config.min_core {
                self.perturb_phase(graph, best);
            }

            let best = self.track_best();
            let worst = self.replicas.iter().map(LocalSearch::cost).min().unwrap_or(0);
            info!(
                round = self.rounds,
                best = self.best.cost,
                replica = best,
                worst,
                core_vertices,
                core_edges,
                elapsed_ms = self.clock.elapsed().as_millis() as u64,
                "round finished"
            );
        }

        self.outcome()
    }

    fn warm_start(&mut self, graph: &Graph) {
        let n = graph.len();
        self.pool.install(|| {
            self.replicas.par_iter_mut().enumerate().for_each(|(i, ls)| {
                if ls.size() == 0 && n > 0 {
                    if i == 0 {
                        ls.in_order_fill(graph);
                    } else {
                        let u = ls.rng.random_range(0..n);
                        ls.add_vertex(graph, u);
                    }
                }
                ls.greedy_fill(graph);
                ls.commit();
                ls.record_discovery();
            });
        });
        debug!(
            best = self.replicas.iter().map(LocalSearch::cost).max().unwrap_or(0),
            "warm start finished"
        );
    }

    fn explore_phase(&mut self, graph: &Graph, budget: Duration) {
        let cap = self.config.step_iterations;
        let stats: Vec<ExploreStats> = self.pool.install(|| {
            self.replicas
                .par_iter_mut()
                .map(|ls| ls.explore(graph, budget, cap))
                .collect()
        });
        debug!(
            iterations = stats.iter().map(|s| s.iterations).sum::<u64>(),
            improvements = stats.iter().map(|s| s.improvements).sum::<u64>(),
            ?budget,
            "explore phase finished"
        );
    }

    /// Counts, per vertex, the replicas holding it; a vertex is in the core
    /// when some but not all replicas hold it.
    fn mark_core(&mut self) {
        let replicas = &self.replicas;
        let p = replicas.len() as u32;
        self.pool.install(|| {
            self.agreement
                .par_iter_mut()
                .zip(self.core_mask.par_iter_mut())
                .enumerate()
                .for_each(|(v, (count, in_core))| {
                    *count = replicas.iter().filter(|ls| ls.contains(v)).count() as u32;
                    *in_core = *count > 0 && *count < p;
                });
        });
    }

    /// Extracts the core and searches it with every core engine. Returns the
    /// core's vertex and edge counts.
    fn intensify(&mut self, graph: &Graph, best: usize, budget: Duration) -> (usize, usize) {
        let workers = self.pool.current_num_threads();
        let Self {
            config,
            pool,
            replicas,
            core_replicas,
            core_mask,
            core,
            ..
        } = self;

        pool.install(|| {
            core.extract_parallel(graph, core_mask, workers);
        });
        let phase = CorePhase {
            graph,
            core: core.graph(),
            reverse_map: core.reverse_map(),
            best,
            budget,
            max_iterations: config.step_iterations,
            policy: config.merge_policy,
            seeding: config.core_seeding,
        };
        let counts = (phase.core.len(), phase.core.edge_count());
        if phase.core.is_empty() || budget.is_zero() {
            return counts;
        }

        let merged: usize = pool.install(|| {
            replicas
                .par_iter_mut()
                .zip(core_replicas.par_iter_mut())
                .enumerate()
                .map(|(i, (full, local))| phase.run(i, full, local))
                .sum()
        });
        debug!(
            core_vertices = counts.0,
            core_edges = counts.1,
            merged,
            ?budget,
            "core phase finished"
        );
        counts
    }

    fn perturb_phase(&mut self, graph: &Graph, best: usize) {
        self.pool.install(|| {
            self.replicas
                .par_iter_mut()
                .enumerate()
                .filter(|(i, _)| *i != best && i.is_multiple_of(2))
                .for_each(|(_, ls)| ls.perturb(graph));
        });
        debug!(best, "perturbed even non-best replicas");
    }

    /// Picks the best replica (max cost, lowest index) and refreshes the
    /// best-solution snapshot when it improves. Returns the replica index.
    ///
    /// The snapshot time is the earliest discovery of `cost` among replicas
    /// currently holding it.
    fn track_best(&mut self) -> usize {
        let index = first_best(&self.replicas);
        let ls = &self.replicas[index];
        let cost = ls.cost();
        if !self.best.found || cost > self.best.cost {
            let time = self
                .replicas
                .iter()
                .filter(|r| r.cost() == cost && r.best_cost() == cost)
                .map(LocalSearch::best_time)
                .min()
                .unwrap_or_else(|| ls.clock().elapsed());
            self.best.found = true;
            self.best.cost = cost;
            self.best.size = ls.size();
            self.best.time = time;
            self.best.replica = index;
            self.best.independent_set.clear();
            self.best.independent_set.extend_from_slice(ls.independent_set());
        }
        index
    }

    fn outcome(&self) -> SearchOutcome {
        SearchOutcome {
            cost: self.best.cost,
            size: self.best.size,
            time: self.best.time,
            replica: self.best.replica,
            rounds: self.rounds,
            independent_set: self.best.independent_set.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Membership flags of the best solution found so far.
    pub fn best_solution(&self) -> &[bool] {
        &self.best.independent_set
    }

    /// Weight of the best solution found so far.
    pub fn best_cost(&self) -> Weight {
        self.best.cost
    }

    /// Size of the best solution found so far.
    pub fn best_size(&self) -> usize {
        self.best.size
    }

    /// When the best weight was first reached.
    pub fn best_time(&self) -> Duration {
        self.best.time
    }

    /// Replica `index`, if it exists.
    pub fn replica(&self, index: usize) -> Option<&LocalSearch> {
        self.replicas.get(index)
    }

    /// Number of replicas.
    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Core membership from the most recent round.
    pub fn core_mask(&self) -> &[bool] {
        &self.core_mask
    }

    /// Per-vertex count of replicas holding it, from the most recent round.
    pub fn agreement(&self) -> &[u32] {
        &self.agreement
    }

    /// Rounds completed so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}

/// Shared inputs of one core phase.
struct CorePhase<'a> {
    graph: &'a Graph,
    core: &'a Graph,
    reverse_map: &'a [usize],
    best: usize,
    budget: Duration,
    max_iterations: u64,
    policy: MergePolicy,
    seeding: CoreSeeding,
}

impl CorePhase<'_> {
    /// Searches the core with `local` on behalf of replica `index` and merges
    /// the result into `full`. Returns the number of vertices added to `full`.
    fn run(&self, index: usize, full: &mut LocalSearch, local: &mut LocalSearch) -> usize {
        local.reset(self.core);
        local.set_clock(full.clock());

        let reference: Weight = self
            .reverse_map
            .iter()
            .enumerate()
            .filter(|&(_, &u)| full.contains(u))
            .map(|(i, _)| self.core.weight(i))
            .sum();
        if self.seeding == CoreSeeding::FromReplica {
            for (i, &u) in self.reverse_map.iter().enumerate() {
                if full.contains(u) {
                    local.add_vertex(self.core, i);
                }
            }
            local.commit();
        }

        local.explore(self.core, self.budget, self.max_iterations);
        let core_cost = local.cost();
        if !self.policy.accepts(index, self.best, reference, core_cost) {
            return 0;
        }

        let mut added = 0;
        for (i, &u) in self.reverse_map.iter().enumerate() {
            if local.contains(i) && !full.contains(u) {
                full.add_vertex(self.graph, u);
                added += 1;
            }
        }
        full.greedy_fill(self.graph);
        full.commit();
        if core_cost > reference {
            full.adopt_discovery_time(local.best_time());
        } else {
            full.record_discovery();
        }
        added
    }
}

/// Index of the replica with the highest cost, lowest index on ties.
fn first_best(replicas: &[LocalSearch]) -> usize {
    let mut best = 0;
    for (i, ls) in replicas.iter().enumerate() {
        if ls.cost() > replicas[best].cost() {
            best = i;
        }
    }
    best
}

/// SplitMix64 finalizer, used to derive per-replica seeds from a base seed.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn config(replicas: usize, seed: u64) -> SearchConfig {
        SearchConfig {
            replicas,
            threads: Some(2),
            seed,
            step_time: Duration::from_millis(20),
            min_core: 8,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn splitmix64_is_deterministic() {
        assert_eq!(splitmix64(0), splitmix64(0));
        assert_eq!(splitmix64(12345), splitmix64(12345));
        assert_ne!(splitmix64(0), splitmix64(1));
    }

    #[test]
    fn replicas_start_from_different_solutions() {
        let mut rng = XorShiftRng::seed_from_u64(12);
        let g = Graph::random(&mut rng, 200, 0.03, 50);
        let mut search = CoreSearch::new(&g, config(4, 0x1337)).unwrap();
        search.run(&g, Duration::ZERO, 0);

        // Replicas 1.. start from a random vertex drawn from their own stream.
        let sets: Vec<Vec<bool>> = (1..4)
            .map(|i| search.replica(i).unwrap().independent_set().to_vec())
            .collect();
        assert!(sets.windows(2).any(|w| w[0] != w[1]), "warm starts coincide");
    }

    #[test]
    fn outcome_keeps_every_replica_best() {
        for graph_seed in 0..12 {
            let mut rng = XorShiftRng::seed_from_u64(graph_seed);
            let g = Graph::random(&mut rng, 300, 0.02, 100);
            let cfg = SearchConfig {
                step_iterations: 40,
                min_core: usize::MAX,
                ..config(6, graph_seed)
            };
            let mut search = CoreSearch::new(&g, cfg).unwrap();
            for round in 0..6 {
                let out = search.run(&g, Duration::from_secs(10), 1);
                let replicas: Vec<&LocalSearch> =
                    (0..search.replica_count()).filter_map(|i| search.replica(i)).collect();
                let top = replicas.iter().map(|ls| ls.best_cost()).max().unwrap_or(0);
                assert!(
                    out.cost >= top,
                    "graph {graph_seed} round {round}: a replica reached {top}, outcome has {}",
                    out.cost
                );
                assert_eq!(validate_solution(&g, &out.independent_set), Ok(out.cost));

                // The reported time is the discovery time of the reported cost.
                assert!(
                    replicas
                        .iter()
                        .any(|ls| ls.best_cost() == out.cost && ls.best_time() == out.time),
                    "graph {graph_seed} round {round}: no replica found {} at {:?}",
                    out.cost,
                    out.time
                );
            }
        }
    }

    #[test]
    fn search_config_default_is_valid() {
        let cfg = SearchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.replicas, 8);
        assert_eq!(cfg.step_time, Duration::from_secs(10));
        assert!(cfg.core_fraction > 0.0 && cfg.core_fraction <= 1.0);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let g = Graph::empty();
        for cfg in [
            SearchConfig { replicas: 0, ..SearchConfig::default() },
            SearchConfig { threads: Some(0), ..SearchConfig::default() },
            SearchConfig { core_fraction: 0.0, ..SearchConfig::default() },
            SearchConfig { core_fraction: f64::NAN, ..SearchConfig::default() },
            SearchConfig { step_time: Duration::ZERO, ..SearchConfig::default() },
        ] {
            assert!(matches!(CoreSearch::new(&g, cfg), Err(SearchError::InvalidConfig(_))));
        }
    }

    #[test]
    fn merge_policies() {
        let p = MergePolicy::Diversify;
        assert!(p.accepts(3, 3, 10, 5), "best replica always merges");
        assert!(p.accepts(3, 0, 10, 10), "not worse merges");
        assert!(p.accepts(2, 0, 10, 5), "even replicas merge");
        assert!(!p.accepts(3, 0, 10, 5));
        assert!(!MergePolicy::NotWorse.accepts(0, 0, 10, 9));
        assert!(MergePolicy::NotWorse.accepts(1, 0, 10, 10));
        assert!(MergePolicy::Always.accepts(1, 0, 10, 0));
    }

    #[test]
    fn core_marks_disagreement() {
        // Path 0 - 1 - 2 - 3.
        let g = Graph::from_edges(vec![1, 1, 1, 1], &[(0, 1), (1, 2), (2, 3)]).unwrap();
        let mut search = CoreSearch::new(&g, config(3, 0)).unwrap();
        search.set_solution(&g, 0, &[true, false, true, false]).unwrap();
        search.set_solution(&g, 1, &[true, false, false, true]).unwrap();
        search.set_solution(&g, 2, &[true, false, true, false]).unwrap();
        search.mark_core();
        assert_eq!(search.agreement(), &[3, 0, 2, 1]);
        assert_eq!(search.core_mask(), &[false, false, true, true]);
    }

    #[test]
    fn rejects_invalid_initial_solution() {
        let g = Graph::from_edges(vec![1, 1], &[(0, 1)]).unwrap();
        let mut search = CoreSearch::new(&g, config(2, 0)).unwrap();
        assert!(matches!(
            search.set_solution_all(&g, &[true, true]),
            Err(SearchError::InvalidSolution(SolutionError::Adjacent { .. }))
        ));
        assert!(matches!(
            search.set_solution(&g, 5, &[true, false]),
            Err(SearchError::NoSuchReplica { index: 5, count: 2 })
        ));
    }

    #[test]
    fn zero_budget_returns_warm_start_deterministically() {
        let mut rng = XorShiftRng::seed_from_u64(3);
        let g = Graph::random(&mut rng, 200, 0.03, 100);
        let run = || {
            let mut search = CoreSearch::new(&g, config(4, 77)).unwrap();
            search.run(&g, Duration::ZERO, u64::MAX)
        };
        let a = run();
        let b = run();
        assert_eq!(a.rounds, 0);
        assert_eq!(a.independent_set, b.independent_set);
        assert_eq!(a.cost, b.cost);
        assert_eq!(validate_solution(&g, &a.independent_set), Ok(a.cost));

        let mut search = CoreSearch::new(&g, config(4, 77)).unwrap();
        let c = search.run(&g, Duration::from_secs(60), 0);
        assert_eq!(c.independent_set, a.independent_set);
    }

    #[test]
    fn single_replica_never_has_a_core() {
        let mut rng = XorShiftRng::seed_from_u64(4);
        let g = Graph::random(&mut rng, 80, 0.05, 30);
        let mut search = CoreSearch::new(&g, config(1, 1)).unwrap();
        let out = search.run(&g, Duration::from_secs(10), 3);
        assert_eq!(out.rounds, 3);
        assert!(search.core_mask().iter().all(|&c| !c));
        assert_eq!(validate_solution(&g, &out.independent_set), Ok(out.cost));
    }

    #[test]
    fn best_is_monotone_across_runs() {
        let mut rng = XorShiftRng::seed_from_u64(5);
        let g = Graph::random(&mut rng, 150, 0.04, 50);
        let mut search = CoreSearch::new(&g, config(4, 9)).unwrap();
        let mut last = 0;
        for _ in 0..3 {
            let out = search.run(&g, Duration::from_secs(10), 2);
            assert!(out.cost >= last);
            assert_eq!(validate_solution(&g, search.best_solution()), Ok(search.best_cost()));
            last = out.cost;
        }
        assert_eq!(search.rounds(), 6);
        for i in 0..search.replica_count() {
            search.replica(i).unwrap().check_consistency(&g).unwrap();
        }
    }
}
