//! # dcore
//!
//! Heuristic solver for the Maximum Weight Independent Set (MWIS) problem.
//!
//! This crate provides:
//! - A compact CSR graph with METIS parsing, validation and subgraph extraction.
//! - An **incremental** local-search engine: every add/remove updates
//!   per-vertex neighborhood weights in `O(degree)`, all changes are logged and
//!   can be rolled back exactly.
//! - A parallel orchestrator that runs several independent replicas, extracts
//!   the subgraph on which they **disagree** (the core), and intensifies the
//!   search there.
//! - Simple kernelization rules and lifting of reduced solutions.
//!
//! ## Quick Start
//!
//! ```
//! use dcore::prelude::*;
//! use std::time::Duration;
//!
//! // Weighted 4-cycle: 0 - 1 - 2 - 3 - 0.
//! let graph = parse_metis("4 4 10\n1 2 4\n1 1 3\n1 2 4\n1 1 3\n").unwrap();
//!
//! let cfg = SearchConfig {
//!     replicas: 2,
//!     step_time: Duration::from_millis(10),
//!     ..Default::default()
//! };
//! let mut search = CoreSearch::new(&graph, cfg).unwrap();
//! let outcome = search.run(&graph, Duration::from_millis(50), 3);
//!
//! assert_eq!(outcome.cost, 2);
//! assert_eq!(validate_solution(&graph, &outcome.independent_set), Ok(2));
//! ```
//!
//! ## Working with the Engine Directly
//!
//! ```
//! use dcore::prelude::*;
//!
//! // Star: heavy center, five light leaves.
//! let graph = Graph::from_edges(
//!     vec![10, 3, 3, 3, 3, 3],
//!     &[(0, 1), (0, 2), (0, 3), (0, 4), (0, 5)],
//! ).unwrap();
//!
//! let mut ls = LocalSearch::new(&graph, 42, EngineConfig::default());
//! ls.add_vertex(&graph, 0);
//! let checkpoint = ls.log_len();
//!
//! // Adding a leaf evicts the center.
//! ls.add_vertex(&graph, 1);
//! assert_eq!(ls.cost(), 3);
//!
//! ls.unwind(&graph, checkpoint);
//! assert_eq!(ls.cost(), 10);
//! ```
//!
//! ## Modules
//!
//! - [`graph`]: CSR graph, METIS parsing and writing, validation.
//! - [`subgraph`]: Sequential and parallel induced-subgraph extraction.
//! - [`local_search`]: Incremental engine state, greedy fill, tabu, rollback.
//! - [`moves`]: Alternating augmenting paths, the explore loop, perturbation.
//! - [`search`]: Multi-replica orchestrator with core intensification.
//! - [`solution`]: Solution files and independence checks.
//! - [`kernel`]: Reduction rules and solution lifting.
//!
//! ## Performance Notes
//!
//! - Engines never allocate in the explore loop once their buffers have grown.
//! - Core engines and subgraph buffers are sized once for the full graph and
//!   reused every round.
//! - For maximum performance, compile with: `RUSTFLAGS="-C target-cpu=native" cargo build --release`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::inline_always)] // Intentional for hot-path code
#![allow(clippy::many_single_char_names)] // Graph notation (u, v, w, x, y, z)
#![allow(clippy::needless_range_loop)] // Index loops mutate several arrays at once
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::multiple_crate_versions)] // Cargo.lock management is external

pub mod graph;
pub mod kernel;
pub mod local_search;
pub mod moves;
pub mod search;
pub mod solution;
pub mod subgraph;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::graph::{Graph, GraphError, Weight, parse_metis, read_metis};
    pub use crate::kernel::{Decision, ReducedGraph, Reduction, ReductionRule, kernelize};
    pub use crate::local_search::{EngineConfig, LocalSearch};
    pub use crate::moves::ExploreStats;
    pub use crate::search::{CoreSearch, CoreSeeding, MergePolicy, SearchConfig, SearchOutcome};
    pub use crate::solution::{SolutionError, load_solution, save_solution, validate_solution};
    pub use crate::subgraph::SubgraphBuffers;
}
