//! Vertex-weighted undirected graphs in compressed sparse row (CSR) form.
//!
//! Vertices are plain `usize` indices into flat arrays:
//! - `offsets[u]..offsets[u + 1]` is the range of `u`'s arcs in `neighbors`,
//! - every undirected edge `{u, v}` is stored twice (once per endpoint),
//! - each neighbor list is sorted strictly ascending,
//! - there are no self-loops, and every weight is non-negative.
//!
//! A [`Graph`] is immutable once built. Subgraphs (see [`crate::subgraph`]) are
//! independent copies with their own arrays.

use rand::Rng;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Vertex weight type.
pub type Weight = i64;

/// Largest vertex count accepted by the parser and the builders.
pub const MAX_VERTICES: usize = i32::MAX as usize;

// ============================================================================
// Graph
// ============================================================================

/// An immutable vertex-weighted graph in CSR layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Graph {
    pub(crate) offsets: Vec<usize>,
    pub(crate) neighbors: Vec<usize>,
    pub(crate) weights: Vec<Weight>,
}

impl Graph {
    /// Creates a graph with no vertices.
    pub fn empty() -> Self {
        Self {
            offsets: vec![0],
            neighbors: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// Adopts raw CSR arrays after validating them.
    ///
    /// # Errors
    /// Returns an error if the arrays do not describe a valid graph
    /// (see [`Graph::validate`]).
    pub fn from_csr(
        offsets: Vec<usize>,
        neighbors: Vec<usize>,
        weights: Vec<Weight>,
    ) -> Result<Self, GraphError> {
        let graph = Self {
            offsets,
            neighbors,
            weights,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Builds a graph from an undirected edge list.
    ///
    /// Each edge may be given in either orientation. Duplicate edges and
    /// self-loops are dropped.
    ///
    /// # Errors
    /// Returns an error if an endpoint is out of range, a weight is negative,
    /// or there are more than [`MAX_VERTICES`] vertices.
    pub fn from_edges(weights: Vec<Weight>, edges: &[(usize, usize)]) -> Result<Self, GraphError> {
        let n = weights.len();
        if n > MAX_VERTICES {
            return Err(GraphError::TooManyVertices { n, max: MAX_VERTICES });
        }
        check_weights(&weights)?;

        let mut offsets = vec![0usize; n + 1];
        for &(u, v) in edges {
            if u >= n {
                return Err(GraphError::NeighborOutOfRange { vertex: v, neighbor: u });
            }
            if v >= n {
                return Err(GraphError::NeighborOutOfRange { vertex: u, neighbor: v });
            }
            if u != v {
                offsets[u + 1] += 1;
                offsets[v + 1] += 1;
            }
        }
        for u in 0..n {
            offsets[u + 1] += offsets[u];
        }

        let mut fill = offsets.clone();
        let mut neighbors = vec![0usize; offsets[n]];
        for &(u, v) in edges {
            if u == v {
                continue;
            }
            neighbors[fill[u]] = v;
            fill[u] += 1;
            neighbors[fill[v]] = u;
            fill[v] += 1;
        }

        // Sort every list, then compact away duplicates in place.
        let mut write = 0usize;
        for u in 0..n {
            let (start, end) = (offsets[u], offsets[u + 1]);
            neighbors[start..end].sort_unstable();
            offsets[u] = write;
            for i in start..end {
                let v = neighbors[i];
                if i > start && v == neighbors[i - 1] {
                    continue;
                }
                neighbors[write] = v;
                write += 1;
            }
        }
        offsets[n] = write;
        neighbors.truncate(write);

        Ok(Self {
            offsets,
            neighbors,
            weights,
        })
    }

    /// Generates a random graph where each edge exists with probability `p`
    /// and weights are drawn uniformly from `1..=max_weight`.
    pub fn random<R: Rng>(rng: &mut R, n: usize, p: f64, max_weight: Weight) -> Self {
        debug_assert!((0.0..=1.0).contains(&p), "p must be in [0, 1]");
        let max_weight = max_weight.max(1);
        let weights = (0..n).map(|_| rng.random_range(1..=max_weight)).collect();
        let mut edges = Vec::new();
        for u in 0..n {
            for v in (u + 1)..n {
                if rng.random_bool(p) {
                    edges.push((u, v));
                }
            }
        }
        match Self::from_edges(weights, &edges) {
            Ok(graph) => graph,
            Err(_) => unreachable!("generated edges are always in range"),
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns `true` if the graph has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Number of undirected edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.neighbors.len() / 2
    }

    /// Number of directed arcs (twice the edge count).
    #[inline]
    pub fn arc_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Sorted neighbors of `u`.
    #[inline(always)]
    pub fn neighbors(&self, u: usize) -> &[usize] {
        &self.neighbors[self.offsets[u]..self.offsets[u + 1]]
    }

    /// Degree of `u`.
    #[inline(always)]
    pub fn degree(&self, u: usize) -> usize {
        self.offsets[u + 1] - self.offsets[u]
    }

    /// Weight of `u`.
    #[inline(always)]
    pub fn weight(&self, u: usize) -> Weight {
        self.weights[u]
    }

    /// All vertex weights.
    #[inline]
    pub fn weights(&self) -> &[Weight] {
        &self.weights
    }

    /// The CSR offset array (length `len() + 1`).
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Sum of all vertex weights. Never overflows for a validated graph.
    pub fn total_weight(&self) -> Weight {
        self.weights.iter().sum()
    }

    /// Returns whether `{u, v}` is an edge (binary search over `u`'s list).
    #[inline]
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.neighbors(u).binary_search(&v).is_ok()
    }

    /// Checks every structural invariant: consistent offsets, neighbors in
    /// range, strictly ascending lists, no self-loops, symmetry and
    /// non-negative weights.
    ///
    /// # Errors
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), GraphError> {
        let n = self.weights.len();
        if n > MAX_VERTICES {
            return Err(GraphError::TooManyVertices { n, max: MAX_VERTICES });
        }
        if self.offsets.len() != n + 1 {
            return Err(GraphError::BadOffsets(format!(
                "expected {} offsets, found {}",
                n + 1,
                self.offsets.len()
            )));
        }
        if self.offsets[0] != 0 || self.offsets[n] != self.neighbors.len() {
            return Err(GraphError::BadOffsets(format!(
                "offsets must span 0..{}, found {}..{}",
                self.neighbors.len(),
                self.offsets[0],
                self.offsets[n]
            )));
        }
        if let Some(u) = (0..n).find(|&u| self.offsets[u] > self.offsets[u + 1]) {
            return Err(GraphError::BadOffsets(format!("offsets decrease at vertex {u}")));
        }
        check_weights(&self.weights)?;

        for u in 0..n {
            let list = self.neighbors(u);
            for (i, &v) in list.iter().enumerate() {
                if v >= n {
                    return Err(GraphError::NeighborOutOfRange { vertex: u, neighbor: v });
                }
                if v == u {
                    return Err(GraphError::SelfLoop { vertex: u });
                }
                if i > 0 && v <= list[i - 1] {
                    return Err(GraphError::Unsorted { vertex: u });
                }
            }
        }
        for u in 0..n {
            for &v in self.neighbors(u) {
                if !self.has_edge(v, u) {
                    return Err(GraphError::NotSymmetric { u, v });
                }
            }
        }
        Ok(())
    }

    /// Convenience wrapper around [`Graph::validate`].
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Writes the graph in METIS format with vertex weights (`fmt = 10`).
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_metis<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "{} {} 10", self.len(), self.edge_count())?;
        for u in 0..self.len() {
            write!(w, "{}", self.weights[u])?;
            for &v in self.neighbors(u) {
                write!(w, " {}", v + 1)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// Saves the graph to a METIS file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_metis(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = fs::File::create(path)?;
        self.write_metis(io::BufWriter::new(file))
    }
}

/// Rejects negative weights and weight totals that overflow [`Weight`].
///
/// Every cost and adjacent weight the engines track is bounded by the total,
/// so their running sums cannot overflow once this passes.
fn check_weights(weights: &[Weight]) -> Result<(), GraphError> {
    let mut total: Weight = 0;
    for (vertex, &weight) in weights.iter().enumerate() {
        if weight < 0 {
            return Err(GraphError::NegativeWeight { vertex, weight });
        }
        total = total.checked_add(weight).ok_or(GraphError::WeightOverflow { vertex })?;
    }
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

/// Errors encountered while parsing or validating a graph.
///
/// Vertex ids are 0-indexed unless stated otherwise.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// No header line was found.
    #[error("graph input is empty")]
    Empty,
    /// The header line is malformed.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The format code requests a feature this parser does not support.
    #[error("unsupported format code {0:?}")]
    UnsupportedFormat(String),
    /// A token could not be parsed as an integer.
    #[error("invalid token {token:?} on line {line}")]
    InvalidToken {
        /// 1-indexed line number.
        line: usize,
        /// The offending token.
        token: String,
    },
    /// A vertex line is missing its weight.
    #[error("vertex {vertex} is missing its weight")]
    MissingWeight {
        /// The vertex.
        vertex: usize,
    },
    /// A neighbor id in the input is outside `1..=n`.
    #[error("line {line} references vertex {id}, expected 1..={n}")]
    InvalidNeighbor {
        /// 1-indexed line number.
        line: usize,
        /// The 1-indexed id as written.
        id: usize,
        /// Number of vertices.
        n: usize,
    },
    /// Fewer vertex lines than declared.
    #[error("expected {expected} vertex lines, found {found}")]
    MissingVertices {
        /// Declared vertex count.
        expected: usize,
        /// Lines actually present.
        found: usize,
    },
    /// The vertex count does not fit.
    #[error("graph has {n} vertices; at most {max} are supported")]
    TooManyVertices {
        /// Requested vertex count.
        n: usize,
        /// Supported maximum.
        max: usize,
    },
    /// A weight is negative.
    #[error("vertex {vertex} has negative weight {weight}")]
    NegativeWeight {
        /// The vertex.
        vertex: usize,
        /// Its weight.
        weight: Weight,
    },
    /// The total vertex weight does not fit in [`Weight`].
    #[error("total vertex weight overflows at vertex {vertex}")]
    WeightOverflow {
        /// First vertex whose weight pushes the total past the maximum.
        vertex: usize,
    },
    /// A neighbor index is out of range.
    #[error("neighbor {neighbor} of vertex {vertex} is out of range")]
    NeighborOutOfRange {
        /// The vertex.
        vertex: usize,
        /// The out-of-range neighbor.
        neighbor: usize,
    },
    /// A vertex lists itself as a neighbor.
    #[error("self-loop at vertex {vertex}")]
    SelfLoop {
        /// The vertex.
        vertex: usize,
    },
    /// A neighbor list is not strictly ascending.
    #[error("neighbors of vertex {vertex} are not strictly ascending")]
    Unsorted {
        /// The vertex.
        vertex: usize,
    },
    /// An arc `u -> v` has no matching `v -> u`.
    #[error("arc {u} -> {v} has no reverse arc")]
    NotSymmetric {
        /// Source of the arc.
        u: usize,
        /// Target of the arc.
        v: usize,
    },
    /// The header edge count does not match the adjacency lists.
    #[error("header declares {declared} edges but the lists hold {arcs} arcs")]
    EdgeCountMismatch {
        /// Edge count from the header.
        declared: usize,
        /// Arcs found (twice the edge count when consistent).
        arcs: usize,
    },
    /// The CSR offset array is inconsistent.
    #[error("invalid offsets: {0}")]
    BadOffsets(String),
    /// I/O error (file not found, etc.).
    #[error("I/O error: {0}")]
    Io(String),
}

// ============================================================================
// Parsing
// ============================================================================

/// Reads and parses a METIS graph file.
///
/// # Errors
/// Returns an error if the file cannot be read or is malformed.
pub fn read_metis(path: impl AsRef<Path>) -> Result<Graph, GraphError> {
    let text = fs::read_to_string(path).map_err(|e| GraphError::Io(e.to_string()))?;
    parse_metis(&text)
}

/// Parses a graph in METIS format.
///
/// Rules:
/// - Lines starting with `%` are comments.
/// - The header is `n m [fmt]`. The last digit of `fmt` enables edge weights
///   (which are read and discarded), the second-to-last enables vertex weights.
///   Without vertex weights every vertex has weight 1.
/// - Exactly `n` vertex lines follow (they may be empty), each with the
///   optional weight followed by 1-indexed neighbors.
///
/// The result is validated: sorted, symmetric, no self-loops and exactly `2m`
/// arcs.
///
/// # Errors
/// Returns an error describing the first problem found.
pub fn parse_metis(text: &str) -> Result<Graph, GraphError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim_start().starts_with('%'));

    let (header_line, header) = lines
        .by_ref()
        .find(|(_, l)| !l.trim().is_empty())
        .ok_or(GraphError::Empty)?;

    let fields: Vec<&str> = header.split_whitespace().collect();
    if !(2..=3).contains(&fields.len()) {
        return Err(GraphError::InvalidHeader(format!(
            "expected `n m [fmt]`, found {header:?}"
        )));
    }
    let n = parse_number(fields[0], header_line)?;
    let m = parse_number(fields[1], header_line)?;
    let (vertex_weights, edge_weights) = parse_format(fields.get(2).copied().unwrap_or("0"))?;

    if n > MAX_VERTICES {
        return Err(GraphError::TooManyVertices { n, max: MAX_VERTICES });
    }

    let mut offsets = Vec::with_capacity(n.min(text.len()) + 1);
    let mut neighbors = Vec::with_capacity(m.saturating_mul(2).min(text.len()));
    let mut weights = Vec::with_capacity(n.min(text.len()));
    offsets.push(0);

    for u in 0..n {
        let Some((line_no, line)) = lines.next() else {
            return Err(GraphError::MissingVertices {
                expected: n,
                found: u,
            });
        };
        let mut tokens = line.split_whitespace();

        let weight = if vertex_weights {
            let token = tokens.next().ok_or(GraphError::MissingWeight { vertex: u })?;
            token.parse::<Weight>().map_err(|_| GraphError::InvalidToken {
                line: line_no,
                token: token.to_string(),
            })?
        } else {
            1
        };
        if weight < 0 {
            return Err(GraphError::NegativeWeight { vertex: u, weight });
        }
        weights.push(weight);

        while let Some(token) = tokens.next() {
            let id = parse_number(token, line_no)?;
            if id == 0 || id > n {
                return Err(GraphError::InvalidNeighbor { line: line_no, id, n });
            }
            neighbors.push(id - 1);
            if edge_weights {
                let token = tokens.next().ok_or_else(|| GraphError::InvalidToken {
                    line: line_no,
                    token: String::new(),
                })?;
                parse_number(token, line_no)?;
            }
        }
        offsets.push(neighbors.len());
    }

    let graph = Graph {
        offsets,
        neighbors,
        weights,
    };
    graph.validate()?;
    if graph.arc_count() != m.saturating_mul(2) {
        return Err(GraphError::EdgeCountMismatch {
            declared: m,
            arcs: graph.arc_count(),
        });
    }
    Ok(graph)
}

fn parse_number(token: &str, line: usize) -> Result<usize, GraphError> {
    token.parse::<usize>().map_err(|_| GraphError::InvalidToken {
        line,
        token: token.to_string(),
    })
}

/// Decodes a METIS `fmt` code into `(vertex_weights, edge_weights)`.
fn parse_format(fmt: &str) -> Result<(bool, bool), GraphError> {
    let bytes = fmt.as_bytes();
    if bytes.is_empty() || bytes.len() > 3 || bytes.iter().any(|b| !matches!(b, b'0' | b'1')) {
        return Err(GraphError::UnsupportedFormat(fmt.to_string()));
    }
    // Vertex sizes (third digit) are not supported.
    if bytes.len() == 3 && bytes[0] == b'1' {
        return Err(GraphError::UnsupportedFormat(fmt.to_string()));
    }
    let digit = |from_right: usize| bytes.len() > from_right && bytes[bytes.len() - 1 - from_right] == b'1';
    Ok((digit(1), digit(0)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    const SQUARE: &str = "4 4 10\n1 2 4\n1 1 3\n1 2 4\n1 1 3\n";

    #[test]
    fn parses_weighted_square() {
        let g = parse_metis(SQUARE).expect("valid graph");
        assert_eq!(g.len(), 4);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.neighbors(0), &[1, 3]);
        assert_eq!(g.neighbors(1), &[0, 2]);
        assert_eq!(g.neighbors(2), &[1, 3]);
        assert_eq!(g.neighbors(3), &[0, 2]);
        assert!(g.weights().iter().all(|&w| w == 1));
        assert!(g.is_valid());
    }

    #[test]
    fn unweighted_format_defaults_to_unit_weights() {
        let g = parse_metis("3 2\n2\n1 3\n2\n").expect("valid graph");
        assert_eq!(g.weights(), &[1, 1, 1]);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn edge_weights_are_skipped() {
        let g = parse_metis("2 1 11\n5 2 7\n3 1 7\n").expect("valid graph");
        assert_eq!(g.weights(), &[5, 3]);
        assert_eq!(g.neighbors(0), &[1]);
        assert_eq!(g.neighbors(1), &[0]);
    }

    #[test]
    fn comments_and_isolated_vertices() {
        let text = "% a comment\n3 1 10\n% inline comment line\n4 3\n9\n2 1\n";
        let g = parse_metis(text).expect("valid graph");
        assert_eq!(g.weights(), &[4, 9, 2]);
        assert_eq!(g.degree(1), 0);
        assert!(g.has_edge(0, 2));
        assert!(!g.has_edge(0, 1));
    }

    #[test]
    fn rejects_asymmetric_adjacency() {
        let err = parse_metis("3 1 0\n2\n\n\n").unwrap_err();
        assert!(matches!(err, GraphError::NotSymmetric { u: 0, v: 1 }));
    }

    #[test]
    fn rejects_self_loop() {
        let err = parse_metis("2 1 0\n1 2\n1\n").unwrap_err();
        assert_eq!(err, GraphError::SelfLoop { vertex: 0 });
    }

    #[test]
    fn rejects_unsorted_adjacency() {
        let err = parse_metis("3 2 0\n3 2\n1\n1\n").unwrap_err();
        assert_eq!(err, GraphError::Unsorted { vertex: 0 });
    }

    #[test]
    fn rejects_edge_count_mismatch() {
        let err = parse_metis("2 2 0\n2\n1\n").unwrap_err();
        assert_eq!(err, GraphError::EdgeCountMismatch { declared: 2, arcs: 2 });
    }

    #[test]
    fn rejects_out_of_range_neighbor() {
        let err = parse_metis("2 1 0\n3\n1\n").unwrap_err();
        assert!(matches!(err, GraphError::InvalidNeighbor { id: 3, n: 2, .. }));
    }

    #[test]
    fn rejects_weight_totals_that_overflow() {
        let text = format!("2 0 10\n{}\n1\n", Weight::MAX);
        assert_eq!(parse_metis(&text).unwrap_err(), GraphError::WeightOverflow { vertex: 1 });
        let half = Weight::MAX / 2;
        assert!(matches!(
            Graph::from_edges(vec![half, half, half], &[(0, 1)]),
            Err(GraphError::WeightOverflow { vertex: 2 })
        ));

        // A total of exactly the maximum is still accepted.
        let g = parse_metis(&format!("2 0 10\n{}\n0\n", Weight::MAX)).unwrap();
        assert_eq!(g.total_weight(), Weight::MAX);
    }

    #[test]
    fn rejects_missing_vertex_lines() {
        let err = parse_metis("3 0 0\n\n").unwrap_err();
        assert!(matches!(err, GraphError::MissingVertices { expected: 3, .. }));
    }

    #[test]
    fn rejects_negative_weight_and_bad_tokens() {
        assert!(matches!(
            parse_metis("1 0 10\n-4\n").unwrap_err(),
            GraphError::NegativeWeight { vertex: 0, weight: -4 }
        ));
        assert!(matches!(
            parse_metis("2 1 0\nx\n1\n").unwrap_err(),
            GraphError::InvalidToken { line: 2, .. }
        ));
        assert_eq!(parse_metis("").unwrap_err(), GraphError::Empty);
        assert!(matches!(
            parse_metis("2 1 100\n1\n1\n").unwrap_err(),
            GraphError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn metis_writer_round_trips() {
        let mut rng = XorShiftRng::seed_from_u64(0xA11CE);
        let g = Graph::random(&mut rng, 40, 0.15, 50);
        let mut buf = Vec::new();
        g.write_metis(&mut buf).expect("write to memory");
        let text = String::from_utf8(buf).expect("utf8");
        let parsed = parse_metis(&text).expect("re-parse");
        assert_eq!(parsed, g);
    }

    #[test]
    fn from_edges_sorts_and_deduplicates() {
        let g = Graph::from_edges(vec![1, 2, 3, 4], &[(3, 0), (0, 1), (1, 0), (2, 2), (2, 1), (0, 3)])
            .expect("valid edges");
        assert_eq!(g.neighbors(0), &[1, 3]);
        assert_eq!(g.neighbors(1), &[0, 2]);
        assert_eq!(g.neighbors(2), &[1]);
        assert_eq!(g.neighbors(3), &[0]);
        assert_eq!(g.edge_count(), 3);
        assert!(g.is_valid());
    }

    #[test]
    fn from_edges_rejects_out_of_range() {
        let err = Graph::from_edges(vec![1, 1], &[(0, 2)]).unwrap_err();
        assert_eq!(err, GraphError::NeighborOutOfRange { vertex: 0, neighbor: 2 });
    }

    #[test]
    fn from_csr_validates() {
        assert!(Graph::from_csr(vec![0, 1, 2], vec![1, 0], vec![1, 1]).is_ok());
        assert!(matches!(
            Graph::from_csr(vec![0, 1, 1], vec![1], vec![1, 1]).unwrap_err(),
            GraphError::NotSymmetric { u: 0, v: 1 }
        ));
        assert!(matches!(
            Graph::from_csr(vec![0, 2], vec![0], vec![1]).unwrap_err(),
            GraphError::BadOffsets(_)
        ));
    }

    #[test]
    fn random_graphs_are_valid() {
        let mut rng = XorShiftRng::seed_from_u64(7);
        for n in [0, 1, 2, 17, 64] {
            let g = Graph::random(&mut rng, n, 0.3, 10);
            assert_eq!(g.len(), n);
            g.validate().expect("random graph must validate");
            assert!(g.weights().iter().all(|&w| (1..=10).contains(&w)));
        }
    }

    #[test]
    fn empty_graph_is_valid() {
        let g = Graph::empty();
        assert!(g.is_empty());
        assert_eq!(g.edge_count(), 0);
        assert!(g.is_valid());
    }
}
