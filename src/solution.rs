//! Solution files and independence checks.
//!
//! A solution file lists 1-indexed vertex ids separated by whitespace. Files are
//! written one id per line.

use crate::graph::{Graph, Weight};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Errors from reading or validating a solution.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SolutionError {
    /// A token is not a vertex id.
    #[error("invalid vertex id {token:?}")]
    InvalidToken {
        /// The offending token.
        token: String,
    },
    /// A 1-indexed id is outside `1..=n`.
    #[error("vertex id {id} is out of range 1..={n}")]
    OutOfRange {
        /// The id as written.
        id: usize,
        /// Number of vertices.
        n: usize,
    },
    /// The membership mask does not match the graph.
    #[error("solution covers {got} vertices but the graph has {expected}")]
    LengthMismatch {
        /// Vertex count of the graph.
        expected: usize,
        /// Length of the mask.
        got: usize,
    },
    /// Two adjacent vertices are both included (0-indexed).
    #[error("vertices {u} and {v} are adjacent but both included")]
    Adjacent {
        /// First endpoint.
        u: usize,
        /// Second endpoint.
        v: usize,
    },
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Parses a whitespace-separated list of 1-indexed vertex ids into a membership
/// mask over `n` vertices. Repeated ids are accepted.
///
/// # Errors
/// Returns an error for non-numeric tokens or ids outside `1..=n`.
pub fn read_solution(text: &str, n: usize) -> Result<Vec<bool>, SolutionError> {
    let mut mask = vec![false; n];
    for token in text.split_whitespace() {
        let id: usize = token.parse().map_err(|_| SolutionError::InvalidToken {
            token: token.to_string(),
        })?;
        if id == 0 || id > n {
            return Err(SolutionError::OutOfRange { id, n });
        }
        mask[id - 1] = true;
    }
    Ok(mask)
}

/// Reads a solution file for a graph with `n` vertices.
///
/// # Errors
/// Returns an error if the file cannot be read or is malformed.
pub fn load_solution(path: impl AsRef<Path>, n: usize) -> Result<Vec<bool>, SolutionError> {
    let text = fs::read_to_string(path).map_err(|e| SolutionError::Io(e.to_string()))?;
    read_solution(&text, n)
}

/// Writes the included vertices, 1-indexed, one per line.
///
/// # Errors
/// Returns an error if writing fails.
pub fn write_solution<W: Write>(mut w: W, mask: &[bool]) -> io::Result<()> {
    for (u, _) in mask.iter().enumerate().filter(|(_, in_set)| **in_set) {
        writeln!(w, "{}", u + 1)?;
    }
    w.flush()
}

/// Saves a solution file.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn save_solution(path: impl AsRef<Path>, mask: &[bool]) -> io::Result<()> {
    let file = fs::File::create(path)?;
    write_solution(io::BufWriter::new(file), mask)
}

/// Checks that `mask` is an independent set of `graph` and returns its weight.
///
/// # Errors
/// Returns [`SolutionError::LengthMismatch`] or the first adjacent pair found.
pub fn validate_solution(graph: &Graph, mask: &[bool]) -> Result<Weight, SolutionError> {
    if mask.len() != graph.len() {
        return Err(SolutionError::LengthMismatch {
            expected: graph.len(),
            got: mask.len(),
        });
    }
    let mut weight = 0;
    for u in (0..graph.len()).filter(|&u| mask[u]) {
        if let Some(&v) = graph.neighbors(u).iter().find(|&&v| mask[v]) {
            return Err(SolutionError::Adjacent { u, v });
        }
        weight += graph.weight(u);
    }
    Ok(weight)
}

/// Total weight of the vertices in `mask`, without checking independence.
pub fn solution_weight(graph: &Graph, mask: &[bool]) -> Weight {
    mask.iter()
        .enumerate()
        .filter(|(_, in_set)| **in_set)
        .map(|(u, _)| graph.weight(u))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> Graph {
        Graph::from_edges(vec![1, 2, 3, 4], &[(0, 1), (1, 2), (2, 3)]).unwrap()
    }

    #[test]
    fn reads_one_indexed_ids() {
        let mask = read_solution("1 3\n\n  4", 4).unwrap();
        assert_eq!(mask, vec![true, false, true, true]);
        assert_eq!(read_solution("", 3).unwrap(), vec![false; 3]);
    }

    #[test]
    fn rejects_bad_ids() {
        assert_eq!(read_solution("0", 3).unwrap_err(), SolutionError::OutOfRange { id: 0, n: 3 });
        assert_eq!(read_solution("4", 3).unwrap_err(), SolutionError::OutOfRange { id: 4, n: 3 });
        assert!(matches!(read_solution("2 x", 3).unwrap_err(), SolutionError::InvalidToken { .. }));
    }

    #[test]
    fn validates_independence() {
        let g = path();
        assert_eq!(validate_solution(&g, &[true, false, true, false]), Ok(4));
        assert_eq!(validate_solution(&g, &[false, true, false, true]), Ok(6));
        assert_eq!(
            validate_solution(&g, &[false, true, true, false]),
            Err(SolutionError::Adjacent { u: 1, v: 2 })
        );
        assert!(matches!(
            validate_solution(&g, &[true]),
            Err(SolutionError::LengthMismatch { expected: 4, got: 1 })
        ));
    }

    #[test]
    fn writer_round_trips() {
        let mask = vec![false, true, false, true];
        let mut buf = Vec::new();
        write_solution(&mut buf, &mask).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "2\n4\n");
        assert_eq!(read_solution(&text, 4).unwrap(), mask);
        assert_eq!(solution_weight(&path(), &mask), 6);
    }
}
