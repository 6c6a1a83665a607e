//! # Reading and Writing Graph Instances
//!
//! Two plain text formats are supported. Lines starting with `c` are comments
//! in both.
//!
//! Edge lists have a `p edge <n> <m>` header followed by `m` lines
//! `e <u> <v> <w>`, vertices are `0..n`.
//!
//! Weight matrices start with a line holding `n`, followed by `n` rows of `n`
//! weights each. The matrix must be symmetric and describes the complete
//! graph on `0..n`, the diagonal is ignored.

use std::{
    ffi::OsString,
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::Path,
    str::FromStr,
};

use anyhow::Context;

use crate::graph::{Graph, InputError, Vertex, Weight};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum FileFormat {
    /// Infer the file format from the file extension. `.graph` and `.edges`
    /// are interpreted as edge lists, `.matrix` and `.mat` as weight matrices.
    Infer,
    /// An edge list
    EdgeList,
    /// A full weight matrix
    Matrix,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Infer => write!(f, "infer"),
            FileFormat::EdgeList => write!(f, "edge-list"),
            FileFormat::Matrix => write!(f, "matrix"),
        }
    }
}

macro_rules! is_one_of {
    ($a:expr, $($b:expr),*) => {
        $( $a == $b || )* false
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Cannot infer file format from extension {0:?}")]
    UnknownFileExtension(OsString),
    #[error("To infer the file format, the file needs to have a file extension")]
    NoFileExtension,
    #[error("Parse error in line {line}: {msg}")]
    Parse { line: usize, msg: String },
}

/// The largest vertex count accepted in instance headers
pub const MAX_VERTICES: usize = 1 << 20;

fn parse_error<T>(line: usize, msg: impl Into<String>) -> anyhow::Result<T> {
    anyhow::bail!(Error::Parse {
        line,
        msg: msg.into(),
    })
}

/// Parses a graph from a file
pub fn parse<P: AsRef<Path>>(inst_path: P, file_format: FileFormat) -> anyhow::Result<Graph> {
    let inst_path = inst_path.as_ref();
    let parser: fn(BufReader<File>) -> anyhow::Result<Graph> = match file_format {
        FileFormat::Infer => {
            let Some(ext) = inst_path.extension() else {
                anyhow::bail!(Error::NoFileExtension)
            };
            if is_one_of!(ext, "graph", "edges") {
                parse_edge_list
            } else if is_one_of!(ext, "matrix", "mat") {
                parse_matrix
            } else {
                anyhow::bail!(Error::UnknownFileExtension(OsString::from(ext)))
            }
        }
        FileFormat::EdgeList => parse_edge_list,
        FileFormat::Matrix => parse_matrix,
    };
    let file = File::open(inst_path).with_context(|| format!("failed to open {inst_path:?}"))?;
    parser(BufReader::new(file))
}

/// Iterates over the non-empty, non-comment lines together with their line
/// numbers (starting at 1)
fn content_lines<R: BufRead>(reader: R) -> impl Iterator<Item = (usize, io::Result<String>)> {
    reader
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| match line {
            Ok(line) => {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('c')
            }
            Err(_) => true,
        })
}

fn number<T: FromStr>(token: Option<&str>, line: usize, what: &str) -> anyhow::Result<T> {
    match token.map(str::parse) {
        Some(Ok(val)) => Ok(val),
        Some(Err(_)) => parse_error(line, format!("invalid {what}")),
        None => parse_error(line, format!("missing {what}")),
    }
}

/// Parses a graph in edge list format
pub fn parse_edge_list<R: BufRead>(reader: R) -> anyhow::Result<Graph> {
    let mut lines = content_lines(reader);
    let Some((lnum, header)) = lines.next() else {
        return parse_error(0, "missing header");
    };
    let header = header?;
    let mut tokens = header.split_whitespace();
    if tokens.next() != Some("p") || tokens.next() != Some("edge") {
        return parse_error(lnum, "expected `p edge <n> <m>` header");
    }
    let n: Vertex = number(tokens.next(), lnum, "vertex count")?;
    let m: usize = number(tokens.next(), lnum, "edge count")?;
    if n as usize > MAX_VERTICES {
        return parse_error(lnum, format!("more than {MAX_VERTICES} vertices"));
    }
    let max_edges = u64::from(n) * u64::from(n).saturating_sub(1) / 2;
    if m as u64 > max_edges {
        return parse_error(
            lnum,
            format!("{m} edges do not fit a simple graph on {n} vertices"),
        );
    }
    let mut graph = Graph::with_vertices(n);
    for (lnum, line) in lines {
        let line = line?;
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("e") {
            return parse_error(lnum, "expected `e <u> <v> <w>` line");
        }
        let u: Vertex = number(tokens.next(), lnum, "vertex")?;
        let v: Vertex = number(tokens.next(), lnum, "vertex")?;
        let w: Weight = number(tokens.next(), lnum, "weight")?;
        if tokens.next().is_some() {
            return parse_error(lnum, "trailing tokens");
        }
        for x in [u, v] {
            if x >= n {
                anyhow::bail!(InputError::UnknownVertex(x));
            }
        }
        graph
            .add_edge(u, v, w)
            .with_context(|| format!("invalid edge in line {lnum}"))?;
    }
    if graph.n_edges() != m {
        return parse_error(
            lnum,
            format!("header announces {m} edges, found {}", graph.n_edges()),
        );
    }
    Ok(graph)
}

/// Parses a complete graph in weight matrix format
pub fn parse_matrix<R: BufRead>(reader: R) -> anyhow::Result<Graph> {
    let mut lines = content_lines(reader);
    let Some((lnum, header)) = lines.next() else {
        return parse_error(0, "missing dimension");
    };
    let n: usize = number(Some(header?.trim()), lnum, "dimension")?;
    if n > MAX_VERTICES {
        return parse_error(lnum, format!("more than {MAX_VERTICES} vertices"));
    }
    let mut rows: Vec<Vec<Weight>> = vec![];
    for (lnum, line) in lines {
        let line = line?;
        if rows.len() == n {
            return parse_error(lnum, "more rows than the dimension");
        }
        let row = line
            .split_whitespace()
            .map(|tok| number(Some(tok), lnum, "weight"))
            .collect::<anyhow::Result<Vec<Weight>>>()?;
        if row.len() != n {
            return parse_error(lnum, format!("expected {n} weights, found {}", row.len()));
        }
        rows.push(row);
    }
    if rows.len() != n {
        return parse_error(lnum, format!("expected {n} rows, found {}", rows.len()));
    }
    let n = Vertex::try_from(n).context("dimension too large")?;
    let mut graph = Graph::with_vertices(n);
    for u in 0..n {
        for v in u + 1..n {
            let (ui, vi) = (u as usize, v as usize);
            if rows[ui][vi] != rows[vi][ui] {
                return parse_error(
                    lnum,
                    format!("matrix is not symmetric at ({u}, {v})"),
                );
            }
            graph.add_edge(u, v, rows[ui][vi])?;
        }
    }
    Ok(graph)
}

/// Writes a graph in edge list format
pub fn write_edge_list<W: Write>(graph: &Graph, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "p edge {} {}", graph.n_vertices(), graph.n_edges())?;
    for e in graph.edges() {
        writeln!(writer, "e {} {} {}", e.u, e.v, e.weight)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{parse, parse_edge_list, parse_matrix, write_edge_list, Error, FileFormat};
    use crate::graph::InputError;

    #[test]
    fn edge_list() {
        let data = "c small example\np edge 4 3\ne 0 1 5\n\ne 1 2 3\nc between\ne 3 2 1\n";
        let graph = parse_edge_list(data.as_bytes()).unwrap();
        assert_eq!(graph.n_vertices(), 4);
        assert_eq!(graph.n_edges(), 3);
        assert_eq!(graph.edge(2, 3).map(|e| e.weight), Some(1));
    }

    #[test]
    fn edge_list_errors() {
        let err = parse_edge_list("p edge 3 1\ne 0 3 1\n".as_bytes()).unwrap_err();
        assert_eq!(err.downcast_ref(), Some(&InputError::UnknownVertex(3)));
        let err = parse_edge_list("p edge 3 2\ne 0 1 1\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref(),
            Some(&Error::Parse { line: 1, .. })
        ));
        let err = parse_edge_list("p edge 3 1\ne 0 1 x\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref(),
            Some(&Error::Parse { line: 2, .. })
        ));
        let err = parse_edge_list("p edge 3 1\ne 0 1 0\n".as_bytes()).unwrap_err();
        assert_eq!(
            err.downcast_ref(),
            Some(&InputError::NonPositiveWeight(0, 1))
        );
    }

    #[test]
    fn oversized_headers() {
        let err = parse_edge_list("p edge 4000000000 0\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref(),
            Some(&Error::Parse { line: 1, .. })
        ));
        let err = parse_edge_list("p edge 3 4\ne 0 1 1\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref(),
            Some(&Error::Parse { line: 1, .. })
        ));
        let err = parse_matrix("18446744073709551615\n0 1\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref(),
            Some(&Error::Parse { line: 1, .. })
        ));
        // a complete header is still accepted
        let graph = parse_edge_list("p edge 3 3\ne 0 1 1\ne 1 2 1\ne 0 2 1\n".as_bytes()).unwrap();
        assert!(graph.is_complete());
    }

    #[test]
    fn matrix() {
        let data = "3\n0 4 2\n4 0 7\n2 7 0\n";
        let graph = parse_matrix(data.as_bytes()).unwrap();
        assert!(graph.is_complete());
        assert_eq!(graph.edge(1, 2).map(|e| e.weight), Some(7));
        let err = parse_matrix("3\n0 4 2\n4 0 7\n2 6 0\n".as_bytes()).unwrap_err();
        assert!(matches!(err.downcast_ref(), Some(&Error::Parse { .. })));
        let err = parse_matrix("3\n0 4 2\n4 0 7\n".as_bytes()).unwrap_err();
        assert!(matches!(err.downcast_ref(), Some(&Error::Parse { .. })));
    }

    #[test]
    fn infer_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let graph = parse_matrix("3\n0 4 2\n4 0 7\n2 7 0\n".as_bytes()).unwrap();
        let path = dir.path().join("tri.graph");
        let mut file = std::fs::File::create(&path).unwrap();
        write_edge_list(&graph, &mut file).unwrap();
        file.flush().unwrap();
        assert_eq!(parse(&path, FileFormat::Infer).unwrap(), graph);

        let err = parse(dir.path().join("tri.txt"), FileFormat::Infer).unwrap_err();
        assert!(matches!(
            err.downcast_ref(),
            Some(&Error::UnknownFileExtension(_))
        ));
        let err = parse(dir.path().join("tri"), FileFormat::Infer).unwrap_err();
        assert_eq!(err.downcast_ref(), Some(&Error::NoFileExtension));
    }
}
