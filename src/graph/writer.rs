use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::graph::header::Header;
use crate::PageId;

/// Writes a graph file from per-vertex adjacency lists.
///
/// `forward[v]` and `backward[v]` are the outgoing and incoming neighbors
/// of vertex `v`; both vectors include the reserved vertex 0, whose
/// adjacency must be empty. Every list must be sorted ascending and
/// deduplicated, and the total forward degree must equal the total
/// backward degree. These are contract violations, not runtime errors, so
/// they panic.
pub fn write_graph_file(
    path: &Path,
    forward: &[Vec<PageId>],
    backward: &[Vec<PageId>],
) -> Result<()> {
    assert_eq!(forward.len(), backward.len());
    assert!(!forward.is_empty(), "graph must include the sentinel vertex");
    assert!(forward[0].is_empty() && backward[0].is_empty());

    let edge_count = count_edges(forward);
    assert_eq!(edge_count, count_edges(backward));
    let edge_count = u32::try_from(edge_count).expect("edge count exceeds u32");
    let vertex_count = u32::try_from(forward.len()).expect("vertex count exceeds u32");

    for adjacency in forward.iter().chain(backward.iter()) {
        assert!(
            adjacency.windows(2).all(|w| w[0] < w[1]),
            "adjacency lists must be sorted and deduplicated"
        );
        assert!(
            adjacency.first() != Some(&0),
            "vertex 0 must not appear as a neighbor"
        );
    }

    let mut out = BufWriter::new(File::create(path)?);
    let header = Header {
        vertex_count,
        edge_count,
    };
    out.write_all(&header.encode())?;
    write_csr_block(&mut out, forward)?;
    write_csr_block(&mut out, backward)?;
    out.flush()?;
    Ok(())
}

/// Derives the backward adjacency from a forward adjacency, sorted
/// ascending per vertex.
pub fn derive_backward_edges(forward: &[Vec<PageId>]) -> Vec<Vec<PageId>> {
    let mut backward = vec![Vec::new(); forward.len()];
    for (v, adjacency) in forward.iter().enumerate() {
        for &w in adjacency {
            backward[w as usize].push(v as PageId);
        }
    }
    // Vertices were visited in ascending order, so each list is already
    // sorted, but sort anyway to keep the invariant local.
    for adjacency in &mut backward {
        adjacency.sort_unstable();
    }
    backward
}

fn count_edges(edge_lists: &[Vec<PageId>]) -> u64 {
    edge_lists.iter().map(|adjacency| adjacency.len() as u64).sum()
}

fn write_csr_block<W: Write>(out: &mut W, edge_lists: &[Vec<PageId>]) -> Result<()> {
    let mut offset = 0u32;
    for adjacency in edge_lists {
        out.write_all(&offset.to_le_bytes())?;
        offset += adjacency.len() as u32;
    }
    out.write_all(&offset.to_le_bytes())?;
    for adjacency in edge_lists {
        for &w in adjacency {
            out.write_all(&w.to_le_bytes())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::header::{GRAPH_MAGIC, HEADER_LEN};
    use tempfile::NamedTempFile;

    #[test]
    fn writes_expected_layout() {
        let forward = vec![vec![], vec![2], vec![]];
        let backward = derive_backward_edges(&forward);
        let tmp = NamedTempFile::new().unwrap();
        write_graph_file(tmp.path(), &forward, &backward).unwrap();

        let data = std::fs::read(tmp.path()).unwrap();
        assert_eq!(data.len(), HEADER_LEN + 4 * (4 + 1) + 4 * (4 + 1));

        let words: Vec<u32> = data
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(words[0], GRAPH_MAGIC);
        assert_eq!(words[1], 0);
        assert_eq!(words[2], 3); // vertex count
        assert_eq!(words[3], 1); // edge count
        assert_eq!(&words[4..8], &[0, 0, 1, 1]); // forward index
        assert_eq!(words[8], 2); // forward edges
        assert_eq!(&words[9..13], &[0, 0, 0, 1]); // backward index
        assert_eq!(words[13], 1); // backward edges
    }

    #[test]
    fn derives_backward_adjacency() {
        let forward = vec![vec![], vec![2, 3], vec![3], vec![]];
        let backward = derive_backward_edges(&forward);
        assert_eq!(backward, vec![vec![], vec![], vec![1], vec![1, 2]]);
    }

    #[test]
    #[should_panic(expected = "sorted and deduplicated")]
    fn rejects_unsorted_adjacency() {
        let forward = vec![vec![], vec![3, 2], vec![], vec![]];
        let backward = vec![vec![], vec![], vec![1], vec![1]];
        let tmp = NamedTempFile::new().unwrap();
        let _ = write_graph_file(tmp.path(), &forward, &backward);
    }
}
