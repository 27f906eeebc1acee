#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use linkpath::graph::{derive_backward_edges, write_graph_file};
use linkpath::{MetadataWriter, PageId, Reader};

/// Writes a graph file plus metadata database into a fresh temp
/// directory and returns the directory (which owns the files) and the
/// graph path.
pub fn build_fixture(
    forward: &[Vec<PageId>],
    pages: &[(PageId, &str)],
    links: &[(PageId, PageId, Option<&str>)],
) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let graph_path = dir.path().join("wiki.graph");
    let backward = derive_backward_edges(forward);
    write_graph_file(&graph_path, forward, &backward).unwrap();

    let writer = MetadataWriter::create(&dir.path().join("wiki.metadata")).unwrap();
    writer.begin().unwrap();
    for &(id, title) in pages {
        writer.insert_page(id, title).unwrap();
    }
    for &(from, to, title) in links {
        writer.insert_link(from, to, title).unwrap();
    }
    writer.commit().unwrap();

    (dir, graph_path)
}

/// Opens a [`Reader`] over a fixture whose metadata is generated from the
/// adjacency: page `v` is titled `"Page <v>"` and links carry no display
/// title.
pub fn open_plain_fixture(forward: &[Vec<PageId>]) -> (TempDir, Reader) {
    let titles: Vec<String> = (0..forward.len())
        .map(|v| format!("Page {v}"))
        .collect();
    let pages: Vec<(PageId, &str)> = (1..forward.len())
        .map(|v| (v as PageId, titles[v].as_str()))
        .collect();
    let links: Vec<(PageId, PageId, Option<&str>)> = forward
        .iter()
        .enumerate()
        .flat_map(|(v, adjacency)| {
            adjacency
                .iter()
                .map(move |&w| (v as PageId, w, None))
        })
        .collect();
    let (dir, graph_path) = build_fixture(forward, &pages, &links);
    let reader = Reader::open(&graph_path).unwrap();
    (dir, reader)
}

/// The end-to-end scenario graph: 1->2, 1->3, 2->4, 3->4, 4->5, 4->6,
/// 5->6 (vertex 0 is the reserved sentinel).
pub fn scenario_graph() -> Vec<Vec<PageId>> {
    vec![
        vec![],
        vec![2, 3],
        vec![4],
        vec![4],
        vec![5, 6],
        vec![6],
        vec![],
    ]
}

/// Generates a random sparse digraph with `vertex_count` vertices
/// (including the sentinel), sorted and deduplicated, without self-loops.
pub fn random_graph(rng: &mut StdRng, vertex_count: usize, avg_degree: usize) -> Vec<Vec<PageId>> {
    let mut forward: Vec<Vec<PageId>> = vec![Vec::new(); vertex_count];
    for (v, adjacency) in forward.iter_mut().enumerate().skip(1) {
        let degree = rng.gen_range(0..=avg_degree * 2);
        for _ in 0..degree {
            let w = rng.gen_range(1..vertex_count) as PageId;
            if w as usize != v {
                adjacency.push(w);
            }
        }
        adjacency.sort_unstable();
        adjacency.dedup();
    }
    forward
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Straightforward single-direction BFS, used to cross-check the
/// bidirectional search. Returns the distance in edges, or None if
/// `finish` is unreachable.
pub fn naive_bfs_distance(
    forward: &[Vec<PageId>],
    start: PageId,
    finish: PageId,
) -> Option<usize> {
    let mut dist = vec![usize::MAX; forward.len()];
    let mut queue = VecDeque::new();
    dist[start as usize] = 0;
    queue.push_back(start);
    while let Some(v) = queue.pop_front() {
        if v == finish {
            return Some(dist[v as usize]);
        }
        for &w in &forward[v as usize] {
            if dist[w as usize] == usize::MAX {
                dist[w as usize] = dist[v as usize] + 1;
                queue.push_back(w);
            }
        }
    }
    None
}
