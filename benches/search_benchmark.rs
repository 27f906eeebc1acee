use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::NamedTempFile;

use linkpath::graph::{derive_backward_edges, write_graph_file, GraphReader};
use linkpath::{find_shortest_path, find_shortest_path_dag, PageId};

/// Builds a random sparse graph on disk and opens it, returning the file
/// guard together with the reader.
fn setup_random_graph(vertex_count: usize, avg_degree: usize) -> (NamedTempFile, GraphReader) {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut forward: Vec<Vec<PageId>> = vec![Vec::new(); vertex_count];
    for (v, adjacency) in forward.iter_mut().enumerate().skip(1) {
        let degree = rng.gen_range(1..=avg_degree * 2);
        for _ in 0..degree {
            let w = rng.gen_range(1..vertex_count) as PageId;
            if w as usize != v {
                adjacency.push(w);
            }
        }
        adjacency.sort_unstable();
        adjacency.dedup();
    }
    let backward = derive_backward_edges(&forward);

    let tmp = NamedTempFile::new().unwrap();
    write_graph_file(tmp.path(), &forward, &backward).unwrap();
    let reader = GraphReader::open(tmp.path()).unwrap();
    (tmp, reader)
}

fn bench_single_path(c: &mut Criterion) {
    let (_tmp, graph) = setup_random_graph(50_000, 8);
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("find_shortest_path/random_pairs", |b| {
        b.iter(|| {
            let start = rng.gen_range(1..graph.vertex_count());
            let finish = rng.gen_range(1..graph.vertex_count());
            black_box(find_shortest_path(&graph, start, finish, None))
        })
    });
}

fn bench_dag(c: &mut Criterion) {
    let (_tmp, graph) = setup_random_graph(50_000, 8);
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("find_shortest_path_dag/random_pairs", |b| {
        b.iter(|| {
            let start = rng.gen_range(1..graph.vertex_count());
            let finish = rng.gen_range(1..graph.vertex_count());
            black_box(find_shortest_path_dag(&graph, start, finish, None))
        })
    });
}

criterion_group!(benches, bench_single_path, bench_dag);
criterion_main!(benches);
