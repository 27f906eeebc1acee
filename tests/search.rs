mod common;

use common::{naive_bfs_distance, open_plain_fixture, random_graph, scenario_graph, seeded_rng};
use linkpath::{find_shortest_path, find_shortest_path_dag, PageId};
use rand::Rng;

#[test]
fn scenario_single_path() {
    let (_dir, reader) = open_plain_fixture(&scenario_graph());
    let path = find_shortest_path(reader.graph(), 1, 6, None);
    assert!(path == vec![1, 2, 4, 6] || path == vec![1, 3, 4, 6]);
}

#[test]
fn scenario_dag_edges() {
    let (_dir, reader) = open_plain_fixture(&scenario_graph());
    let dag = find_shortest_path_dag(reader.graph(), 1, 6, None).unwrap();
    // (4,5) and (5,6) are excluded: the path through 5 has length 5.
    assert_eq!(dag, vec![(1, 2), (1, 3), (2, 4), (3, 4), (4, 6)]);
}

#[test]
fn scenario_reverse_direction_has_no_path() {
    let (_dir, reader) = open_plain_fixture(&scenario_graph());
    assert!(find_shortest_path(reader.graph(), 6, 1, None).is_empty());
    assert_eq!(find_shortest_path_dag(reader.graph(), 6, 1, None), None);
}

#[test]
fn start_equals_finish_is_a_trivial_path() {
    let (_dir, reader) = open_plain_fixture(&scenario_graph());
    assert_eq!(find_shortest_path(reader.graph(), 5, 5, None), vec![5]);
    assert_eq!(
        find_shortest_path_dag(reader.graph(), 5, 5, None),
        Some(vec![])
    );
}

#[test]
fn disconnected_vertices_have_no_path() {
    // 5 is isolated from 1.
    let forward = vec![vec![], vec![2], vec![], vec![], vec![], vec![]];
    let (_dir, reader) = open_plain_fixture(&forward);
    assert!(find_shortest_path(reader.graph(), 1, 5, None).is_empty());
    assert_eq!(find_shortest_path_dag(reader.graph(), 1, 5, None), None);
}

fn is_edge(forward: &[Vec<PageId>], v: PageId, w: PageId) -> bool {
    forward[v as usize].binary_search(&w).is_ok()
}

#[test]
fn matches_naive_bfs_on_random_graphs() {
    let mut rng = seeded_rng(7);
    for _ in 0..20 {
        let forward = random_graph(&mut rng, 40, 3);
        let (_dir, reader) = open_plain_fixture(&forward);
        for _ in 0..25 {
            let start = rng.gen_range(1..forward.len()) as PageId;
            let finish = rng.gen_range(1..forward.len()) as PageId;

            let expected = naive_bfs_distance(&forward, start, finish);
            let path = find_shortest_path(reader.graph(), start, finish, None);

            match expected {
                None => assert!(path.is_empty(), "{start}->{finish} must be unreachable"),
                Some(distance) => {
                    assert_eq!(path.len(), distance + 1, "{start}->{finish} length");
                    assert_eq!(path[0], start);
                    assert_eq!(*path.last().unwrap(), finish);
                    for pair in path.windows(2) {
                        assert!(is_edge(&forward, pair[0], pair[1]));
                    }
                }
            }
        }
    }
}

#[test]
fn dag_edges_lie_on_shortest_paths() {
    let mut rng = seeded_rng(11);
    for _ in 0..10 {
        let forward = random_graph(&mut rng, 30, 3);
        let (_dir, reader) = open_plain_fixture(&forward);
        for _ in 0..10 {
            let start = rng.gen_range(1..forward.len()) as PageId;
            let finish = rng.gen_range(1..forward.len()) as PageId;
            if start == finish {
                continue;
            }

            let Some(dag) = find_shortest_path_dag(reader.graph(), start, finish, None) else {
                assert_eq!(naive_bfs_distance(&forward, start, finish), None);
                continue;
            };
            let total = naive_bfs_distance(&forward, start, finish).unwrap();

            // dist(start,u) + 1 + dist(v,finish) == dist(start,finish)
            // for every DAG edge (u,v).
            for &(u, v) in &dag {
                assert!(is_edge(&forward, u, v));
                let to_u = naive_bfs_distance(&forward, start, u).unwrap();
                let from_v = naive_bfs_distance(&forward, v, finish).unwrap();
                assert_eq!(to_u + 1 + from_v, total, "edge ({u},{v})");
            }

            // Every shortest path must be expressible inside the DAG:
            // each of its layers is reachable through DAG edges alone.
            let mut layer: Vec<PageId> = vec![start];
            for _ in 0..total {
                let mut next: Vec<PageId> = dag
                    .iter()
                    .filter(|(u, _)| layer.contains(u))
                    .map(|&(_, v)| v)
                    .collect();
                next.sort_unstable();
                next.dedup();
                assert!(!next.is_empty());
                layer = next;
            }
            assert_eq!(layer, vec![finish]);
        }
    }
}
