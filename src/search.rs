use std::time::Instant;

use tracing::warn;

use crate::graph::GraphReader;
use crate::PageId;

/// Counters filled in by a search when requested. Collection is free when
/// not requested: the searches are generic over the collector, so the
/// no-op variant compiles down to nothing in the hot loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub vertices_reached: i64,
    pub vertices_expanded: i64,
    pub edges_expanded: i64,
    pub time_taken_ms: i64,
}

trait StatsCollector {
    fn vertex_reached(&mut self);
    fn vertex_expanded(&mut self);
    fn edge_expanded(&mut self);
}

struct NoopStatsCollector;

impl StatsCollector for NoopStatsCollector {
    #[inline(always)]
    fn vertex_reached(&mut self) {}
    #[inline(always)]
    fn vertex_expanded(&mut self) {}
    #[inline(always)]
    fn edge_expanded(&mut self) {}
}

/// Accumulates counters locally and writes them (plus the elapsed time)
/// to the output struct when dropped.
struct CountingStatsCollector<'a> {
    out: &'a mut SearchStats,
    vertices_reached: i64,
    vertices_expanded: i64,
    edges_expanded: i64,
    start_time: Instant,
}

impl<'a> CountingStatsCollector<'a> {
    fn new(out: &'a mut SearchStats) -> Self {
        Self {
            out,
            vertices_reached: 0,
            vertices_expanded: 0,
            edges_expanded: 0,
            start_time: Instant::now(),
        }
    }
}

impl StatsCollector for CountingStatsCollector<'_> {
    #[inline(always)]
    fn vertex_reached(&mut self) {
        self.vertices_reached += 1;
    }
    #[inline(always)]
    fn vertex_expanded(&mut self) {
        self.vertices_expanded += 1;
    }
    #[inline(always)]
    fn edge_expanded(&mut self) {
        self.edges_expanded += 1;
    }
}

impl Drop for CountingStatsCollector<'_> {
    fn drop(&mut self) {
        *self.out = SearchStats {
            vertices_reached: self.vertices_reached,
            vertices_expanded: self.vertices_expanded,
            edges_expanded: self.edges_expanded,
            time_taken_ms: self.start_time.elapsed().as_millis() as i64,
        };
    }
}

/// Finds a single shortest path from `start` to `finish` using
/// bidirectional breadth-first search.
///
/// Returns the path as page ids, including both endpoints, or an empty
/// vector if no path exists. If `stats` is given, search statistics are
/// written to it.
pub fn find_shortest_path(
    graph: &GraphReader,
    start: PageId,
    finish: PageId,
    stats: Option<&mut SearchStats>,
) -> Vec<PageId> {
    match stats {
        None => find_shortest_path_impl(graph, start, finish, NoopStatsCollector),
        Some(out) => find_shortest_path_impl(graph, start, finish, CountingStatsCollector::new(out)),
    }
}

fn find_shortest_path_impl<S: StatsCollector>(
    graph: &GraphReader,
    start: PageId,
    finish: PageId,
    mut stats: S,
) -> Vec<PageId> {
    let size = graph.vertex_count();
    // The complement encoding below needs the top bit free.
    debug_assert!(!size > size);
    assert!(start < size && finish < size);

    if start == finish {
        stats.vertex_reached();
        return vec![start];
    }

    // For each vertex, visited[v] can be:
    //
    //   0             if the vertex is unvisited
    //   u,  u < size  if the vertex was reached via a forward edge from u
    //   !u, u < size  if the vertex was reached via a backward edge from u
    let mut visited = vec![0u32; size as usize];

    let mut forward_fringe = Vec::new();
    let mut backward_fringe = Vec::new();
    visited[start as usize] = start;
    visited[finish as usize] = !finish;
    forward_fringe.push(start);
    backward_fringe.push(finish);
    stats.vertex_reached();
    stats.vertex_reached();

    while !forward_fringe.is_empty() && !backward_fringe.is_empty() {
        if forward_fringe.len() <= backward_fringe.len() {
            // Expand the forward fringe.
            let mut new_fringe = Vec::new();
            for &i in &forward_fringe {
                stats.vertex_expanded();
                for &j in graph.forward_edges(i) {
                    stats.edge_expanded();
                    if visited[j as usize] == 0 {
                        stats.vertex_reached();
                        visited[j as usize] = i;
                        new_fringe.push(j);
                    } else if !visited[j as usize] < size {
                        return reconstruct_path(&visited, start, finish, i, j);
                    } else {
                        debug_assert!(visited[j as usize] < size);
                    }
                }
            }
            forward_fringe = new_fringe;
        } else {
            // Expand the backward fringe.
            let mut new_fringe = Vec::new();
            for &j in &backward_fringe {
                stats.vertex_expanded();
                for &i in graph.backward_edges(j) {
                    stats.edge_expanded();
                    if visited[i as usize] == 0 {
                        stats.vertex_reached();
                        visited[i as usize] = !j;
                        new_fringe.push(i);
                    } else if visited[i as usize] < size {
                        return reconstruct_path(&visited, start, finish, i, j);
                    } else {
                        debug_assert!(!visited[i as usize] < size);
                    }
                }
            }
            backward_fringe = new_fringe;
        }
    }
    Vec::new() // no path found
}

/// Reconstructs the path from `start` to `finish`, assuming there is an
/// edge `(i, j)`, a forward path from `start` to `i`, and a backward path
/// from `j` to `finish`.
fn reconstruct_path(
    visited: &[u32],
    start: PageId,
    finish: PageId,
    mut i: PageId,
    mut j: PageId,
) -> Vec<PageId> {
    let mut path = Vec::new();
    while i != start {
        path.push(i);
        i = visited[i as usize];
    }
    path.push(start);
    path.reverse();
    while j != finish {
        path.push(j);
        j = !visited[j as usize];
    }
    path.push(finish);
    path
}

/// Finds all shortest paths from `start` to `finish` and returns them as
/// a DAG: a sorted list of `(source, destination)` pairs in which `start`
/// is the unique source and `finish` the unique sink.
///
/// Returns `None` if no path exists; the contained vector is empty only
/// when `start == finish` (a single trivial path).
///
/// Distances are tracked in 8 bits, with the forward layers counted up
/// from 1 and the backward layers counted down from 255, so only paths of
/// at most 254 edges can be found. Real-world link graphs stay far below
/// that; when the budget is exceeded the search logs a warning and
/// reports "no path".
pub fn find_shortest_path_dag(
    graph: &GraphReader,
    start: PageId,
    finish: PageId,
    stats: Option<&mut SearchStats>,
) -> Option<Vec<(PageId, PageId)>> {
    match stats {
        None => find_shortest_path_dag_impl(graph, start, finish, NoopStatsCollector),
        Some(out) => {
            find_shortest_path_dag_impl(graph, start, finish, CountingStatsCollector::new(out))
        }
    }
}

fn find_shortest_path_dag_impl<S: StatsCollector>(
    graph: &GraphReader,
    start: PageId,
    finish: PageId,
    mut stats: S,
) -> Option<Vec<(PageId, PageId)>> {
    // All edges that occur on a shortest path from `start` to `finish`.
    let mut edges: Vec<(PageId, PageId)> = Vec::new();

    assert!(start < graph.vertex_count() && finish < graph.vertex_count());

    if start == finish {
        stats.vertex_reached();
        return Some(edges);
    }

    // dist[v] == 0 means the distance of v is not yet known. Values
    // 1..=forward_dist are layers counted from `start`; values
    // backward_dist..=255 are layers counted from `finish`. The two
    // ranges cannot collide because the overflow check below keeps a gap
    // between them.
    let mut dist = vec![0u8; graph.vertex_count() as usize];

    // Vertices known to lie on a shortest path whose predecessors
    // (respectively successors) still have to be added to the DAG.
    let mut propagate_forward: Vec<PageId> = Vec::new();
    let mut propagate_backward: Vec<PageId> = Vec::new();

    // marked[v] is true iff v is start, finish, or an element of
    // propagate_forward or propagate_backward.
    let mut marked = vec![false; graph.vertex_count() as usize];
    marked[start as usize] = true;
    marked[finish as usize] = true;

    // Bidirectional search for the distances and the meeting edges.
    {
        let mut forward_fringe: Vec<PageId> = Vec::new();
        let mut backward_fringe: Vec<PageId> = Vec::new();
        let mut forward_dist: u8 = 1;
        let mut backward_dist: u8 = u8::MAX;
        dist[start as usize] = forward_dist;
        dist[finish as usize] = backward_dist;
        forward_fringe.push(start);
        backward_fringe.push(finish);
        stats.vertex_reached();
        stats.vertex_reached();

        while edges.is_empty() {
            if backward_dist - forward_dist < 2 {
                // The path length does not fit in the distance type. This
                // does not happen in real-world graphs, where the longest
                // shortest path is far below the maximum of 254 edges.
                warn!("path length exceeds the distance budget");
                return None;
            }
            if forward_fringe.is_empty() || backward_fringe.is_empty() {
                return None; // no path exists
            }
            if forward_fringe.len() <= backward_fringe.len() {
                // Expand the forward fringe.
                forward_dist += 1;
                let mut new_fringe = Vec::new();
                for &v in &forward_fringe {
                    stats.vertex_expanded();
                    debug_assert_eq!(dist[v as usize], forward_dist - 1);
                    for &w in graph.forward_edges(v) {
                        stats.edge_expanded();
                        if dist[w as usize] == 0 {
                            // w is an unvisited successor of v.
                            stats.vertex_reached();
                            dist[w as usize] = forward_dist;
                            if edges.is_empty() {
                                new_fringe.push(w);
                            }
                        } else if forward_dist < dist[w as usize] {
                            // w lies in the backward layers, so there is
                            // a minimum-length path containing v->w.
                            edges.push((v, w));
                            if !marked[v as usize] {
                                marked[v as usize] = true;
                                propagate_backward.push(v);
                            }
                            if !marked[w as usize] {
                                marked[w as usize] = true;
                                propagate_forward.push(w);
                            }
                        } else {
                            debug_assert!(dist[w as usize] <= forward_dist);
                        }
                    }
                }
                forward_fringe = new_fringe;
            } else {
                // Expand the backward fringe.
                backward_dist -= 1;
                let mut new_fringe = Vec::new();
                for &w in &backward_fringe {
                    stats.vertex_expanded();
                    debug_assert_eq!(dist[w as usize], backward_dist + 1);
                    for &v in graph.backward_edges(w) {
                        stats.edge_expanded();
                        if dist[v as usize] == 0 {
                            // v is an unvisited predecessor of w.
                            stats.vertex_reached();
                            dist[v as usize] = backward_dist;
                            if edges.is_empty() {
                                new_fringe.push(v);
                            }
                        } else if dist[v as usize] < backward_dist {
                            // v lies in the forward layers, so there is a
                            // minimum-length path containing v->w.
                            edges.push((v, w));
                            if !marked[w as usize] {
                                marked[w as usize] = true;
                                propagate_forward.push(w);
                            }
                            if !marked[v as usize] {
                                marked[v as usize] = true;
                                propagate_backward.push(v);
                            }
                        } else {
                            debug_assert!(dist[v as usize] >= backward_dist);
                        }
                    }
                }
                backward_fringe = new_fringe;
            }
        }
    }

    // Collect the remaining DAG edges by walking from the meeting points
    // toward start (through predecessors) and finish (through
    // successors). Each vertex is enqueued at most once, so this is
    // linear in the size of the DAG.
    let mut i = 0;
    while i < propagate_backward.len() {
        let w = propagate_backward[i];
        i += 1;
        for &v in graph.backward_edges(w) {
            // Widen before adding: dist[v] may be 255 (the finish layer).
            if u32::from(dist[v as usize]) + 1 == u32::from(dist[w as usize]) {
                edges.push((v, w));
                if !marked[v as usize] {
                    marked[v as usize] = true;
                    propagate_backward.push(v);
                }
            }
        }
    }

    let mut i = 0;
    while i < propagate_forward.len() {
        let v = propagate_forward[i];
        i += 1;
        for &w in graph.forward_edges(v) {
            if u32::from(dist[v as usize]) + 1 == u32::from(dist[w as usize]) {
                edges.push((v, w));
                if !marked[w as usize] {
                    marked[w as usize] = true;
                    propagate_forward.push(w);
                }
            }
        }
    }

    edges.sort_unstable();

    Some(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{derive_backward_edges, write_graph_file};
    use tempfile::NamedTempFile;

    fn open_graph(forward: Vec<Vec<PageId>>) -> (NamedTempFile, GraphReader) {
        let backward = derive_backward_edges(&forward);
        let tmp = NamedTempFile::new().unwrap();
        write_graph_file(tmp.path(), &forward, &backward).unwrap();
        let reader = GraphReader::open(tmp.path()).unwrap();
        (tmp, reader)
    }

    // The scenario graph: 1->2, 1->3, 2->4, 3->4, 4->5, 4->6, 5->6.
    fn scenario_graph() -> Vec<Vec<PageId>> {
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

    #[test]
    fn single_path_in_scenario_graph() {
        let (_tmp, graph) = open_graph(scenario_graph());
        let path = find_shortest_path(&graph, 1, 6, None);
        assert!(path == vec![1, 2, 4, 6] || path == vec![1, 3, 4, 6]);
    }

    #[test]
    fn no_path_against_edge_direction() {
        let (_tmp, graph) = open_graph(scenario_graph());
        assert!(find_shortest_path(&graph, 6, 1, None).is_empty());
        assert_eq!(find_shortest_path_dag(&graph, 6, 1, None), None);
    }

    #[test]
    fn start_equals_finish() {
        let (_tmp, graph) = open_graph(scenario_graph());
        assert_eq!(find_shortest_path(&graph, 3, 3, None), vec![3]);
        assert_eq!(find_shortest_path_dag(&graph, 3, 3, None), Some(vec![]));
    }

    #[test]
    fn dag_excludes_longer_paths() {
        let (_tmp, graph) = open_graph(scenario_graph());
        let dag = find_shortest_path_dag(&graph, 1, 6, None).unwrap();
        // The path through 5 has length 5 and must not appear.
        assert_eq!(dag, vec![(1, 2), (1, 3), (2, 4), (3, 4), (4, 6)]);
    }

    #[test]
    fn dag_of_adjacent_pages() {
        let (_tmp, graph) = open_graph(scenario_graph());
        let dag = find_shortest_path_dag(&graph, 1, 2, None).unwrap();
        assert_eq!(dag, vec![(1, 2)]);
    }

    #[test]
    fn stats_are_identical_with_and_without_collection() {
        let (_tmp, graph) = open_graph(scenario_graph());
        let mut stats = SearchStats::default();
        let with_stats = find_shortest_path(&graph, 1, 6, Some(&mut stats));
        let without_stats = find_shortest_path(&graph, 1, 6, None);
        assert_eq!(with_stats, without_stats);
        assert!(stats.vertices_reached > 0);
        assert!(stats.vertices_expanded > 0);
        assert!(stats.edges_expanded > 0);
    }
}
