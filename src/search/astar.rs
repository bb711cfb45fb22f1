// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use super::dijkstra::reconstruct;
use super::{GraphPath, QueueItem, RoutingError, SearchBudget, SearchStats, Termination};
use crate::geometry::manhattan_distance;
use crate::{GraphEdge, GraphView, Point};

/// Speed assumed by the A* heuristic, in m/s (140 km/h). Deliberately
/// higher than any realistic travel speed so the heuristic never
/// overestimates the remaining travel time.
const HEURISTIC_SPEED: f64 = 140.0 / 3.6;

/// An optimistic estimate of the remaining cost: manhattan distance to the
/// target at [HEURISTIC_SPEED].
fn heuristic(at: Point, target: Point) -> f32 {
    (manhattan_distance(at, target) / HEURISTIC_SPEED) as f32
}

/// Finds the cheapest path between two vertices with the
/// [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm).
///
/// Identical contract to [dijkstra](super::dijkstra): same termination
/// conditions, same diagnostics, same determinism. The queue is ordered by
/// running cost plus [heuristic] instead of cost alone, which steers the
/// expansion towards the target and allows a much smaller iteration budget.
pub fn astar<G: GraphView>(
    g: &G,
    from: i32,
    to: i32,
    budget: &SearchBudget,
) -> Result<GraphPath, RoutingError> {
    let target = g
        .vertex(to)
        .ok_or(RoutingError::UnknownVertex(to))?
        .location;
    let start = g
        .vertex(from)
        .ok_or(RoutingError::UnknownVertex(from))?
        .location;

    let started = Instant::now();
    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::new();
    let mut came_from: HashMap<i32, GraphEdge> = HashMap::new();
    let mut known_costs: HashMap<i32, f32> = HashMap::new();
    let mut stats = SearchStats {
        iterations: 0,
        above_max_cost: 0,
        termination: Termination::QueueExhausted,
    };

    queue.push(QueueItem {
        at: from,
        cost: 0.0,
        score: heuristic(start, target),
    });
    known_costs.insert(from, 0.0);

    while let Some(item) = queue.pop() {
        if item.at == to {
            stats.termination = Termination::TargetReached;
            return Ok(reconstruct(&came_from, from, to, item.cost, stats));
        }

        // Multiple queue entries may exist for one vertex; skip stale ones.
        if item.cost > known_costs.get(&item.at).copied().unwrap_or(f32::INFINITY) {
            continue;
        }

        stats.iterations += 1;
        if stats.iterations > budget.max_iterations {
            stats.termination = Termination::IterationLimit;
            return Err(RoutingError::NoRouteFound(stats));
        }
        if started.elapsed() >= budget.max_duration {
            stats.termination = Termination::TimeLimit;
            return Err(RoutingError::NoRouteFound(stats));
        }

        for &neighbor in g.neighbors(item.at).iter() {
            let Some(edge) = g.edge(item.at, neighbor) else {
                continue;
            };
            let Some(neighbor_vertex) = g.vertex(neighbor) else {
                continue;
            };

            let neighbor_cost = item.cost + edge.cost;
            if neighbor_cost > budget.max_cost {
                stats.above_max_cost += 1;
                continue;
            }
            if neighbor_cost
                >= known_costs.get(&neighbor).copied().unwrap_or(f32::INFINITY)
            {
                continue;
            }

            came_from.insert(neighbor, edge);
            known_costs.insert(neighbor, neighbor_cost);
            queue.push(QueueItem {
                at: neighbor,
                cost: neighbor_cost,
                score: neighbor_cost + heuristic(neighbor_vertex.location, target),
            });
        }
    }

    Err(RoutingError::NoRouteFound(stats))
}

#[cfg(test)]
mod tests {
    use super::super::dijkstra;
    use super::*;
    use crate::{Link, NetworkGraph};
    use std::time::Duration;

    fn budget() -> SearchBudget {
        SearchBudget {
            max_iterations: 100_000,
            max_duration: Duration::from_secs(1),
            max_cost: f32::INFINITY,
        }
    }

    /// A 5x5 grid of vertices spaced 100 m apart, connected by
    /// bidirectional links costed as travel time at 10 m/s.
    fn grid() -> NetworkGraph {
        let mut links = Vec::new();
        let mut id = 0;
        let vertex = |col: i32, row: i32| row * 5 + col + 100;
        let at = |col: i32, row: i32| Point::new(col as f64 * 100.0, row as f64 * 100.0, 0.0);

        for row in 0..5 {
            for col in 0..5 {
                if col + 1 < 5 {
                    id += 1;
                    links.push(Link::new(
                        id,
                        vertex(col, row),
                        vertex(col + 1, row),
                        vec![at(col, row), at(col + 1, row)],
                        10.0,
                        10.0,
                    ));
                }
                if row + 1 < 5 {
                    id += 1;
                    links.push(Link::new(
                        id,
                        vertex(col, row),
                        vertex(col, row + 1),
                        vec![at(col, row), at(col, row + 1)],
                        10.0,
                        10.0,
                    ));
                }
            }
        }
        NetworkGraph::build(&links)
    }

    #[test]
    fn astar_and_dijkstra_agree_on_cost() {
        let g = grid();
        let b = budget();
        for &(from, to) in &[(100, 124), (102, 120), (110, 114), (100, 101)] {
            let a = astar(&g, from, to, &b).unwrap();
            let d = dijkstra(&g, from, to, &b).unwrap();
            assert!(
                (a.cost - d.cost).abs() < 1e-6,
                "cost mismatch {from}->{to}: astar {} vs dijkstra {}",
                a.cost,
                d.cost
            );
        }
    }

    #[test]
    fn astar_expands_no_more_vertices_than_dijkstra() {
        let g = grid();
        let b = budget();
        let a = astar(&g, 100, 124, &b).unwrap();
        let d = dijkstra(&g, 100, 124, &b).unwrap();
        assert!(
            a.stats.iterations <= d.stats.iterations,
            "astar {} > dijkstra {}",
            a.stats.iterations,
            d.stats.iterations
        );
    }

    #[test]
    fn path_endpoints_match_the_query() {
        let g = grid();
        let path = astar(&g, 100, 124, &budget()).unwrap();
        assert_eq!(*path.vertices.first().unwrap(), 100);
        assert_eq!(*path.vertices.last().unwrap(), 124);
        assert_eq!(path.edges.len(), path.vertices.len() - 1);
    }

    #[test]
    fn missing_target_is_rejected_before_searching() {
        let g = grid();
        assert!(matches!(
            astar(&g, 100, 9999, &budget()),
            Err(RoutingError::UnknownVertex(9999))
        ));
    }
}
