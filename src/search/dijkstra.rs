// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use super::{GraphPath, QueueItem, RoutingError, SearchBudget, SearchStats, Termination};
use crate::{GraphEdge, GraphView};

/// Finds the cheapest path between two vertices with
/// [Dijkstra's algorithm](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm).
///
/// The search stops successfully when the target is popped off the queue,
/// and unsuccessfully when the queue drains, the iteration budget is spent
/// or the wall-clock deadline passes — the returned
/// [NoRouteFound](RoutingError::NoRouteFound) carries the corresponding
/// [Termination] and counters. Relaxations whose running cost exceeds
/// `budget.max_cost` are skipped and counted instead of failing the search.
pub fn dijkstra<G: GraphView>(
    g: &G,
    from: i32,
    to: i32,
    budget: &SearchBudget,
) -> Result<GraphPath, RoutingError> {
    g.vertex(from).ok_or(RoutingError::UnknownVertex(from))?;
    g.vertex(to).ok_or(RoutingError::UnknownVertex(to))?;

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
        score: 0.0,
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
                // Adjacency is undirected; this direction is impassable.
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
                score: neighbor_cost,
            });
        }
    }

    Err(RoutingError::NoRouteFound(stats))
}

/// Walks the `came_from` edges back from the target and reverses the
/// result into source-to-target order.
pub(super) fn reconstruct(
    came_from: &HashMap<i32, GraphEdge>,
    from: i32,
    to: i32,
    cost: f32,
    stats: SearchStats,
) -> GraphPath {
    let mut vertices = vec![to];
    let mut edges = Vec::new();

    let mut at = to;
    while at != from {
        let edge = came_from[&at];
        vertices.push(edge.from);
        edges.push(edge);
        at = edge.from;
    }

    vertices.reverse();
    edges.reverse();
    GraphPath {
        vertices,
        edges,
        cost: cost as f64,
        stats,
    }
}
