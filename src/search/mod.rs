// SPDX-License-Identifier: MIT

//! Bounded shortest-path search over a [GraphView](crate::GraphView).
//!
//! Both algorithms share the queue discipline: a binary heap ordered by
//! running cost (Dijkstra) or cost plus heuristic (A*), ties broken by
//! vertex id so results are deterministic. Every search is bounded by an
//! iteration budget derived from the query geometry and by a wall-clock
//! deadline checked between queue pops.

mod astar;
mod dijkstra;
mod error;

pub use astar::astar;
pub use dijkstra::dijkstra;
pub use error::RoutingError;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::geometry::{manhattan_distance, NearestPointInfo};
use crate::{GraphEdge, Link, Point};

/// Minimum iteration budget, applied when the query points are close
/// together.
const MIN_ITERATIONS: usize = 10_000;

/// Safety factor applied to the manhattan-distance iteration estimate.
const ITERATION_SAFETY_FACTOR: usize = 3;

/// Dijkstra explores omni-directionally and needs far more slack than A*.
const DIJKSTRA_BUDGET_SCALE: usize = 100;

/// Shortest-path algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    Dijkstra,
    #[default]
    AStar,
}

impl FromStr for Algorithm {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(Self::Dijkstra),
            "astar" | "a*" => Ok(Self::AStar),
            _ => Err(RoutingError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// What to do when the two query points resolve to links in disconnected
/// network groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupPolicy {
    /// Fail with [RoutingError::DifferentGroups].
    #[default]
    OnlySame,

    /// Re-resolve one of the entry points in the other one's group,
    /// whichever swap adds the least perpendicular distance.
    BestGroup,
}

impl FromStr for GroupPolicy {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "onlysame" | "only-same" => Ok(Self::OnlySame),
            "bestgroup" | "best-group" => Ok(Self::BestGroup),
            _ => Err(RoutingError::MissingGroupHandling(s.to_string())),
        }
    }
}

/// Immutable per-query routing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    pub algorithm: Algorithm,

    /// Radius of the first nearest-link lookup, in meters.
    pub initial_search_radius: f64,

    /// Factor by which the lookup radius grows after each miss.
    /// Must be greater than 1, otherwise the lookup could never terminate.
    pub search_radius_increment: f64,

    /// Radius beyond which the nearest-link lookup gives up with
    /// [RoutingError::NoLinksFound], in meters.
    pub max_search_radius: f64,

    /// Wall-clock bound for one graph search, checked between queue pops.
    pub max_search_duration: Duration,

    /// Paths whose running cost exceeds this are not explored further;
    /// every skipped relaxation is counted in [SearchStats::above_max_cost].
    pub max_cost: f32,

    pub group_policy: GroupPolicy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            initial_search_radius: 100.0,
            search_radius_increment: 2.0,
            max_search_radius: 10_000.0,
            max_search_duration: Duration::from_secs(10),
            max_cost: f32::INFINITY,
            group_policy: GroupPolicy::default(),
        }
    }
}

impl RoutingConfig {
    /// Rejects configurations which could make a search misbehave.
    /// Called before anything else once per query.
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.search_radius_increment <= 1.0 {
            return Err(RoutingError::InvalidRadiusIncrement(
                self.search_radius_increment,
            ));
        }
        Ok(())
    }
}

/// A resolved query anchor: the original search point, the nearest link
/// and the projection onto it. Ephemeral — consumed by the search and the
/// route post-processing of a single query.
#[derive(Debug, Clone)]
pub struct RoutingPoint {
    pub point: Point,
    pub link: Link,
    pub nearest: NearestPointInfo,
}

/// Why a graph search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    TargetReached,
    QueueExhausted,
    IterationLimit,
    TimeLimit,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetReached => write!(f, "target reached"),
            Self::QueueExhausted => write!(f, "queue exhausted"),
            Self::IterationLimit => write!(f, "iteration limit exceeded"),
            Self::TimeLimit => write!(f, "time limit exceeded"),
        }
    }
}

/// Diagnostic counters of one graph search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    /// Number of vertex expansions performed.
    pub iterations: usize,

    /// Number of relaxations skipped because the running cost exceeded
    /// [RoutingConfig::max_cost].
    pub above_max_cost: usize,

    pub termination: Termination,
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} iterations ({} relaxations above max cost)",
            self.termination, self.iterations, self.above_max_cost
        )
    }
}

/// The raw outcome of a successful graph search, before geometry
/// post-processing.
#[derive(Debug, Clone)]
pub struct GraphPath {
    /// Traversed vertex ids from source to target, including temporary ones.
    pub vertices: Vec<i32>,

    /// Traversed edges; one fewer than `vertices`.
    pub edges: Vec<GraphEdge>,

    /// Total cost of the path.
    pub cost: f64,

    pub stats: SearchStats,
}

/// Resource bounds of one graph search call.
#[derive(Debug, Clone, Copy)]
pub struct SearchBudget {
    pub max_iterations: usize,
    pub max_duration: Duration,
    pub max_cost: f32,
}

impl SearchBudget {
    /// Derives the iteration budget from the manhattan distance between the
    /// query points — a crude but cheap stand-in for the number of vertices
    /// a search may reasonably visit — inflated by a safety factor and
    /// floored for short queries. Dijkstra gets a far larger budget than A*.
    pub fn for_points(
        algorithm: Algorithm,
        from: Point,
        to: Point,
        config: &RoutingConfig,
    ) -> Self {
        let estimate = manhattan_distance(from, to).ceil() as usize;
        let base = estimate
            .saturating_mul(ITERATION_SAFETY_FACTOR)
            .max(MIN_ITERATIONS);
        let max_iterations = match algorithm {
            Algorithm::AStar => base,
            Algorithm::Dijkstra => base.saturating_mul(DIJKSTRA_BUDGET_SCALE),
        };

        Self {
            max_iterations,
            max_duration: config.max_search_duration,
            max_cost: config.max_cost,
        }
    }
}

/// The final outcome of a routing query.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The route as an ordered link sequence, rotated into traversal
    /// direction, with the first and last link cut to the exact query
    /// points.
    pub links: Vec<Link>,

    /// Total length of [links](Self::links), in meters.
    pub route_distance: f64,

    /// [route_distance](Self::route_distance) plus the perpendicular
    /// offsets between the query points and their projections.
    pub total_distance: f64,

    pub stats: SearchStats,
}

/// Entry of the shared search priority queue.
///
/// `score` equals `cost` for Dijkstra and cost plus heuristic for A*.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueueItem {
    pub at: i32,
    pub cost: f32,
    pub score: f32,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.at == other.at
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: Comparison is inverted, as lower scores are considered
        // better ("higher") and Rust's BinaryHeap is a max-heap.
        // Ties go to the lower vertex id, keeping searches deterministic.
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| other.at.cmp(&self.at))
    }
}
