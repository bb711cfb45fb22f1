// SPDX-License-Identifier: MIT

use super::SearchStats;
use crate::store::StoreError;

/// Error conditions which may occur while resolving or executing a routing
/// query.
///
/// All conditions are raised synchronously at the point of detection and
/// propagate to the caller; the engine only retries internally for the
/// adaptive-radius lookup and for [BestGroup](super::GroupPolicy::BestGroup)
/// reconciliation. Callers decide whether to surface the failure or retry
/// with an adjusted [RoutingConfig](super::RoutingConfig).
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// The nearest-link lookup exhausted the maximum search radius.
    #[error("no links found within {radius} m of ({x}, {y})")]
    NoLinksFound { x: f64, y: f64, radius: f64 },

    /// The query points resolved to disconnected network groups and the
    /// policy was [OnlySame](super::GroupPolicy::OnlySame).
    #[error("search points lie in disconnected network groups ({0} and {1})")]
    DifferentGroups(i32, i32),

    /// A textual group-handling policy was not recognized.
    #[error("unrecognized group handling policy {0:?}")]
    MissingGroupHandling(String),

    /// A textual algorithm selector was not recognized.
    #[error("unrecognized algorithm {0:?}")]
    UnknownAlgorithm(String),

    /// Both query points are the same position.
    #[error("the search points are identical")]
    IdenticalSearchPoints,

    /// Both query points project onto the same position of the same link.
    #[error("source and target resolve to the same position on link {0}")]
    IdenticalSourceAndTarget(i32),

    /// [search_radius_increment](super::RoutingConfig::search_radius_increment)
    /// does not guarantee lookup termination.
    #[error("search radius increment must be greater than 1, got {0}")]
    InvalidRadiusIncrement(f64),

    /// A query point's position along its link is outside `[0, 1]`.
    #[error("overload cost factor must lie within [0, 1], got {0}")]
    InvalidCostFactor(f64),

    /// The start or target vertex does not exist in the graph.
    #[error("vertex {0} does not exist in the graph")]
    UnknownVertex(i32),

    /// A referenced link does not exist in the network.
    #[error("link {0} does not exist in the network")]
    UnknownLink(i32),

    /// The graph search terminated without reaching the target.
    #[error("no route found: {0}")]
    NoRouteFound(SearchStats),

    /// Cutting removed every link of the found path.
    #[error("route is empty after cutting")]
    EmptyRoute,

    /// Lazy geometry loading or network storage failed.
    #[error("store: {0}")]
    Store(#[from] StoreError),
}
