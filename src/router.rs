// SPDX-License-Identifier: MIT

//! Point-to-point query driver.
//!
//! One query runs through a fixed pipeline: validate the config, project
//! both points onto their nearest links, reconcile network groups, inject
//! temporary vertices for the exact positions, run the graph search and
//! finally rotate and cut the traversed links into the returned route.

use log::debug;

use crate::geometry::{euclidean_distance, nearest_point_on_polyline, polyline_length};
use crate::route::{find_first_node_id, rotate_and_cut};
use crate::search::{
    astar, dijkstra, Algorithm, GroupPolicy, RoutingConfig, RoutingError, RoutingPoint,
    SearchBudget, SearchResult,
};
use crate::{Link, Network, OverloadedGraph, Overloader, Point};

/// Projections closer together than this are considered the same position,
/// in meters.
const POSITION_EPSILON: f64 = 1e-9;

/// Projects `point` onto the nearest link, growing the lookup radius
/// geometrically until a candidate appears or the maximum radius is
/// exhausted. With `group` set, only links of that network group qualify.
///
/// Among the candidates of one round, the link with the smallest
/// perpendicular distance wins; ties keep the earliest candidate.
pub(crate) fn resolve_point(
    network: &Network,
    point: Point,
    config: &RoutingConfig,
    group: Option<i32>,
) -> Result<RoutingPoint, RoutingError> {
    let spatial = network.spatial()?;
    let mut radius = config.initial_search_radius;

    loop {
        let mut best: Option<RoutingPoint> = None;
        for id in spatial.query(point.x, point.y, radius) {
            let link = network.require_geometry(id)?;
            if group.is_some_and(|g| link.network_group != g) {
                continue;
            }

            let Some(nearest) =
                nearest_point_on_polyline(link.geometry().expect("geometry required above"), point)
            else {
                continue;
            };
            if best
                .as_ref()
                .map_or(true, |b| nearest.distance_from < b.nearest.distance_from)
            {
                best = Some(RoutingPoint {
                    point,
                    link: link.clone(),
                    nearest,
                });
            }
        }

        if let Some(best) = best {
            debug!(
                "resolved ({}, {}) to link {} at {:.1} m (radius {radius} m)",
                point.x, point.y, best.link.id, best.nearest.distance_from
            );
            return Ok(best);
        }
        if radius >= config.max_search_radius {
            return Err(RoutingError::NoLinksFound {
                x: point.x,
                y: point.y,
                radius,
            });
        }
        radius = (radius * config.search_radius_increment).min(config.max_search_radius);
    }
}

/// Applies the configured [GroupPolicy] when the resolved anchors lie in
/// different network groups.
///
/// Under [BestGroup](GroupPolicy::BestGroup), each point is re-resolved
/// restricted to the other one's group and the swap adding the least summed
/// perpendicular distance wins; if neither side can be moved, the query
/// fails as under [OnlySame](GroupPolicy::OnlySame).
fn reconcile_groups(
    network: &Network,
    source: RoutingPoint,
    target: RoutingPoint,
    config: &RoutingConfig,
) -> Result<(RoutingPoint, RoutingPoint), RoutingError> {
    let source_group = source.link.network_group;
    let target_group = target.link.network_group;
    if source_group == target_group {
        return Ok((source, target));
    }

    match config.group_policy {
        GroupPolicy::OnlySame => Err(RoutingError::DifferentGroups(source_group, target_group)),
        GroupPolicy::BestGroup => {
            debug!(
                "anchors in groups {source_group} and {target_group}, trying both alternatives"
            );
            let moved_source = resolve_point(network, source.point, config, Some(target_group));
            let moved_target = resolve_point(network, target.point, config, Some(source_group));

            match (moved_source, moved_target) {
                (Ok(s), Ok(t)) => {
                    let move_source_excess = s.nearest.distance_from + target.nearest.distance_from;
                    let move_target_excess = source.nearest.distance_from + t.nearest.distance_from;
                    if move_source_excess <= move_target_excess {
                        Ok((s, target))
                    } else {
                        Ok((source, t))
                    }
                }
                (Ok(s), Err(_)) => Ok((s, target)),
                (Err(_), Ok(t)) => Ok((source, t)),
                (Err(_), Err(_)) => {
                    Err(RoutingError::DifferentGroups(source_group, target_group))
                }
            }
        }
    }
}

pub(crate) fn search(
    network: &Network,
    from: Point,
    to: Point,
    config: &RoutingConfig,
) -> Result<SearchResult, RoutingError> {
    config.validate()?;
    if from == to {
        return Err(RoutingError::IdenticalSearchPoints);
    }

    let source = resolve_point(network, from, config, None)?;
    let target = resolve_point(network, to, config, None)?;
    let (source, target) = reconcile_groups(network, source, target, config)?;

    let same_link = source.link.id == target.link.id;
    if same_link
        && euclidean_distance(source.nearest.point, target.nearest.point) < POSITION_EPSILON
    {
        return Err(RoutingError::IdenticalSourceAndTarget(source.link.id));
    }

    let source_geometry = source.link.geometry().expect("resolved links have geometry");
    let target_geometry = target.link.geometry().expect("resolved links have geometry");
    let source_factor = factor_along(source_geometry, source.nearest.distance_along);
    let target_factor = factor_along(target_geometry, target.nearest.distance_along);

    let mut overloader = Overloader::new();
    let source_id = overloader.add_source_overload(&source.link, source_geometry, source_factor)?;
    let target_id = overloader.add_target_overload(&target.link, target_geometry, target_factor)?;
    if same_link {
        overloader.connect_same_link(
            source_id,
            target_id,
            &source.link,
            source_factor,
            target_factor,
        );
    }

    let graph = network.graph()?;
    let view = OverloadedGraph::new(graph, &overloader);
    let budget = SearchBudget::for_points(config.algorithm, from, to, config);
    let path = match config.algorithm {
        Algorithm::Dijkstra => dijkstra(&view, source_id.id(), target_id.id(), &budget)?,
        Algorithm::AStar => astar(&view, source_id.id(), target_id.id(), &budget)?,
    };
    debug!("search finished: {}", path.stats);

    // Entering and leaving a link through its temporary vertex produces two
    // consecutive edges with the same link id; the route keeps one copy.
    let mut traversed: Vec<Link> = Vec::with_capacity(path.edges.len());
    for edge in &path.edges {
        if traversed.last().map(|l| l.id) != Some(edge.link_id) {
            traversed.push(network.require_geometry(edge.link_id)?.clone());
        }
    }

    let first_node = find_first_node_id(&traversed, &path.vertices, from, to)
        .ok_or(RoutingError::EmptyRoute)?;
    let cut_from_start = source.nearest.distance_along;
    let cut_from_end = polyline_length(target_geometry) - target.nearest.distance_along;
    let links = rotate_and_cut(&traversed, first_node, cut_from_start, cut_from_end)?;

    let route_distance: f64 = links.iter().filter_map(Link::length).sum();
    let total_distance =
        route_distance + source.nearest.distance_from + target.nearest.distance_from;

    Ok(SearchResult {
        links,
        route_distance,
        total_distance,
        stats: path.stats,
    })
}

/// The fraction of the polyline behind `distance_along`, clamped to `[0, 1]`.
fn factor_along(geometry: &[Point], distance_along: f64) -> f64 {
    let length = polyline_length(geometry);
    if length <= 0.0 {
        0.0
    } else {
        (distance_along / length).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Termination;

    /// A straight west-east chain 10-11-12-13-14 at y=0 plus a detached
    /// island link at y=3000, both costed at 1 per meter.
    fn test_network() -> Network {
        let chain = |id: i32, from: i32, to: i32, x0: f64, x1: f64| {
            Link::new(
                id,
                from,
                to,
                vec![Point::new(x0, 0.0, 0.0), Point::new(x1, 0.0, 0.0)],
                (x1 - x0) as f32,
                (x1 - x0) as f32,
            )
        };
        let mut island = Link::new(
            50,
            20,
            21,
            vec![Point::new(0.0, 3000.0, 0.0), Point::new(400.0, 3000.0, 0.0)],
            400.0,
            400.0,
        );
        island.network_group = -1;

        Network::new(vec![
            chain(1, 10, 11, 0.0, 100.0),
            chain(2, 11, 12, 100.0, 200.0),
            chain(3, 12, 13, 200.0, 300.0),
            chain(4, 13, 14, 300.0, 400.0),
            island,
        ])
    }

    #[test]
    fn routes_between_mid_link_points() {
        let network = test_network();
        let result = network
            .search(
                Point::new(50.0, 10.0, 0.0),
                Point::new(350.0, -5.0, 0.0),
                &RoutingConfig::default(),
            )
            .unwrap();

        assert_eq!(
            result.links.iter().map(|l| l.id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert!((result.route_distance - 300.0).abs() < 1e-6);
        assert!((result.total_distance - 315.0).abs() < 1e-6);
        assert_eq!(result.stats.termination, Termination::TargetReached);

        // The route starts and ends exactly at the projections.
        let first = result.links.first().unwrap().geometry().unwrap()[0];
        let last = *result.links.last().unwrap().geometry().unwrap().last().unwrap();
        assert!((first.x - 50.0).abs() < 1e-6);
        assert!((last.x - 350.0).abs() < 1e-6);
    }

    #[test]
    fn dijkstra_and_astar_agree() {
        let network = test_network();
        let from = Point::new(20.0, 5.0, 0.0);
        let to = Point::new(380.0, 5.0, 0.0);

        let mut config = RoutingConfig::default();
        config.algorithm = Algorithm::AStar;
        let a = network.search(from, to, &config).unwrap();
        config.algorithm = Algorithm::Dijkstra;
        let d = network.search(from, to, &config).unwrap();
        assert!((a.route_distance - d.route_distance).abs() < 1e-6);
    }

    #[test]
    fn same_link_query_yields_a_single_cut_link() {
        let network = test_network();
        let result = network
            .search(
                Point::new(20.0, 5.0, 0.0),
                Point::new(80.0, 5.0, 0.0),
                &RoutingConfig::default(),
            )
            .unwrap();

        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].id, 1);
        assert!((result.route_distance - 60.0).abs() < 1e-6);
    }

    #[test]
    fn same_link_query_against_stored_direction() {
        let network = test_network();
        let result = network
            .search(
                Point::new(80.0, 5.0, 0.0),
                Point::new(20.0, 5.0, 0.0),
                &RoutingConfig::default(),
            )
            .unwrap();

        assert_eq!(result.links.len(), 1);
        assert!((result.route_distance - 60.0).abs() < 1e-6);
        // Geometry runs in traversal direction, east to west.
        let geometry = result.links[0].geometry().unwrap();
        assert!((geometry[0].x - 80.0).abs() < 1e-6);
        assert!((geometry.last().unwrap().x - 20.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_queries_are_rejected() {
        let network = test_network();
        let config = RoutingConfig::default();
        let p = Point::new(50.0, 10.0, 0.0);

        assert!(matches!(
            network.search(p, p, &config),
            Err(RoutingError::IdenticalSearchPoints)
        ));

        // Distinct points projecting onto the same position.
        assert!(matches!(
            network.search(
                Point::new(50.0, 10.0, 0.0),
                Point::new(50.0, -10.0, 0.0),
                &config
            ),
            Err(RoutingError::IdenticalSourceAndTarget(1))
        ));
    }

    #[test]
    fn config_is_validated_before_resolving() {
        let network = test_network();
        let mut config = RoutingConfig::default();
        config.search_radius_increment = 1.0;
        assert!(matches!(
            network.search(
                Point::new(50.0, 10.0, 0.0),
                Point::new(350.0, -5.0, 0.0),
                &config
            ),
            Err(RoutingError::InvalidRadiusIncrement(_))
        ));
    }

    #[test]
    fn unreachable_points_exhaust_the_radius() {
        let network = test_network();
        assert!(matches!(
            network.search(
                Point::new(50_000.0, 50_000.0, 0.0),
                Point::new(350.0, 0.0, 0.0),
                &RoutingConfig::default(),
            ),
            Err(RoutingError::NoLinksFound { .. })
        ));
    }

    #[test]
    fn disconnected_groups_fail_under_only_same() {
        let network = test_network();
        assert!(matches!(
            network.search(
                Point::new(50.0, 100.0, 0.0),
                Point::new(50.0, 2950.0, 0.0),
                &RoutingConfig::default(),
            ),
            Err(RoutingError::DifferentGroups(..))
        ));
    }

    #[test]
    fn best_group_moves_the_cheaper_anchor() {
        let network = test_network();
        let mut config = RoutingConfig::default();
        config.group_policy = GroupPolicy::BestGroup;

        // Source is 100 m from the mainland, target 50 m from the island;
        // moving the source onto the island costs the least in total.
        let result = network
            .search(
                Point::new(50.0, 100.0, 0.0),
                Point::new(350.0, 2950.0, 0.0),
                &config,
            )
            .unwrap();

        let island_group = network.link(50).unwrap().network_group;
        assert!(result.links.iter().all(|l| l.network_group == island_group));
        assert!((result.route_distance - 300.0).abs() < 1e-6);
    }
}
