// SPDX-License-Identifier: MIT

use std::sync::{Arc, OnceLock};

use crate::geometry::polyline_length;
use crate::{Bounds, Point};

/// Sentinel cost marking a direction as not traversable.
///
/// A [Link] with `cost == IMPASSABLE` cannot be driven from its from-vertex
/// to its to-vertex; `reverse_cost == IMPASSABLE` blocks the opposite
/// direction. Links impassable both ways still contribute adjacency for
/// network-group analysis.
pub const IMPASSABLE: f32 = f32::MAX;

/// A directed or bidirectional road segment between two vertices.
///
/// Vertices are not stored independently: a vertex is implied by the ids and
/// endpoint geometry of its incident links. Geometry may be absent on links
/// loaded from a skeleton file until fetched from the network's geometry
/// side store; [geometry](Self::geometry) then returns [None].
#[derive(Debug, Clone)]
pub struct Link {
    pub id: i32,
    pub from_node: i32,
    pub to_node: i32,

    /// Raw direction attribute from the source dataset. Kept for
    /// serialization; traversability is decided by the cost sentinels alone.
    pub direction: u8,

    /// Raw functional road class attribute from the source dataset.
    pub road_class: u8,

    /// Start of this link's interval within its logical road, in `[0, 1]`.
    pub from_rel: f64,

    /// End of this link's interval within its logical road, in `[0, 1]`.
    /// Invariant: `from_rel <= to_rel`.
    pub to_rel: f64,

    pub speed_limit_fwd: u8,
    pub speed_limit_rev: u8,

    /// Travel cost from `from_node` to `to_node`, or [IMPASSABLE].
    pub cost: f32,

    /// Travel cost from `to_node` to `from_node`, or [IMPASSABLE].
    pub reverse_cost: f32,

    /// Interned lane-code string shared between links of the same road.
    pub lane_code: Option<Arc<str>>,

    /// Connected-component id, `-1` until group analysis has run.
    /// Stable only within one load/build cycle.
    pub network_group: i32,

    geometry: OnceLock<Vec<Point>>,
    bounds: OnceLock<Bounds>,
}

impl Link {
    /// Creates a link with geometry. Remaining attributes start at their
    /// defaults (`from_rel..to_rel` covering the whole road, no lane code,
    /// group unassigned).
    pub fn new(
        id: i32,
        from_node: i32,
        to_node: i32,
        geometry: Vec<Point>,
        cost: f32,
        reverse_cost: f32,
    ) -> Self {
        let mut link = Self::without_geometry(id, from_node, to_node, cost, reverse_cost);
        let _ = link.geometry.set(geometry);
        link
    }

    /// Creates a skeleton link whose geometry will be supplied later,
    /// exactly once, via [set_geometry](Self::set_geometry).
    pub fn without_geometry(
        id: i32,
        from_node: i32,
        to_node: i32,
        cost: f32,
        reverse_cost: f32,
    ) -> Self {
        Self {
            id,
            from_node,
            to_node,
            direction: 0,
            road_class: 0,
            from_rel: 0.0,
            to_rel: 1.0,
            speed_limit_fwd: 0,
            speed_limit_rev: 0,
            cost,
            reverse_cost,
            lane_code: None,
            network_group: -1,
            geometry: OnceLock::new(),
            bounds: OnceLock::new(),
        }
    }

    /// The link's polyline, or [None] if it has not been loaded yet.
    pub fn geometry(&self) -> Option<&[Point]> {
        self.geometry.get().map(Vec::as_slice)
    }

    /// Supplies a skeleton link's geometry. The geometry can only be set
    /// once; returns `false` if it was already present.
    pub fn set_geometry(&self, points: Vec<Point>) -> bool {
        self.geometry.set(points).is_ok()
    }

    /// The link's bounding box, computed from its geometry on first access
    /// and cached. [None] while the geometry is not loaded.
    pub fn bounds(&self) -> Option<Bounds> {
        if let Some(b) = self.bounds.get() {
            return Some(*b);
        }
        let points = self.geometry()?;
        Some(*self.bounds.get_or_init(|| Bounds::of(points)))
    }

    /// The link's 2D length in meters, or [None] while the geometry is not
    /// loaded.
    pub fn length(&self) -> Option<f64> {
        self.geometry().map(polyline_length)
    }

    pub fn is_forward_passable(&self) -> bool {
        self.cost < IMPASSABLE
    }

    pub fn is_reverse_passable(&self) -> bool {
        self.reverse_cost < IMPASSABLE
    }

    /// The first geometry point, panicking if the geometry is not loaded.
    /// Callers must go through `Network::require_geometry` first.
    pub(crate) fn first_point(&self) -> Point {
        self.geometry().expect("link geometry not loaded")[0]
    }

    /// The last geometry point, panicking if the geometry is not loaded.
    pub(crate) fn last_point(&self) -> Point {
        *self
            .geometry()
            .expect("link geometry not loaded")
            .last()
            .unwrap()
    }

    /// The stable external reference of this link: its id plus the interval
    /// it occupies within its logical road. Cutting a link rescales the
    /// interval, so references produced after a cut still locate the kept
    /// part of the road.
    pub fn reference(&self) -> String {
        format!("{}:{:.6}-{:.6}", self.id, self.from_rel, self.to_rel)
    }

    /// A copy of this link rotated into the opposite traversal direction:
    /// geometry order, endpoint ids, costs and speed limits are all swapped.
    /// The reference interval is unchanged — it locates the link within its
    /// logical road regardless of traversal direction.
    ///
    /// Reversing twice yields the original link.
    pub fn reversed(&self) -> Link {
        let mut link = self.clone();
        link.from_node = self.to_node;
        link.to_node = self.from_node;
        link.cost = self.reverse_cost;
        link.reverse_cost = self.cost;
        link.speed_limit_fwd = self.speed_limit_rev;
        link.speed_limit_rev = self.speed_limit_fwd;
        if let Some(points) = self.geometry() {
            let mut points = points.to_vec();
            points.reverse();
            link.geometry = OnceLock::new();
            let _ = link.geometry.set(points);
        }
        link
    }

    /// A copy of this link with replacement geometry and reference interval,
    /// used by route cutting. The cached bounding box is recomputed lazily.
    pub(crate) fn with_geometry(&self, points: Vec<Point>, from_rel: f64, to_rel: f64) -> Link {
        let mut link = self.clone();
        link.from_rel = from_rel;
        link.to_rel = to_rel;
        link.geometry = OnceLock::new();
        let _ = link.geometry.set(points);
        link.bounds = OnceLock::new();
        link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_link() -> Link {
        let mut link = Link::new(
            5,
            7,
            13,
            vec![
                Point::new(100.0, 0.0, 0.0),
                Point::new(150.0, 0.0, 1.0),
                Point::new(200.0, 0.0, 2.0),
            ],
            100.0,
            120.0,
        );
        link.from_rel = 0.25;
        link.to_rel = 0.75;
        link.speed_limit_fwd = 50;
        link.speed_limit_rev = 30;
        link
    }

    #[test]
    fn bounds_envelope_geometry() {
        let link = straight_link();
        let b = link.bounds().unwrap();
        for p in link.geometry().unwrap() {
            assert!(b.contains_within(p.x, p.y, 0.0));
        }
    }

    #[test]
    fn reversed_is_an_involution() {
        let link = straight_link();
        let twice = link.reversed().reversed();
        assert_eq!(twice.from_node, link.from_node);
        assert_eq!(twice.to_node, link.to_node);
        assert_eq!(twice.cost, link.cost);
        assert_eq!(twice.reverse_cost, link.reverse_cost);
        assert_eq!(twice.speed_limit_fwd, link.speed_limit_fwd);
        assert_eq!(twice.geometry(), link.geometry());
        assert_eq!(twice.from_rel, link.from_rel);
        assert_eq!(twice.to_rel, link.to_rel);
    }

    #[test]
    fn reversed_swaps_orientation() {
        let link = straight_link();
        let rev = link.reversed();
        assert_eq!(rev.from_node, 13);
        assert_eq!(rev.to_node, 7);
        assert_eq!(rev.cost, 120.0);
        assert_eq!(rev.reverse_cost, 100.0);
        assert_eq!(rev.speed_limit_fwd, 30);
        assert_eq!(rev.geometry().unwrap()[0], Point::new(200.0, 0.0, 2.0));
        // The reference interval stays put.
        assert_eq!(rev.from_rel, 0.25);
        assert_eq!(rev.to_rel, 0.75);
    }

    #[test]
    fn skeleton_geometry_set_once() {
        let link = Link::without_geometry(1, 2, 3, 10.0, IMPASSABLE);
        assert!(link.geometry().is_none());
        assert!(link.bounds().is_none());
        assert!(link.length().is_none());

        assert!(link.set_geometry(vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(3.0, 4.0, 0.0)
        ]));
        assert_eq!(link.length(), Some(5.0));

        // A second set is refused and the original geometry is kept.
        assert!(!link.set_geometry(vec![Point::default(), Point::default()]));
        assert_eq!(link.length(), Some(5.0));
    }

    #[test]
    fn passability_follows_sentinels() {
        let link = Link::without_geometry(1, 2, 3, 10.0, IMPASSABLE);
        assert!(link.is_forward_passable());
        assert!(!link.is_reverse_passable());
    }

    #[test]
    fn reference_encodes_id_and_interval() {
        let link = straight_link();
        assert_eq!(link.reference(), "5:0.250000-0.750000");
    }
}
