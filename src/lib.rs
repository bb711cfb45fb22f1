// SPDX-License-Identifier: MIT

//! Point-to-point routing over binary road-link networks.
//!
//! A network is a set of [Links](Link) — directed or bidirectional road
//! segments with 3D polyline geometry and per-direction travel costs.
//! Query points do not have to coincide with graph vertices: each one is
//! projected onto the nearest link and injected into the search graph as a
//! temporary vertex, so returned routes begin and end exactly at the
//! requested positions.
//!
//! # Example
//!
//! ```no_run
//! let network = roadnet::store::load_from_file(
//!     "path/to/network.bin",
//!     roadnet::store::FileFormat::Plain,
//! ).expect("failed to load network.bin");
//!
//! let config = roadnet::RoutingConfig::default();
//! let result = network
//!     .search(
//!         roadnet::Point::new(6_530.0, 12_010.0, 0.0),
//!         roadnet::Point::new(9_840.0, 13_470.0, 0.0),
//!         &config,
//!     )
//!     .expect("failed to find route");
//!
//! println!("route: {:.1} m over {} links", result.route_distance, result.links.len());
//! ```

mod connectivity;
pub mod geometry;
mod graph;
mod link;
mod network;
mod overload;
mod route;
mod router;
pub mod search;
pub mod spatial;
pub mod store;

pub use connectivity::{analyze_groups, GroupAssignment};
pub use graph::{GraphEdge, GraphView, NetworkGraph, Vertex};
pub use link::{Link, IMPASSABLE};
pub use network::{IndexKind, Network};
pub use overload::{is_fake_vertex, FakeId, OverloadedGraph, Overloader};
pub use route::{find_first_node_id, rotate_and_cut};
pub use search::{
    Algorithm, GroupPolicy, RoutingConfig, RoutingError, RoutingPoint, SearchResult, SearchStats,
    Termination,
};

/// A 3D position. `x` and `y` are planar coordinates in meters (a projected
/// coordinate system is assumed); `z` is carried through geometry operations
/// but ignored by all distance calculations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// An axis-aligned 2D bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// An empty box which envelopes nothing and extends any point or box
    /// it is merged with.
    pub const EMPTY: Self = Self {
        min_x: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        min_y: f64::INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    /// Computes the bounding box of a set of points.
    /// Returns [Bounds::EMPTY] for an empty slice.
    pub fn of(points: &[Point]) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.extend(*p);
        }
        b
    }

    pub fn extend(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.max_x = self.max_x.max(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn merge(&mut self, other: &Bounds) {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Checks whether `(x, y)` lies within this box inflated by `margin`
    /// on every side. Points exactly on the inflated boundary are inside.
    pub fn contains_within(&self, x: f64, y: f64, margin: f64) -> bool {
        x >= self.min_x - margin
            && x <= self.max_x + margin
            && y >= self.min_y - margin
            && y <= self.max_y + margin
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_envelopes_all_points() {
        let b = Bounds::of(&[
            Point::new(3.0, -2.0, 0.0),
            Point::new(-1.0, 7.0, 5.0),
            Point::new(0.5, 0.5, 0.0),
        ]);
        assert_eq!(b.min_x, -1.0);
        assert_eq!(b.max_x, 3.0);
        assert_eq!(b.min_y, -2.0);
        assert_eq!(b.max_y, 7.0);
    }

    #[test]
    fn bounds_contains_within_margin() {
        let b = Bounds::of(&[Point::new(0.0, 0.0, 0.0), Point::new(10.0, 10.0, 0.0)]);
        assert!(b.contains_within(5.0, 5.0, 0.0));
        assert!(b.contains_within(-3.0, 5.0, 3.0));
        assert!(!b.contains_within(-3.1, 5.0, 3.0));
        // Boundary points count as inside.
        assert!(b.contains_within(10.0, 10.0, 0.0));
    }
}
