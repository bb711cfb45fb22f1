// SPDX-License-Identifier: MIT

//! Planar geometry helpers shared by the spatial index, the search
//! heuristic and route post-processing.
//!
//! All distances are 2D (the `z` coordinate is carried through but never
//! measured), in the unit of the network's projected coordinate system
//! (meters).

use crate::Point;

/// The straight-line 2D distance between two points.
pub fn euclidean_distance(a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// The manhattan (L1) 2D distance between two points.
pub fn manhattan_distance(a: Point, b: Point) -> f64 {
    (b.x - a.x).abs() + (b.y - a.y).abs()
}

/// The total 2D length of a polyline. Zero for fewer than 2 points.
pub fn polyline_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| euclidean_distance(w[0], w[1]))
        .sum()
}

/// The projection of a query point onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPointInfo {
    /// The point on the polyline closest to the query point.
    pub point: Point,

    /// Distance from the polyline's first point to [point](Self::point),
    /// measured along the polyline.
    pub distance_along: f64,

    /// Straight-line distance between the query point and [point](Self::point).
    pub distance_from: f64,
}

/// Projects `p` onto the closest segment of the polyline.
/// Returns [None] when the polyline has fewer than 2 points.
pub fn nearest_point_on_polyline(points: &[Point], p: Point) -> Option<NearestPointInfo> {
    if points.len() < 2 {
        return None;
    }

    let mut best: Option<NearestPointInfo> = None;
    let mut walked = 0.0;

    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let segment_length = euclidean_distance(a, b);
        let (candidate, along) = project_onto_segment(a, b, segment_length, p);
        let dist = euclidean_distance(p, candidate);

        let better = match best {
            Some(ref b) => dist < b.distance_from,
            None => true,
        };
        if better {
            best = Some(NearestPointInfo {
                point: candidate,
                distance_along: walked + along,
                distance_from: dist,
            });
        }

        walked += segment_length;
    }

    best
}

/// Projects `p` onto the segment `a..b`, returning the clamped projection
/// and its distance from `a` along the segment.
fn project_onto_segment(a: Point, b: Point, length: f64, p: Point) -> (Point, f64) {
    if length == 0.0 {
        return (a, 0.0);
    }

    let t = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / (length * length);
    let t = t.clamp(0.0, 1.0);
    let projected = Point::new(
        a.x + t * (b.x - a.x),
        a.y + t * (b.y - a.y),
        a.z + t * (b.z - a.z),
    );
    (projected, t * length)
}

/// Returns the point `distance` meters along the polyline, interpolating
/// within segments and clamping to the endpoints.
/// Returns [None] when the polyline has fewer than 2 points.
pub fn point_along_polyline(points: &[Point], distance: f64) -> Option<Point> {
    if points.len() < 2 {
        return None;
    }
    if distance <= 0.0 {
        return Some(points[0]);
    }

    let mut remaining = distance;
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let segment_length = euclidean_distance(a, b);
        if remaining <= segment_length && segment_length > 0.0 {
            let t = remaining / segment_length;
            return Some(Point::new(
                a.x + t * (b.x - a.x),
                a.y + t * (b.y - a.y),
                a.z + t * (b.z - a.z),
            ));
        }
        remaining -= segment_length;
    }

    Some(*points.last().unwrap())
}
