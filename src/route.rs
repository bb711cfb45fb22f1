// SPDX-License-Identifier: MIT

//! Route geometry post-processing.
//!
//! A graph search returns links in traversal order, but each link's stored
//! geometry may run against the traversal direction, and the first and last
//! links extend past the exact query points. [find_first_node_id] resolves
//! the true start vertex of the route and [rotate_and_cut] aligns and trims
//! the link sequence so the returned geometry begins and ends exactly at
//! the query points.

use crate::geometry::{euclidean_distance, point_along_polyline, polyline_length};
use crate::overload::is_fake_vertex;
use crate::search::RoutingError;
use crate::{Link, Point};

/// Tolerance below which two positions along a polyline are considered the
/// same point, in meters.
const CUT_EPSILON: f64 = 1e-9;

/// Resolves which endpoint of the first link is the true start of the
/// route.
///
/// `traversed` is the vertex-id sequence of the graph search and may begin
/// and end with temporary (query point) ids. If the first entry is real it
/// is the answer; otherwise the second entry fixes the orientation of the
/// first link. When both are temporary — a single-link route between two
/// mid-link points — the endpoint pairing with the smaller summed distance
/// to the query points wins.
///
/// Returns [None] for an empty route or when `traversed` does not match
/// `links`.
pub fn find_first_node_id(
    links: &[Link],
    traversed: &[i32],
    from_point: Point,
    to_point: Point,
) -> Option<i32> {
    let first = links.first()?;

    if let Some(&v0) = traversed.first() {
        if !is_fake_vertex(v0) {
            return Some(v0);
        }
    }

    if let Some(&v1) = traversed.get(1) {
        if !is_fake_vertex(v1) {
            if first.to_node == v1 {
                return Some(first.from_node);
            }
            if first.from_node == v1 {
                // The first link will be rotated so that its to-vertex
                // becomes v1; the route then starts at the other end.
                return Some(first.to_node);
            }
            return None;
        }
    }

    // Both endpoints of a single-link route are temporary: compare the
    // straight pairing against the reversed one.
    let geometry = first.geometry()?;
    let head = *geometry.first()?;
    let tail = *geometry.last()?;
    let straight = euclidean_distance(from_point, head) + euclidean_distance(to_point, tail);
    let reversed = euclidean_distance(from_point, tail) + euclidean_distance(to_point, head);
    if straight <= reversed {
        Some(first.from_node)
    } else {
        Some(first.to_node)
    }
}

/// Rotates every link of a route into traversal direction and trims the
/// first and last links to the exact query points.
///
/// `first_node_id` is the route's start vertex (see [find_first_node_id]).
/// `cut_from_start` is the entry point's distance along the first link's
/// *stored* orientation, `cut_from_end` the exit point's distance from the
/// last link's *stored* to-end; both are carried through when a link gets
/// reversed. Reference intervals are rescaled to the kept fraction of each
/// cut link.
///
/// Links whose cut geometry degenerates to fewer than 2 points are dropped;
/// if that removes the whole route, [RoutingError::EmptyRoute] is raised.
/// Input links are never mutated — every returned link is a fresh clone.
///
/// # Panics
///
/// Panics if any input link's geometry is not loaded.
pub fn rotate_and_cut(
    links: &[Link],
    first_node_id: i32,
    cut_from_start: f64,
    cut_from_end: f64,
) -> Result<Vec<Link>, RoutingError> {
    let mut out = Vec::with_capacity(links.len());
    let mut expected = first_node_id;
    let last_index = links.len().saturating_sub(1);

    for (index, stored) in links.iter().enumerate() {
        let (link, reversed) = if stored.from_node == expected {
            (stored.clone(), false)
        } else {
            (stored.reversed(), true)
        };
        expected = link.to_node;

        let geometry = link.geometry().expect("route links must have geometry");
        let length = polyline_length(geometry);
        if length <= 0.0 {
            continue;
        }

        let mut trim_front = 0.0;
        let mut trim_back = 0.0;
        if index == 0 {
            trim_front = if reversed {
                length - cut_from_start
            } else {
                cut_from_start
            };
        }
        if index == last_index {
            trim_back = if reversed {
                length - cut_from_end
            } else {
                cut_from_end
            };
        }

        let keep_to = length - trim_back;
        let Some(points) = cut_polyline(geometry, trim_front, keep_to) else {
            continue;
        };

        // The reference interval follows the stored orientation, so map the
        // kept range back before rescaling it.
        let (stored_lo, stored_hi) = if reversed {
            (trim_back, length - trim_front)
        } else {
            (trim_front, length - trim_back)
        };
        let span = link.to_rel - link.from_rel;
        let from_rel = link.from_rel + (stored_lo / length) * span;
        let to_rel = link.from_rel + (stored_hi / length) * span;

        out.push(link.with_geometry(points, from_rel, to_rel));
    }

    if out.is_empty() {
        return Err(RoutingError::EmptyRoute);
    }
    Ok(out)
}

/// Extracts the sub-polyline between two distances along `points`.
/// Returns [None] when the kept range is empty.
fn cut_polyline(points: &[Point], from_distance: f64, to_distance: f64) -> Option<Vec<Point>> {
    if to_distance - from_distance <= CUT_EPSILON {
        return None;
    }

    let mut out = Vec::with_capacity(points.len());
    out.push(point_along_polyline(points, from_distance)?);

    let mut walked = 0.0;
    for w in points.windows(2) {
        walked += euclidean_distance(w[0], w[1]);
        if walked > from_distance + CUT_EPSILON && walked < to_distance - CUT_EPSILON {
            out.push(w[1]);
        }
    }

    out.push(point_along_polyline(points, to_distance)?);
    if out.len() < 2 {
        return None;
    }
    Some(out)
}
