// SPDX-License-Identifier: MIT

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::geometry::{point_along_polyline, polyline_length};
use crate::search::RoutingError;
use crate::{GraphEdge, GraphView, Link, NetworkGraph, Point, Vertex};

/// First id of the range reserved for temporary query-point vertices.
const FAKE_ID_START: i32 = i32::MIN;

/// One-past-last id of the reserved range. Real vertex ids must not fall
/// below this value.
const FAKE_ID_END: i32 = i32::MIN + 1024;

/// Checks whether a vertex id belongs to the reserved temporary range.
pub fn is_fake_vertex(id: i32) -> bool {
    id < FAKE_ID_END
}

/// Id of a temporary vertex registered with an [Overloader].
///
/// Values are allocated from a reserved range below any real vertex id and
/// cannot be constructed elsewhere, so a temporary vertex can never be
/// mistaken for a real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeId(i32);

impl FakeId {
    pub fn id(self) -> i32 {
        self.0
    }
}

/// A per-search registry of temporary vertices representing exact query
/// points partway along a link.
///
/// A *source* overload produces outgoing edges from the temporary vertex to
/// the link's endpoints; a *target* overload produces incoming ones. Edge
/// costs are the link's directional costs scaled by `cost_factor` (the
/// fraction of the link behind the query point) and `1 - cost_factor`.
/// Impassable directions contribute no edge.
///
/// The base graph is never touched: an [OverloadedGraph] consults this
/// registry before falling back to it, and both only live for the duration
/// of a single search call.
#[derive(Debug, Default)]
pub struct Overloader {
    vertices: HashMap<i32, Vertex>,
    edges: HashMap<(i32, i32), GraphEdge>,

    /// Temporary neighbors grafted onto *real* vertices by target overloads.
    extra_neighbors: HashMap<i32, Vec<i32>>,

    allocated: i32,
}

impl Overloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a temporary vertex `cost_factor` of the way along `link`,
    /// with edges *from* it to whichever link endpoints are reachable.
    ///
    /// `geometry` must be the link's loaded polyline. Factors outside
    /// `[0, 1]` are rejected before any search runs.
    pub fn add_source_overload(
        &mut self,
        link: &Link,
        geometry: &[Point],
        cost_factor: f64,
    ) -> Result<FakeId, RoutingError> {
        let id = self.register(link, geometry, cost_factor)?;

        if link.is_forward_passable() {
            self.connect_vertices(id.0, link.to_node, link.id, scale(link.cost, 1.0 - cost_factor));
        }
        if link.is_reverse_passable() {
            self.connect_vertices(id.0, link.from_node, link.id, scale(link.reverse_cost, cost_factor));
        }

        Ok(id)
    }

    /// Registers a temporary vertex `cost_factor` of the way along `link`,
    /// with edges *to* it from whichever link endpoints can reach it.
    pub fn add_target_overload(
        &mut self,
        link: &Link,
        geometry: &[Point],
        cost_factor: f64,
    ) -> Result<FakeId, RoutingError> {
        let id = self.register(link, geometry, cost_factor)?;

        if link.is_forward_passable() {
            self.connect_vertices(link.from_node, id.0, link.id, scale(link.cost, cost_factor));
        }
        if link.is_reverse_passable() {
            self.connect_vertices(link.to_node, id.0, link.id, scale(link.reverse_cost, 1.0 - cost_factor));
        }

        Ok(id)
    }

    /// Connects a source overload directly to a target overload sitting on
    /// the *same* link, for queries whose entry and exit share one link.
    /// Adds an edge only for directions the link permits.
    pub fn connect_same_link(
        &mut self,
        source: FakeId,
        target: FakeId,
        link: &Link,
        source_factor: f64,
        target_factor: f64,
    ) {
        if link.is_forward_passable() && target_factor >= source_factor {
            self.connect_vertices(
                source.0,
                target.0,
                link.id,
                scale(link.cost, target_factor - source_factor),
            );
        }
        if link.is_reverse_passable() && source_factor >= target_factor {
            self.connect_vertices(
                source.0,
                target.0,
                link.id,
                scale(link.reverse_cost, source_factor - target_factor),
            );
        }
    }

    fn register(
        &mut self,
        link: &Link,
        geometry: &[Point],
        cost_factor: f64,
    ) -> Result<FakeId, RoutingError> {
        if !(0.0..=1.0).contains(&cost_factor) {
            return Err(RoutingError::InvalidCostFactor(cost_factor));
        }
        assert!(geometry.len() >= 2);

        let id = self.allocate();
        let length = polyline_length(geometry);
        let location = point_along_polyline(geometry, cost_factor * length)
            .expect("polyline with >= 2 points always yields a point");
        self.vertices.insert(
            id.0,
            Vertex {
                id: id.0,
                location,
                neighbors: Vec::new(),
            },
        );
        Ok(id)
    }

    fn allocate(&mut self) -> FakeId {
        assert!(
            self.allocated < FAKE_ID_END - FAKE_ID_START,
            "temporary vertex range exhausted"
        );
        let id = FAKE_ID_START + self.allocated;
        self.allocated += 1;
        FakeId(id)
    }

    /// Adds a directed edge and records symmetric adjacency on both ends.
    fn connect_vertices(&mut self, from: i32, to: i32, link_id: i32, cost: f32) {
        match self.edges.entry((from, to)) {
            Entry::Vacant(e) => {
                e.insert(GraphEdge {
                    from,
                    to,
                    link_id,
                    cost,
                });
            }
            Entry::Occupied(mut e) => {
                if cost < e.get().cost {
                    e.insert(GraphEdge {
                        from,
                        to,
                        link_id,
                        cost,
                    });
                }
            }
        }

        self.add_neighbor(from, to);
        self.add_neighbor(to, from);
    }

    fn add_neighbor(&mut self, of: i32, neighbor: i32) {
        let list = match self.vertices.get_mut(&of) {
            Some(v) => &mut v.neighbors,
            None => self.extra_neighbors.entry(of).or_default(),
        };
        if !list.contains(&neighbor) {
            list.push(neighbor);
        }
    }

    fn vertex(&self, id: i32) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    fn edge(&self, from: i32, to: i32) -> Option<GraphEdge> {
        self.edges.get(&(from, to)).copied()
    }
}

/// A [GraphView] layering an [Overloader] over a base [NetworkGraph].
///
/// Every lookup consults the overloader first, so temporary vertices and
/// edges shadow the base graph for the duration of one search while the
/// base graph stays shareable between concurrent searches.
pub struct OverloadedGraph<'a> {
    base: &'a NetworkGraph,
    overlay: &'a Overloader,
}

impl<'a> OverloadedGraph<'a> {
    pub fn new(base: &'a NetworkGraph, overlay: &'a Overloader) -> Self {
        Self { base, overlay }
    }
}

impl GraphView for OverloadedGraph<'_> {
    fn vertex(&self, id: i32) -> Option<&Vertex> {
        self.overlay.vertex(id).or_else(|| self.base.vertex(id))
    }

    fn edge(&self, from: i32, to: i32) -> Option<GraphEdge> {
        self.overlay.edge(from, to).or_else(|| self.base.edge(from, to))
    }

    fn neighbors(&self, id: i32) -> Cow<'_, [i32]> {
        if let Some(v) = self.overlay.vertex(id) {
            return Cow::Borrowed(v.neighbors.as_slice());
        }
        match self.overlay.extra_neighbors.get(&id) {
            Some(extra) => {
                let mut merged = self.base.neighbors(id).into_owned();
                for &n in extra {
                    if !merged.contains(&n) {
                        merged.push(n);
                    }
                }
                Cow::Owned(merged)
            }
            None => self.base.neighbors(id),
        }
    }
}

fn scale(cost: f32, factor: f64) -> f32 {
    (cost as f64 * factor) as f32
}
