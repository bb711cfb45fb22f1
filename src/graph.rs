// SPDX-License-Identifier: MIT

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::warn;

use crate::{Link, Point};

/// A graph vertex, derived from the endpoints of its incident [Links](Link).
///
/// The location is taken from the first incident link's endpoint geometry;
/// multiple links referencing the same vertex id are assumed to agree on its
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: i32,
    pub location: Point,

    /// Ids of vertices connected to this one by any link, regardless of
    /// traversal direction. Used for expansion during search and for
    /// network-group analysis.
    pub neighbors: Vec<i32>,
}

impl Vertex {
    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }
}

/// A directed edge of a [NetworkGraph], keyed by its endpoint pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphEdge {
    pub from: i32,
    pub to: i32,

    /// Id of the [Link] this edge was created from.
    pub link_id: i32,

    pub cost: f32,
}

/// Read access to a searchable graph.
///
/// Implemented by [NetworkGraph] and by
/// [OverloadedGraph](crate::OverloadedGraph), which layers temporary
/// query-point vertices over a base graph without mutating it. Search
/// algorithms only ever see this trait.
pub trait GraphView {
    /// Looks up a vertex by id.
    fn vertex(&self, id: i32) -> Option<&Vertex>;

    /// Looks up a directed edge. [None] when the direction is not
    /// traversable.
    fn edge(&self, from: i32, to: i32) -> Option<GraphEdge>;

    /// All neighbor ids of a vertex, in both traversal directions.
    fn neighbors(&self, id: i32) -> Cow<'_, [i32]>;
}

/// An adjacency-list directed graph built from a set of [Links](Link).
///
/// Every link contributes a forward edge if its forward direction is
/// passable and a reverse edge if its reverse direction is; a duplicate
/// `(from, to)` pair keeps whichever edge is cheaper. The graph is built
/// once and treated as read-only afterwards — query-point injection happens
/// in a per-search [Overloader](crate::Overloader) layered on top.
#[derive(Debug, Default, Clone)]
pub struct NetworkGraph {
    vertices: HashMap<i32, Vertex>,
    edges: HashMap<(i32, i32), GraphEdge>,
}

impl NetworkGraph {
    /// Builds the graph from a collection of links. Links whose geometry is
    /// not loaded are skipped, as their vertex positions are unknown.
    pub fn build<'a, I: IntoIterator<Item = &'a Link>>(links: I) -> Self {
        let mut g = Self::default();

        for link in links {
            if link.geometry().is_none() {
                warn!("link {} has no geometry, not added to the graph", link.id);
                continue;
            }

            g.add_vertex(link.from_node, link.first_point(), link.to_node);
            g.add_vertex(link.to_node, link.last_point(), link.from_node);

            if link.is_forward_passable() {
                g.add_edge(GraphEdge {
                    from: link.from_node,
                    to: link.to_node,
                    link_id: link.id,
                    cost: link.cost,
                });
            }
            if link.is_reverse_passable() {
                g.add_edge(GraphEdge {
                    from: link.to_node,
                    to: link.from_node,
                    link_id: link.id,
                    cost: link.reverse_cost,
                });
            }
        }

        g
    }

    fn add_vertex(&mut self, id: i32, location: Point, neighbor: i32) {
        match self.vertices.entry(id) {
            Entry::Vacant(e) => {
                e.insert(Vertex {
                    id,
                    location,
                    neighbors: vec![neighbor],
                });
            }
            Entry::Occupied(mut e) => {
                let v = e.get_mut();
                if !v.neighbors.contains(&neighbor) {
                    v.neighbors.push(neighbor);
                }
            }
        }
    }

    fn add_edge(&mut self, edge: GraphEdge) {
        match self.edges.entry((edge.from, edge.to)) {
            Entry::Vacant(e) => {
                e.insert(edge);
            }
            // Parallel links between the same vertex pair: keep the cheaper.
            Entry::Occupied(mut e) => {
                if edge.cost < e.get().cost {
                    e.insert(edge);
                }
            }
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns an iterator over all vertices, in no particular order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }
}

impl GraphView for NetworkGraph {
    fn vertex(&self, id: i32) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    fn edge(&self, from: i32, to: i32) -> Option<GraphEdge> {
        self.edges.get(&(from, to)).copied()
    }

    fn neighbors(&self, id: i32) -> Cow<'_, [i32]> {
        match self.vertices.get(&id) {
            Some(v) => Cow::Borrowed(v.neighbors.as_slice()),
            None => Cow::Borrowed(&[]),
        }
    }
}
