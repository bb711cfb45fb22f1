// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::OnceLock;

use log::debug;

use crate::connectivity::analyze_groups;
use crate::router;
use crate::search::{RoutingConfig, RoutingError, RoutingPoint, SearchResult};
use crate::spatial::{GridIndex, QuadIndex, SpatialIndex, DEFAULT_CELL_SIZE};
use crate::store::{GeometryStore, StoreError};
use crate::{Bounds, Link, NetworkGraph, Point};

/// Which spatial index implementation a [Network] builds for nearest-link
/// lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    /// Uniform grid, see [GridIndex].
    #[default]
    Grid,

    /// Adaptive quad-tree, see [QuadIndex].
    Quad,
}

/// A complete routable road network: the link set plus the searchable graph
/// and spatial index derived from it.
///
/// The graph and the spatial index are built on first use and cached for the
/// lifetime of the network; both are read-only afterwards and safe to share
/// between concurrent searches. Replacing the link set through
/// [set_links](Self::set_links) drops both caches and re-runs group
/// analysis.
pub struct Network {
    links: HashMap<i32, Link>,
    bounds: Bounds,
    group_count: i32,
    index_kind: IndexKind,

    /// Side store for skeleton networks whose geometries load on demand.
    geometry_store: Option<GeometryStore>,

    graph: OnceLock<NetworkGraph>,
    spatial: OnceLock<Box<dyn SpatialIndex>>,
}

impl Network {
    /// Creates a network from fully loaded links, computing the bounding box
    /// and the network groups.
    pub fn new(links: Vec<Link>) -> Self {
        let mut network = Self {
            links: HashMap::new(),
            bounds: Bounds::EMPTY,
            group_count: 0,
            index_kind: IndexKind::default(),
            geometry_store: None,
            graph: OnceLock::new(),
            spatial: OnceLock::new(),
        };
        network.replace_links(links);
        network
    }

    /// Creates a network from deserialized links, trusting the stored
    /// bounding box and group assignment. Links with an unassigned group
    /// trigger a fresh group analysis.
    pub(crate) fn from_store(
        links: Vec<Link>,
        bounds: Bounds,
        geometry_store: Option<GeometryStore>,
    ) -> Self {
        let mut network = Self {
            links: links.into_iter().map(|l| (l.id, l)).collect(),
            bounds,
            group_count: 0,
            index_kind: IndexKind::default(),
            geometry_store,
            graph: OnceLock::new(),
            spatial: OnceLock::new(),
        };

        if network.links.values().any(|l| l.network_group < 0) {
            network.group_count = assign_groups(&mut network.links);
        } else {
            network.group_count = network
                .links
                .values()
                .map(|l| l.network_group + 1)
                .max()
                .unwrap_or(0);
        }
        network
    }

    pub fn links(&self) -> &HashMap<i32, Link> {
        &self.links
    }

    pub fn link(&self, id: i32) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// The bounding box enclosing every link's geometry.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Number of connected components found by group analysis.
    pub fn group_count(&self) -> i32 {
        self.group_count
    }

    /// Selects the spatial index implementation. Drops an already built
    /// index, so only meaningful before the first nearest-link lookup.
    pub fn set_index_kind(&mut self, kind: IndexKind) {
        if self.index_kind != kind {
            self.index_kind = kind;
            self.spatial = OnceLock::new();
        }
    }

    /// Replaces the entire link set, dropping the cached graph and spatial
    /// index and recomputing bounds and network groups.
    pub fn set_links(&mut self, links: Vec<Link>) {
        self.replace_links(links);
    }

    fn replace_links(&mut self, links: Vec<Link>) {
        self.links = links.into_iter().map(|l| (l.id, l)).collect();
        let mut bounds = Bounds::EMPTY;
        for b in self.links.values().filter_map(Link::bounds) {
            bounds.merge(&b);
        }
        self.bounds = bounds;
        self.group_count = assign_groups(&mut self.links);
        self.graph = OnceLock::new();
        self.spatial = OnceLock::new();
    }

    /// Returns the link with its geometry guaranteed present, fetching it
    /// from the skeleton side store when necessary.
    pub fn require_geometry(&self, id: i32) -> Result<&Link, RoutingError> {
        let link = self
            .links
            .get(&id)
            .ok_or(RoutingError::UnknownLink(id))?;
        if link.geometry().is_some() {
            return Ok(link);
        }

        let store = self
            .geometry_store
            .as_ref()
            .ok_or(StoreError::MissingConfig)?;
        store.load_into(link)?;
        Ok(link)
    }

    fn ensure_all_geometry(&self) -> Result<(), RoutingError> {
        if self.links.values().all(|l| l.geometry().is_some()) {
            return Ok(());
        }
        let store = self
            .geometry_store
            .as_ref()
            .ok_or(StoreError::MissingConfig)?;
        for link in self.links.values() {
            store.load_into(link)?;
        }
        Ok(())
    }

    /// The searchable graph, built from the links on first access.
    /// Building a skeleton network's graph loads all remaining geometries.
    pub fn graph(&self) -> Result<&NetworkGraph, RoutingError> {
        if let Some(g) = self.graph.get() {
            return Ok(g);
        }

        self.ensure_all_geometry()?;
        debug!("building graph from {} links", self.links.len());
        Ok(self
            .graph
            .get_or_init(|| NetworkGraph::build(self.links.values())))
    }

    /// The spatial index over link bounding boxes, built on first access.
    pub fn spatial(&self) -> Result<&dyn SpatialIndex, RoutingError> {
        if let Some(s) = self.spatial.get() {
            return Ok(s.as_ref());
        }

        self.ensure_all_geometry()?;
        debug!(
            "building {:?} spatial index over {} links",
            self.index_kind,
            self.links.len()
        );
        let index = self.spatial.get_or_init(|| {
            let items = self
                .links
                .values()
                .map(|l| (l.id, l.bounds().expect("geometry loaded above")));
            match self.index_kind {
                IndexKind::Grid => {
                    Box::new(GridIndex::build(items, DEFAULT_CELL_SIZE)) as Box<dyn SpatialIndex>
                }
                IndexKind::Quad => Box::new(QuadIndex::build(items, DEFAULT_CELL_SIZE)),
            }
        });
        Ok(index.as_ref())
    }

    /// Resolves the link nearest to `point`, growing the lookup radius per
    /// `config` until a candidate appears.
    pub fn nearest_link(
        &self,
        point: Point,
        config: &RoutingConfig,
    ) -> Result<RoutingPoint, RoutingError> {
        config.validate()?;
        router::resolve_point(self, point, config, None)
    }

    /// Finds a route between two arbitrary points. See [RoutingConfig] for
    /// the tunable parameters.
    pub fn search(
        &self,
        from: Point,
        to: Point,
        config: &RoutingConfig,
    ) -> Result<SearchResult, RoutingError> {
        router::search(self, from, to, config)
    }
}

/// Runs group analysis and writes the resulting component id onto every
/// link. Returns the number of groups.
fn assign_groups(links: &mut HashMap<i32, Link>) -> i32 {
    let groups = analyze_groups(links.values());
    for link in links.values_mut() {
        link.network_group = groups.group_of(link.from_node).unwrap_or(-1);
    }
    groups.total_groups()
}
