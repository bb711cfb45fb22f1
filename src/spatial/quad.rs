// SPDX-License-Identifier: MIT

use log::debug;

use super::SpatialIndex;
use crate::Bounds;

/// A nested-grid (quad-tree) spatial index over link bounding boxes.
///
/// Cells subdivide only while they hold more than one link and remain
/// larger than `min_cell_size`, which trades build time for smaller
/// per-query candidate sets than a uniform [GridIndex](super::GridIndex) on
/// unevenly dense networks.
///
/// The tree lives in a flat arena indexed by `u32`; child references are
/// arena indices, not owned pointers, so the whole structure is trivially
/// shareable between search threads.
#[derive(Debug, Clone)]
pub struct QuadIndex {
    entries: Vec<(i32, Bounds)>,
    nodes: Vec<QuadNode>,
    min_cell_size: f64,
}

#[derive(Debug, Clone)]
struct QuadNode {
    bounds: Bounds,
    /// Arena indices of the four quadrants, present once the node has split.
    children: Option<[u32; 4]>,
    /// Entries stored at this node: all of them for a leaf, or the ones
    /// straddling a quadrant boundary for an inner node.
    items: Vec<u32>,
}

impl QuadIndex {
    /// Builds the index from `(link id, bounding box)` pairs. The root cell
    /// is the union of all boxes.
    pub fn build<I: IntoIterator<Item = (i32, Bounds)>>(items: I, min_cell_size: f64) -> Self {
        assert!(min_cell_size > 0.0);

        let entries: Vec<(i32, Bounds)> = items.into_iter().collect();
        let mut root_bounds = Bounds::EMPTY;
        for (_, b) in &entries {
            root_bounds.merge(b);
        }

        let mut index = Self {
            entries,
            nodes: vec![QuadNode {
                bounds: root_bounds,
                children: None,
                items: Vec::new(),
            }],
            min_cell_size,
        };
        for item in 0..index.entries.len() as u32 {
            index.insert(0, item);
        }

        debug!(
            "quad index: {} links in {} cells (min cell {} m)",
            index.entries.len(),
            index.nodes.len(),
            min_cell_size
        );
        index
    }

    fn insert(&mut self, mut node: u32, item: u32) {
        let item_bounds = self.entries[item as usize].1;

        loop {
            match self.nodes[node as usize].children {
                Some(children) => {
                    // Descend into the quadrant fully containing the item,
                    // or keep it here if it straddles a boundary.
                    let fitting = children
                        .iter()
                        .find(|&&c| envelopes(&self.nodes[c as usize].bounds, &item_bounds));
                    match fitting {
                        Some(&child) => node = child,
                        None => {
                            self.nodes[node as usize].items.push(item);
                            return;
                        }
                    }
                }
                None => {
                    self.nodes[node as usize].items.push(item);
                    self.split_if_needed(node);
                    return;
                }
            }
        }
    }

    fn split_if_needed(&mut self, node: u32) {
        let n = &self.nodes[node as usize];
        if n.items.len() <= 1 {
            return;
        }
        let half_w = n.bounds.width() * 0.5;
        let half_h = n.bounds.height() * 0.5;
        if half_w < self.min_cell_size || half_h < self.min_cell_size {
            return;
        }

        let b = n.bounds;
        let mid_x = b.min_x + half_w;
        let mid_y = b.min_y + half_h;
        let quadrants = [
            quadrant(b.min_x, mid_x, b.min_y, mid_y),
            quadrant(mid_x, b.max_x, b.min_y, mid_y),
            quadrant(b.min_x, mid_x, mid_y, b.max_y),
            quadrant(mid_x, b.max_x, mid_y, b.max_y),
        ];

        let first_child = self.nodes.len() as u32;
        for q in quadrants {
            self.nodes.push(QuadNode {
                bounds: q,
                children: None,
                items: Vec::new(),
            });
        }

        let node_ref = &mut self.nodes[node as usize];
        node_ref.children = Some([
            first_child,
            first_child + 1,
            first_child + 2,
            first_child + 3,
        ]);
        let items = std::mem::take(&mut node_ref.items);
        for item in items {
            self.insert(node, item);
        }
    }
}

impl SpatialIndex for QuadIndex {
    fn query(&self, x: f64, y: f64, radius: f64) -> Vec<i32> {
        let mut out = Vec::new();
        let mut stack = vec![0u32];

        while let Some(node) = stack.pop() {
            let n = &self.nodes[node as usize];
            if !n.bounds.contains_within(x, y, radius) {
                continue;
            }
            for &item in &n.items {
                let (id, bounds) = self.entries[item as usize];
                if bounds.contains_within(x, y, radius) {
                    out.push(id);
                }
            }
            if let Some(children) = n.children {
                stack.extend_from_slice(&children);
            }
        }

        out
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn quadrant(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Bounds {
    Bounds {
        min_x,
        max_x,
        min_y,
        max_y,
    }
}

fn envelopes(outer: &Bounds, inner: &Bounds) -> bool {
    outer.min_x <= inner.min_x
        && outer.max_x >= inner.max_x
        && outer.min_y <= inner.min_y
        && outer.max_y >= inner.max_y
}
