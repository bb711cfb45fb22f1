// SPDX-License-Identifier: MIT

//! Spatial indexes over link bounding boxes.
//!
//! Both variants answer the same question — which links' bounding boxes lie
//! within a given radius of a point — and are built once per network, then
//! shared read-only between concurrent searches.

mod grid;
mod quad;

pub use grid::GridIndex;
pub use quad::QuadIndex;

/// Default edge length of a [GridIndex] cell and default minimum cell size
/// of a [QuadIndex], in meters.
pub const DEFAULT_CELL_SIZE: f64 = 500.0;

/// A read-only index answering radius queries over link bounding boxes.
pub trait SpatialIndex: Send + Sync {
    /// Returns the ids of all links whose bounding box, inflated by
    /// `radius` on every side, contains `(x, y)`. The result is free of
    /// duplicates; its order is unspecified.
    fn query(&self, x: f64, y: f64, radius: f64) -> Vec<i32>;

    /// Number of indexed links.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
