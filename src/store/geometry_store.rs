// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::store::StoreError;
use crate::{Link, Point};

/// Side storage for the geometries omitted from a skeleton network file.
///
/// Each link's polyline lives in its own `<id>.geom` file inside the
/// configured directory and is loaded on first demand. Loading is guarded by
/// a lock so concurrent readers asking for the same unloaded link do not
/// duplicate I/O; once set, a link's geometry is read without locking.
#[derive(Debug)]
pub struct GeometryStore {
    dir: PathBuf,
    load_lock: Mutex<()>,
}

impl GeometryStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            load_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, link_id: i32) -> PathBuf {
        self.dir.join(format!("{link_id}.geom"))
    }

    /// Ensures `link` has its geometry, reading the side file if necessary.
    pub fn load_into(&self, link: &Link) -> Result<(), StoreError> {
        if link.geometry().is_some() {
            return Ok(());
        }

        let _guard = self
            .load_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another thread may have finished the load while we waited.
        if link.geometry().is_some() {
            return Ok(());
        }

        let mut r = BufReader::new(File::open(self.path_of(link.id))?);
        let count = r.read_i32::<LittleEndian>()?;
        if count < 2 {
            return Err(StoreError::BadPointCount {
                link_id: link.id,
                count,
            });
        }

        let mut points = Vec::with_capacity(count as usize);
        for _ in 0..count {
            points.push(Point::new(
                r.read_f64::<LittleEndian>()?,
                r.read_f64::<LittleEndian>()?,
                r.read_f64::<LittleEndian>()?,
            ));
        }
        link.set_geometry(points);
        Ok(())
    }

    /// Writes `link`'s geometry into its side file, replacing any previous
    /// content.
    pub fn save(&self, link: &Link) -> Result<(), StoreError> {
        let points = link
            .geometry()
            .ok_or(StoreError::MissingGeometry(link.id))?;

        let mut w = BufWriter::new(File::create(self.path_of(link.id))?);
        w.write_i32::<LittleEndian>(points.len() as i32)?;
        for p in points {
            w.write_f64::<LittleEndian>(p.x)?;
            w.write_f64::<LittleEndian>(p.y)?;
            w.write_f64::<LittleEndian>(p.z)?;
        }
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_and_reloads_a_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let store = GeometryStore::new(dir.path());

        let link = Link::new(
            44,
            1,
            2,
            vec![
                Point::new(10.0, 20.0, 1.0),
                Point::new(30.0, 40.0, 2.0),
                Point::new(50.0, 60.0, 3.0),
            ],
            5.0,
            5.0,
        );
        store.save(&link).unwrap();

        let skeleton = Link::without_geometry(44, 1, 2, 5.0, 5.0);
        store.load_into(&skeleton).unwrap();
        assert_eq!(skeleton.geometry(), link.geometry());

        // A second load is a no-op.
        store.load_into(&skeleton).unwrap();
        assert_eq!(skeleton.geometry().unwrap().len(), 3);
    }

    #[test]
    fn missing_side_file_surfaces_as_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = GeometryStore::new(dir.path());
        let skeleton = Link::without_geometry(999, 1, 2, 5.0, 5.0);
        assert!(matches!(
            store.load_into(&skeleton),
            Err(StoreError::Io(_))
        ));
    }

    #[test]
    fn saving_a_skeleton_link_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = GeometryStore::new(dir.path());
        let skeleton = Link::without_geometry(7, 1, 2, 5.0, 5.0);
        assert!(matches!(
            store.save(&skeleton),
            Err(StoreError::MissingGeometry(7))
        ));
    }
}
