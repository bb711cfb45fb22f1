// SPDX-License-Identifier: MIT

//! Binary network files.
//!
//! Layout, all numbers little-endian: header = format version (i32),
//! bounding box (4 x f64: xmin, xmax, ymin, ymax), maximum point count per
//! link (i32), lane-code string table (count + u16-length-prefixed UTF-8
//! strings), then the link count (i32) and that many link records. A record
//! carries the link attributes followed by its polyline; a skeleton file
//! writes a point count of 0 instead and keeps each polyline in a per-link
//! side file (see [GeometryStore]), loaded on demand.
//!
//! The whole stream may additionally be wrapped in a
//! [gzip](https://en.wikipedia.org/wiki/Gzip) or
//! [bzip2](https://en.wikipedia.org/wiki/Bzip2) container, see [FileFormat].

mod geometry_store;

pub use geometry_store::GeometryStore;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{Bounds, Link, Network, Point};

/// Version written into the header of every saved file.
pub const FORMAT_VERSION: i32 = 2;

/// Lane-code string-table index of links without a lane code.
const NO_LANE_CODE: i32 = -1;

/// Container format of a network file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Raw binary.
    #[default]
    Plain,

    /// Binary wrapped in [gzip](https://en.wikipedia.org/wiki/Gzip).
    Gz,

    /// Binary wrapped in [bzip2](https://en.wikipedia.org/wiki/Bzip2).
    Bz2,
}

/// Error which can occur when reading or writing a network file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("unsupported format version {0} (supported: {FORMAT_VERSION})")]
    UnsupportedVersion(i32),

    #[error("invalid UTF-8 in the string table: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("lane code too long for the string table: {0} bytes")]
    StringTooLong(usize),

    #[error("lane-code string index {0} out of range")]
    BadStringIndex(i32),

    #[error("link {link_id} has an invalid point count: {count}")]
    BadPointCount { link_id: i32, count: i32 },

    #[error("link {0} has no geometry loaded")]
    MissingGeometry(i32),

    #[error("the network file is a skeleton, but no geometry directory was configured")]
    MissingConfig,
}

/// Loads a network from a file at the provided path.
pub fn load_from_file<P: AsRef<Path>>(path: P, format: FileFormat) -> Result<Network, StoreError> {
    load(File::open(path)?, format, None)
}

/// Loads a network from a reader. The stream is buffered internally.
pub fn load_from_io<R: Read>(reader: R, format: FileFormat) -> Result<Network, StoreError> {
    load(reader, format, None)
}

/// Loads a network from an in-memory buffer.
pub fn load_from_buffer(data: &[u8], format: FileFormat) -> Result<Network, StoreError> {
    load(data, format, None)
}

/// Loads a skeleton network whose link geometries live in per-link side
/// files under `geometry_dir`. Geometries are fetched lazily, on first use.
pub fn load_skeleton_from_file<P: AsRef<Path>, D: Into<std::path::PathBuf>>(
    path: P,
    format: FileFormat,
    geometry_dir: D,
) -> Result<Network, StoreError> {
    load(
        File::open(path)?,
        format,
        Some(GeometryStore::new(geometry_dir)),
    )
}

/// Saves a network to a file at the provided path. All link geometries must
/// be loaded.
pub fn save_to_file<P: AsRef<Path>>(
    network: &Network,
    path: P,
    format: FileFormat,
) -> Result<(), StoreError> {
    save_to_io(network, File::create(path)?, format)
}

/// Saves a network to a writer. The stream is buffered internally.
pub fn save_to_io<W: Write>(
    network: &Network,
    writer: W,
    format: FileFormat,
) -> Result<(), StoreError> {
    save(network, writer, format, None)
}

/// Saves a network as a skeleton: geometries go into per-link side files
/// under `geometry_dir` (created if absent) and the network file itself only
/// carries the link attributes.
pub fn save_skeleton_to_file<P: AsRef<Path>, D: Into<std::path::PathBuf>>(
    network: &Network,
    path: P,
    format: FileFormat,
    geometry_dir: D,
) -> Result<(), StoreError> {
    let side = GeometryStore::new(geometry_dir);
    std::fs::create_dir_all(side.dir())?;
    save(network, File::create(path)?, format, Some(&side))
}

fn load<R: Read>(
    reader: R,
    format: FileFormat,
    side: Option<GeometryStore>,
) -> Result<Network, StoreError> {
    match format {
        FileFormat::Plain => read_network(&mut BufReader::new(reader), side),
        FileFormat::Gz => read_network(
            &mut BufReader::new(flate2::read::MultiGzDecoder::new(reader)),
            side,
        ),
        FileFormat::Bz2 => read_network(
            &mut BufReader::new(bzip2::read::MultiBzDecoder::new(reader)),
            side,
        ),
    }
}

fn save<W: Write>(
    network: &Network,
    writer: W,
    format: FileFormat,
    side: Option<&GeometryStore>,
) -> Result<(), StoreError> {
    match format {
        FileFormat::Plain => {
            let mut w = BufWriter::new(writer);
            write_network(network, &mut w, side)?;
            w.flush()?;
            Ok(())
        }
        FileFormat::Gz => {
            let mut w = flate2::write::GzEncoder::new(writer, flate2::Compression::default());
            write_network(network, &mut w, side)?;
            w.finish()?;
            Ok(())
        }
        FileFormat::Bz2 => {
            let mut w = bzip2::write::BzEncoder::new(writer, bzip2::Compression::default());
            write_network(network, &mut w, side)?;
            w.finish()?;
            Ok(())
        }
    }
}

fn read_network<R: Read>(r: &mut R, side: Option<GeometryStore>) -> Result<Network, StoreError> {
    let version = r.read_i32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }

    let bounds = Bounds {
        min_x: r.read_f64::<LittleEndian>()?,
        max_x: r.read_f64::<LittleEndian>()?,
        min_y: r.read_f64::<LittleEndian>()?,
        max_y: r.read_f64::<LittleEndian>()?,
    };
    let max_point_count = r.read_i32::<LittleEndian>()?;

    let string_count = r.read_i32::<LittleEndian>()?;
    let mut strings: Vec<Arc<str>> = Vec::with_capacity(string_count.max(0) as usize);
    for _ in 0..string_count {
        let len = r.read_u16::<LittleEndian>()? as usize;
        let mut buf = vec![0u8; len];
        r.read_exact(&mut buf)?;
        strings.push(String::from_utf8(buf)?.into());
    }

    let link_count = r.read_i32::<LittleEndian>()?;
    let mut links = Vec::with_capacity(link_count.max(0) as usize);
    let mut has_skeleton_links = false;
    for _ in 0..link_count {
        let link = read_link(r, &strings, max_point_count)?;
        has_skeleton_links |= link.geometry().is_none();
        links.push(link);
    }

    if has_skeleton_links && side.is_none() {
        return Err(StoreError::MissingConfig);
    }
    Ok(Network::from_store(links, bounds, side))
}

fn read_link<R: Read>(
    r: &mut R,
    strings: &[Arc<str>],
    max_point_count: i32,
) -> Result<Link, StoreError> {
    let id = r.read_i32::<LittleEndian>()?;
    let point_count = r.read_i32::<LittleEndian>()?;
    let direction = r.read_u8()?;
    let road_class = r.read_u8()?;
    let from_rel = r.read_f64::<LittleEndian>()?;
    let to_rel = r.read_f64::<LittleEndian>()?;
    let from_node = r.read_i32::<LittleEndian>()?;
    let to_node = r.read_i32::<LittleEndian>()?;
    let network_group = r.read_i32::<LittleEndian>()?;
    let speed_limit_fwd = r.read_u8()?;
    let speed_limit_rev = r.read_u8()?;
    let cost = r.read_f32::<LittleEndian>()?;
    let reverse_cost = r.read_f32::<LittleEndian>()?;
    let lane_index = r.read_i32::<LittleEndian>()?;

    // 0 marks a skeleton record; anything else must be a plausible polyline.
    if point_count != 0 && (point_count < 2 || point_count > max_point_count) {
        return Err(StoreError::BadPointCount {
            link_id: id,
            count: point_count,
        });
    }

    let mut link = Link::without_geometry(id, from_node, to_node, cost, reverse_cost);
    link.direction = direction;
    link.road_class = road_class;
    link.from_rel = from_rel;
    link.to_rel = to_rel;
    link.network_group = network_group;
    link.speed_limit_fwd = speed_limit_fwd;
    link.speed_limit_rev = speed_limit_rev;
    link.lane_code = match lane_index {
        NO_LANE_CODE => None,
        i => Some(
            strings
                .get(usize::try_from(i).map_err(|_| StoreError::BadStringIndex(i))?)
                .ok_or(StoreError::BadStringIndex(i))?
                .clone(),
        ),
    };

    if point_count > 0 {
        let mut points = Vec::with_capacity(point_count as usize);
        for _ in 0..point_count {
            points.push(Point::new(
                r.read_f64::<LittleEndian>()?,
                r.read_f64::<LittleEndian>()?,
                r.read_f64::<LittleEndian>()?,
            ));
        }
        link.set_geometry(points);
    }
    Ok(link)
}

fn write_network<W: Write>(
    network: &Network,
    w: &mut W,
    side: Option<&GeometryStore>,
) -> Result<(), StoreError> {
    // BTreeMap keeps the output deterministic regardless of map iteration
    // order; the string table is sorted for the same reason.
    let links: BTreeMap<i32, &Link> = network.links().iter().map(|(&id, l)| (id, l)).collect();
    let mut max_point_count = 0i32;
    for (&id, link) in &links {
        let geometry = link.geometry().ok_or(StoreError::MissingGeometry(id))?;
        max_point_count = max_point_count.max(geometry.len() as i32);
    }

    let mut strings: Vec<&str> = links
        .values()
        .filter_map(|l| l.lane_code.as_deref())
        .collect();
    strings.sort_unstable();
    strings.dedup();
    let index_of: BTreeMap<&str, i32> = strings
        .iter()
        .enumerate()
        .map(|(i, &s)| (s, i as i32))
        .collect();

    w.write_i32::<LittleEndian>(FORMAT_VERSION)?;
    let bounds = network.bounds();
    w.write_f64::<LittleEndian>(bounds.min_x)?;
    w.write_f64::<LittleEndian>(bounds.max_x)?;
    w.write_f64::<LittleEndian>(bounds.min_y)?;
    w.write_f64::<LittleEndian>(bounds.max_y)?;
    w.write_i32::<LittleEndian>(max_point_count)?;

    w.write_i32::<LittleEndian>(strings.len() as i32)?;
    for s in &strings {
        let len =
            u16::try_from(s.len()).map_err(|_| StoreError::StringTooLong(s.len()))?;
        w.write_u16::<LittleEndian>(len)?;
        w.write_all(s.as_bytes())?;
    }

    w.write_i32::<LittleEndian>(links.len() as i32)?;
    for link in links.values() {
        write_link(w, link, &index_of, side.is_some())?;
        if let Some(side) = side {
            side.save(link)?;
        }
    }
    Ok(())
}

fn write_link<W: Write>(
    w: &mut W,
    link: &Link,
    index_of: &BTreeMap<&str, i32>,
    skeleton: bool,
) -> Result<(), StoreError> {
    let geometry = link
        .geometry()
        .ok_or(StoreError::MissingGeometry(link.id))?;

    w.write_i32::<LittleEndian>(link.id)?;
    w.write_i32::<LittleEndian>(if skeleton { 0 } else { geometry.len() as i32 })?;
    w.write_u8(link.direction)?;
    w.write_u8(link.road_class)?;
    w.write_f64::<LittleEndian>(link.from_rel)?;
    w.write_f64::<LittleEndian>(link.to_rel)?;
    w.write_i32::<LittleEndian>(link.from_node)?;
    w.write_i32::<LittleEndian>(link.to_node)?;
    w.write_i32::<LittleEndian>(link.network_group)?;
    w.write_u8(link.speed_limit_fwd)?;
    w.write_u8(link.speed_limit_rev)?;
    w.write_f32::<LittleEndian>(link.cost)?;
    w.write_f32::<LittleEndian>(link.reverse_cost)?;
    w.write_i32::<LittleEndian>(
        link.lane_code
            .as_deref()
            .map_or(NO_LANE_CODE, |code| index_of[code]),
    )?;

    if !skeleton {
        for p in geometry {
            w.write_f64::<LittleEndian>(p.x)?;
            w.write_f64::<LittleEndian>(p.y)?;
            w.write_f64::<LittleEndian>(p.z)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IMPASSABLE;

    fn sample_network() -> Network {
        let mut a = Link::new(
            5,
            7,
            13,
            vec![
                Point::new(100.0, 0.0, 0.0),
                Point::new(150.0, 10.0, 1.0),
                Point::new(200.0, 0.0, 0.0),
            ],
            12.5,
            14.0,
        );
        a.direction = 1;
        a.road_class = 3;
        a.from_rel = 0.25;
        a.to_rel = 0.75;
        a.speed_limit_fwd = 50;
        a.speed_limit_rev = 30;
        a.lane_code = Some("2|2".into());

        let mut b = Link::new(
            6,
            13,
            15,
            vec![Point::new(200.0, 0.0, 0.0), Point::new(300.0, 0.0, 0.0)],
            8.0,
            IMPASSABLE,
        );
        b.lane_code = Some("2|2".into());

        let c = Link::new(
            7,
            15,
            7,
            vec![Point::new(300.0, 0.0, 0.0), Point::new(100.0, 0.0, 0.0)],
            20.0,
            20.0,
        );

        Network::new(vec![a, b, c])
    }

    fn assert_networks_equal(loaded: &Network, original: &Network) {
        assert_eq!(loaded.links().len(), original.links().len());
        for (id, want) in original.links() {
            let got = loaded.links().get(id).unwrap();
            assert_eq!(got.from_node, want.from_node);
            assert_eq!(got.to_node, want.to_node);
            assert_eq!(got.direction, want.direction);
            assert_eq!(got.road_class, want.road_class);
            assert_eq!(got.from_rel, want.from_rel);
            assert_eq!(got.to_rel, want.to_rel);
            assert_eq!(got.speed_limit_fwd, want.speed_limit_fwd);
            assert_eq!(got.speed_limit_rev, want.speed_limit_rev);
            assert_eq!(got.cost, want.cost);
            assert_eq!(got.reverse_cost, want.reverse_cost);
            assert_eq!(got.lane_code, want.lane_code);
            assert_eq!(got.network_group, want.network_group);
            assert_eq!(got.geometry(), want.geometry());
        }
        assert_eq!(loaded.bounds(), original.bounds());
    }

    #[test]
    fn saved_networks_load_back_identically() {
        let network = sample_network();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.bin");

        save_to_file(&network, &path, FileFormat::Plain).unwrap();
        let loaded = load_from_file(&path, FileFormat::Plain).unwrap();
        assert_networks_equal(&loaded, &network);
    }

    #[test]
    fn compressed_containers_are_transparent() {
        let network = sample_network();
        for format in [FileFormat::Gz, FileFormat::Bz2] {
            let mut buffer = Vec::new();
            save_to_io(&network, &mut buffer, format).unwrap();
            let loaded = load_from_buffer(&buffer, format).unwrap();
            assert_networks_equal(&loaded, &network);
        }
    }

    #[test]
    fn lane_codes_are_interned_on_load() {
        let network = sample_network();
        let mut buffer = Vec::new();
        save_to_io(&network, &mut buffer, FileFormat::Plain).unwrap();
        let loaded = load_from_buffer(&buffer, FileFormat::Plain).unwrap();

        let a = loaded.links().get(&5).unwrap().lane_code.clone().unwrap();
        let b = loaded.links().get(&6).unwrap().lane_code.clone().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&99i32.to_le_bytes());
        buffer.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            load_from_buffer(&buffer, FileFormat::Plain),
            Err(StoreError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn skeletons_keep_geometry_in_side_files() {
        let network = sample_network();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.bin");
        let geometry_dir = dir.path().join("geometry");

        save_skeleton_to_file(&network, &path, FileFormat::Plain, &geometry_dir).unwrap();
        assert!(geometry_dir.join("5.geom").is_file());
        assert!(geometry_dir.join("6.geom").is_file());
        assert!(geometry_dir.join("7.geom").is_file());

        // Loading a skeleton without a geometry directory cannot work.
        assert!(matches!(
            load_from_file(&path, FileFormat::Plain),
            Err(StoreError::MissingConfig)
        ));

        let loaded = load_skeleton_from_file(&path, FileFormat::Plain, &geometry_dir).unwrap();
        assert!(loaded.links().get(&5).unwrap().geometry().is_none());

        // Geometry appears on demand and matches the original.
        let link = loaded.require_geometry(5).unwrap();
        assert_eq!(
            link.geometry(),
            network.links().get(&5).unwrap().geometry()
        );
    }
}
