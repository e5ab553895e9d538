//! ASCII PCD files: diagnostic dumps and offline cloud input.
//!
//! Written layout:
//!
//! ```text
//! # .PCD v0.7 - Point Cloud Data file format
//! VERSION 0.7
//! FIELDS x y z rgb
//! SIZE 4 4 4 4
//! TYPE F F F U
//! COUNT 1 1 1 1
//! WIDTH <n>
//! HEIGHT 1
//! VIEWPOINT 0 0 0 1 0 0 0
//! POINTS <n>
//! DATA ascii
//! <x> <y> <z> <0x00RRGGBB as integer>
//! ```
//!
//! The reader accepts `x y z` with an optional `rgb`/`rgba` field stored
//! either as an integer (`U`) or as a float carrying the packed bits (`F`).

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::types::{CloudPoint, PointCloud3D, Rgb};
use crate::error::{DrishtiError, Result};

/// Write a cloud as ASCII PCD, failing if the file already exists.
pub fn write_pcd_new(path: &Path, cloud: &PointCloud3D) -> Result<()> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut out = BufWriter::new(file);
    let n = cloud.len();

    writeln!(out, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(out, "VERSION 0.7")?;
    writeln!(out, "FIELDS x y z rgb")?;
    writeln!(out, "SIZE 4 4 4 4")?;
    writeln!(out, "TYPE F F F U")?;
    writeln!(out, "COUNT 1 1 1 1")?;
    writeln!(out, "WIDTH {n}")?;
    writeln!(out, "HEIGHT 1")?;
    writeln!(out, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(out, "POINTS {n}")?;
    writeln!(out, "DATA ascii")?;
    for p in &cloud.points {
        writeln!(
            out,
            "{} {} {} {}",
            p.position.x,
            p.position.y,
            p.position.z,
            p.color.to_packed()
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Column layout parsed from a PCD header.
struct PcdLayout {
    x: usize,
    y: usize,
    z: usize,
    rgb: Option<(usize, bool)>,
    points: Option<usize>,
}

fn parse_error(path: &Path, msg: impl std::fmt::Display) -> DrishtiError {
    DrishtiError::Serialization(format!("{}: {}", path.display(), msg))
}

/// Read an ASCII PCD file.
///
/// The cloud is named after the file stem.
pub fn read_pcd(path: impl AsRef<Path>) -> Result<PointCloud3D> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let mut lines = contents.lines();

    let mut fields: Vec<String> = Vec::new();
    let mut types: Vec<String> = Vec::new();
    let mut points = None;

    for line in lines.by_ref() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else { continue };
        match key.to_ascii_uppercase().as_str() {
            "FIELDS" => fields = parts.map(str::to_string).collect(),
            "TYPE" => types = parts.map(str::to_string).collect(),
            "POINTS" => {
                let count = parts
                    .next()
                    .and_then(|v| v.parse::<usize>().ok())
                    .ok_or_else(|| parse_error(path, "bad POINTS line"))?;
                points = Some(count);
            }
            "DATA" => {
                let kind = parts.next().unwrap_or_default();
                if kind != "ascii" {
                    return Err(parse_error(path, format!("unsupported DATA '{kind}'")));
                }
                break;
            }
            _ => {}
        }
    }

    let column = |name: &str| fields.iter().position(|f| f == name);
    let layout = PcdLayout {
        x: column("x").ok_or_else(|| parse_error(path, "missing field x"))?,
        y: column("y").ok_or_else(|| parse_error(path, "missing field y"))?,
        z: column("z").ok_or_else(|| parse_error(path, "missing field z"))?,
        rgb: column("rgb").or_else(|| column("rgba")).map(|i| {
            let is_float = types.get(i).is_some_and(|t| t == "F");
            (i, is_float)
        }),
        points,
    };

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("cloud")
        .to_string();
    let mut cloud = PointCloud3D::with_capacity(name, 0, layout.points.unwrap_or(0));

    for (line_no, line) in lines.enumerate() {
        let values: Vec<&str> = line.split_whitespace().collect();
        if values.is_empty() {
            continue;
        }
        let coord = |i: usize| -> Result<f32> {
            values
                .get(i)
                .and_then(|v| v.parse::<f32>().ok())
                .ok_or_else(|| parse_error(path, format!("bad value on data line {}", line_no + 1)))
        };
        let color = match layout.rgb {
            Some((i, true)) => Rgb::from_packed(coord(i)?.to_bits()),
            Some((i, false)) => {
                let packed = values
                    .get(i)
                    .and_then(|v| v.parse::<u32>().ok())
                    .ok_or_else(|| parse_error(path, format!("bad rgb on data line {}", line_no + 1)))?;
                Rgb::from_packed(packed)
            }
            None => Rgb::WHITE,
        };
        cloud.push(CloudPoint::xyz_rgb(
            coord(layout.x)?,
            coord(layout.y)?,
            coord(layout.z)?,
            color,
        ));
    }

    if let Some(expected) = layout.points
        && expected != cloud.len()
    {
        log::warn!(
            "{}: header declares {} points, read {}",
            path.display(),
            expected,
            cloud.len()
        );
    }
    Ok(cloud)
}

/// Writes stage clouds to `<dir>/<stage>.pcd`, once per stage.
///
/// An existing file is never overwritten, so the first frame of a run is
/// what ends up on disk. Without a directory the dumper does nothing.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticDumper {
    dir: Option<PathBuf>,
}

impl DiagnosticDumper {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Dumper that never writes.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Dump one stage. Returns `true` if a file was written.
    ///
    /// Write failures are logged, never returned.
    pub fn dump(&self, stage: &str, cloud: &PointCloud3D) -> bool {
        let Some(dir) = &self.dir else {
            return false;
        };
        let path = dir.join(format!("{stage}.pcd"));
        if path.exists() {
            return false;
        }
        if let Err(e) = fs::create_dir_all(dir) {
            log::warn!("Cannot create dump directory {}: {}", dir.display(), e);
            return false;
        }
        match write_pcd_new(&path, cloud) {
            Ok(()) => {
                log::debug!("Dumped {} ({} points)", path.display(), cloud.len());
                true
            }
            Err(DrishtiError::Io(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => false,
            Err(e) => {
                log::warn!("Failed to dump {}: {}", path.display(), e);
                false
            }
        }
    }
}
