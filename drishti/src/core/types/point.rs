//! Point, color and pose types for 3D perception.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A 3D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters (lateral)
    pub y: f32,
    /// Z coordinate in meters (vertical)
    pub z: f32,
}

impl Point3D {
    /// Origin.
    pub const ZERO: Point3D = Point3D {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance to another point (avoids sqrt).
    #[inline]
    pub fn distance_squared(&self, other: &Point3D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point3D) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Coordinate along an axis.
    #[inline]
    pub fn coord(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Array form used by the spatial index.
    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Check that all coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Point3D {
    type Output = Point3D;

    #[inline]
    fn add(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3D {
    type Output = Point3D;

    #[inline]
    fn sub(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Point3D {
    type Output = Point3D;

    #[inline]
    fn mul(self, rhs: f32) -> Point3D {
        Point3D::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Cartesian axis selector for pass-through crops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Axis name as used in logs and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// White, used for geometry-only clouds.
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    #[inline]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pack into the `0x00RRGGBB` layout used by PCD `rgb` fields.
    #[inline]
    pub fn to_packed(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Unpack from `0x00RRGGBB`.
    #[inline]
    pub fn from_packed(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: (packed & 0xFF) as u8,
        }
    }
}

/// A colored cloud point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CloudPoint {
    /// Position in meters
    pub position: Point3D,
    /// Sensor color
    pub color: Rgb,
}

impl CloudPoint {
    #[inline]
    pub fn new(position: Point3D, color: Rgb) -> Self {
        Self { position, color }
    }

    /// Shorthand for a point from raw coordinates.
    #[inline]
    pub fn xyz_rgb(x: f32, y: f32, z: f32, color: Rgb) -> Self {
        Self {
            position: Point3D::new(x, y, z),
            color,
        }
    }
}

/// Position of a pose, in the ROS `geometry_msgs/Point` layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation quaternion, in the ROS `geometry_msgs/Quaternion` layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// Pick or place pose.
///
/// Only the position is filled by the orchestrator; the orientation is left
/// zeroed and the pick-place routine chooses the grasp.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    pub orientation: Orientation,
}

impl Pose {
    /// Pose at a position with zeroed orientation.
    pub fn from_position(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Position { x, y, z },
            orientation: Orientation::default(),
        }
    }

    /// Pose at a cloud point.
    pub fn from_point(point: Point3D) -> Self {
        Self::from_position(point.x as f64, point.y as f64, point.z as f64)
    }

    /// Check that every component is finite.
    pub fn is_finite(&self) -> bool {
        let p = &self.position;
        let o = &self.orientation;
        [p.x, p.y, p.z, o.x, o.y, o.z, o.w]
            .iter()
            .all(|v| v.is_finite())
    }
}
