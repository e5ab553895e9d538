//! Core data types for perception and orchestration.
//!
//! Geometry:
//! - [`Point3D`]: 3D point in meters
//! - [`Rgb`]: 8-bit color
//! - [`CloudPoint`]: colored point
//! - [`PointCloud3D`]: named, timestamped cloud
//! - [`Normal3`]: unit surface normal
//!
//! Manipulation:
//! - [`Pose`]: pick/place pose in ROS message layout
//! - [`JointState`]: measured joint angles
//! - [`DetectedObject`]: classified cluster with cached centroid

mod cloud;
mod joint;
mod object;
mod point;

pub use cloud::PointCloud3D;
pub use joint::JointState;
pub use object::DetectedObject;
pub use point::{Axis, CloudPoint, Orientation, Point3D, Pose, Position, Rgb};

/// Unit surface normal.
pub type Normal3 = nalgebra::Vector3<f32>;
