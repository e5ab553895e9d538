//! Core foundation layer.
//!
//! This is the bottom layer of the stack with no internal dependencies.
//! All other layers depend on core.
//!
//! # Contents
//!
//! - [`types`]: Core data types (points, clouds, poses, joint states)
//! - [`math`]: Statistics, color conversion and histograms

pub mod math;
pub mod types;
