//! Drishti - Tabletop perception and pick orchestration for a mobile manipulator
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      main                           │  ← Node binary
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │   (services, dispatcher, sim, pcd, params, output)  │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │     (pipeline, obstacle map, turn, pick, node)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                classification/                      │  ← Recognition
//! │              (features, model)                      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  perception/                        │  ← Cloud processing
//! │   (filters, segmentation, clustering, normals)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Per-frame flow
//!
//! 1. Outlier removal, voxel downsampling and a height crop clean the cloud
//! 2. RANSAC splits the table plane from the objects above it
//! 3. Euclidean clustering separates the objects
//! 4. Color and normal histograms label each cluster
//! 5. The table is added to the obstacle map
//! 6. Once the body has turned left and right, each pick list entry that
//!    was detected becomes a pick-place request

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;
pub mod error;

// ============================================================================
// Layer 2: Perception (depends on core)
// ============================================================================
pub mod perception;

// ============================================================================
// Layer 3: Classification (depends on core)
// ============================================================================
pub mod classification;

// ============================================================================
// Layer 4: Engine (depends on core, perception, classification, io traits)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 5: I/O infrastructure and configuration
// ============================================================================
pub mod config;
pub mod io;
pub mod utils;

// ============================================================================
// Convenience re-exports
// ============================================================================

pub use config::DrishtiConfig;
pub use core::types::{CloudPoint, DetectedObject, JointState, Point3D, PointCloud3D, Pose, Rgb};
pub use engine::{PerceptionPipeline, PickNode, PickOrchestrator, TurnStateMachine};
pub use error::{DrishtiError, Result};
