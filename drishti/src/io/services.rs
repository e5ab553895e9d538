//! External collaborator interfaces.
//!
//! The node talks to the rest of the robot through these traits:
//!
//! ```text
//!              ┌──────────────────────────┐
//!   normals ◄──┤                          ├──► NodePublisher (clouds, markers,
//!              │         PickNode         │                   objects, map,
//!   clear   ◄──┤                          │                   joint command)
//!   map        │                          │
//!   pick    ◄──┤                          │
//!   place      └──────────────────────────┘
//! ```
//!
//! In-process implementations:
//! - [`PcaNormalEstimator`]: local normal estimation
//! - [`LogPublisher`]: logs every publication
//! - [`RecordingPublisher`]: keeps publications for inspection (tests, replay)

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::types::{DetectedObject, Normal3, PointCloud3D};
use crate::engine::pick::PickRequest;
use crate::error::Result;
use crate::perception::{LabelMarker, PcaNormalEstimator};

/// Per-point surface normals for a cluster.
pub trait NormalEstimationService: Send {
    /// One normal per point of `cloud`, in point order.
    fn get_normals(&self, cloud: &PointCloud3D) -> Result<Vec<Normal3>>;
}

impl NormalEstimationService for PcaNormalEstimator {
    fn get_normals(&self, cloud: &PointCloud3D) -> Result<Vec<Normal3>> {
        Ok(self.estimate(cloud))
    }
}

/// Motion planner's collision map.
pub trait CollisionMapService: Send {
    /// Drop everything the planner currently treats as an obstacle.
    fn clear(&self) -> Result<()>;
}

/// Pick-and-place motion routine.
pub trait PickPlaceService: Send {
    /// Block until the routine is reachable, or fail after `timeout`.
    fn wait_for_service(&self, timeout: Duration) -> Result<()>;

    /// Execute one pick-and-place; `Ok(false)` when the routine reports failure.
    fn pick_place(&self, request: &PickRequest) -> Result<bool>;
}

/// Output topics of the node.
pub trait NodePublisher: Send {
    fn publish_objects(&self, cloud: &PointCloud3D);
    fn publish_table(&self, cloud: &PointCloud3D);
    fn publish_cluster_cloud(&self, cloud: &PointCloud3D);
    fn publish_label(&self, marker: &LabelMarker);
    fn publish_detected_objects(&self, objects: &[DetectedObject]);
    fn publish_collision_map(&self, cloud: &PointCloud3D);
    fn publish_joint_command(&self, angle: f64);
}

/// Publisher that only logs.
#[derive(Debug, Clone, Default)]
pub struct LogPublisher;

impl NodePublisher for LogPublisher {
    fn publish_objects(&self, cloud: &PointCloud3D) {
        log::debug!("objects: {} points", cloud.len());
    }

    fn publish_table(&self, cloud: &PointCloud3D) {
        log::debug!("table: {} points", cloud.len());
    }

    fn publish_cluster_cloud(&self, cloud: &PointCloud3D) {
        log::debug!("cluster cloud: {} points", cloud.len());
    }

    fn publish_label(&self, marker: &LabelMarker) {
        log::debug!(
            "label #{} '{}' at ({:.3}, {:.3}, {:.3})",
            marker.id,
            marker.text,
            marker.position.x,
            marker.position.y,
            marker.position.z
        );
    }

    fn publish_detected_objects(&self, objects: &[DetectedObject]) {
        log::debug!("detected objects: {}", objects.len());
    }

    fn publish_collision_map(&self, cloud: &PointCloud3D) {
        log::info!("Collision map: {} points", cloud.len());
    }

    fn publish_joint_command(&self, angle: f64) {
        log::info!("World joint command: {:.4} rad", angle);
    }
}

/// Everything a [`RecordingPublisher`] has seen.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub objects: Vec<PointCloud3D>,
    pub tables: Vec<PointCloud3D>,
    pub cluster_clouds: Vec<PointCloud3D>,
    pub labels: Vec<LabelMarker>,
    pub detected: Vec<Vec<String>>,
    pub collision_maps: Vec<PointCloud3D>,
    pub joint_commands: Vec<f64>,
}

/// Publisher that keeps every publication.
///
/// Clones share one recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the recording so far.
    pub fn snapshot(&self) -> Recording {
        self.inner.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn record(&self, f: impl FnOnce(&mut Recording)) {
        if let Ok(mut rec) = self.inner.lock() {
            f(&mut rec);
        }
    }
}

impl NodePublisher for RecordingPublisher {
    fn publish_objects(&self, cloud: &PointCloud3D) {
        self.record(|r| r.objects.push(cloud.clone()));
    }

    fn publish_table(&self, cloud: &PointCloud3D) {
        self.record(|r| r.tables.push(cloud.clone()));
    }

    fn publish_cluster_cloud(&self, cloud: &PointCloud3D) {
        self.record(|r| r.cluster_clouds.push(cloud.clone()));
    }

    fn publish_label(&self, marker: &LabelMarker) {
        self.record(|r| r.labels.push(marker.clone()));
    }

    fn publish_detected_objects(&self, objects: &[DetectedObject]) {
        let labels = objects.iter().map(|o| o.label.clone()).collect();
        self.record(|r| r.detected.push(labels));
    }

    fn publish_collision_map(&self, cloud: &PointCloud3D) {
        self.record(|r| r.collision_maps.push(cloud.clone()));
    }

    fn publish_joint_command(&self, angle: f64) {
        self.record(|r| r.joint_commands.push(angle));
    }
}
