//! Pick orchestration.
//!
//! Once the turn is done, every frame's detections are matched against the
//! pick list and turned into pick-and-place requests:
//!
//! ```text
//! for entry in pick list:
//!     object = detections[entry.name]        (missing → skip)
//!     arm    = left if entry.group == left_group else right
//!     place  = dropbox of that arm
//!     record request
//!     wait for pick service
//!     clear collision map
//!     publish table ∪ objects still on the table (minus this one)
//!     call pick-place, record outcome
//! write records
//! ```
//!
//! A failing entry never stops the ones after it.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::obstacle_map::ObstacleMap;
use crate::core::types::{DetectedObject, Pose};
use crate::error::{DrishtiError, Result};
use crate::io::output::{PickRecord, write_records};
use crate::io::params::{Dropboxes, PickListEntry};
use crate::io::services::{CollisionMapService, NodePublisher, PickPlaceService};

/// Which arm performs a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    Left,
    Right,
}

impl Arm {
    /// Left for the left arm's group, right for everything else.
    pub fn for_group(group: &str, left_group: &str) -> Self {
        if group == left_group {
            Arm::Left
        } else {
            Arm::Right
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arm::Left => "left",
            Arm::Right => "right",
        }
    }
}

/// A validated pick-and-place request.
///
/// Only constructible through [`PickRequest::new`]; immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PickRequest {
    scene_id: u32,
    object_name: String,
    arm: Arm,
    pick_pose: Pose,
    place_pose: Pose,
}

impl PickRequest {
    /// Build a request; the name must be non-empty and both poses finite.
    pub fn new(
        scene_id: u32,
        object_name: impl Into<String>,
        arm: Arm,
        pick_pose: Pose,
        place_pose: Pose,
    ) -> Result<Self> {
        let object_name = object_name.into();
        if object_name.trim().is_empty() {
            return Err(DrishtiError::Params("pick request without object name".to_string()));
        }
        if !pick_pose.is_finite() || !place_pose.is_finite() {
            return Err(DrishtiError::Params(format!(
                "non-finite pose in pick request for '{object_name}'"
            )));
        }
        Ok(Self {
            scene_id,
            object_name,
            arm,
            pick_pose,
            place_pose,
        })
    }

    pub fn scene_id(&self) -> u32 {
        self.scene_id
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn arm(&self) -> Arm {
        self.arm
    }

    pub fn pick_pose(&self) -> &Pose {
        &self.pick_pose
    }

    pub fn place_pose(&self) -> &Pose {
        &self.place_pose
    }
}

/// Configuration for pick orchestration.
#[derive(Debug, Clone)]
pub struct PickConfig {
    /// Scene number written into every request.
    ///
    /// Default: 3
    pub scene_id: u32,

    /// Pick-list group handled by the left arm.
    ///
    /// Default: "red"
    pub left_group: String,

    /// Bounded wait for the pick-place service before each call.
    ///
    /// Default: 5s
    pub service_timeout: Duration,

    /// Where request records are written.
    pub output_path: PathBuf,

    /// Skip pick-list entries already attempted in an earlier frame.
    ///
    /// Default: true
    pub skip_already_picked: bool,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            scene_id: 3,
            left_group: "red".to_string(),
            service_timeout: Duration::from_secs(5),
            output_path: PathBuf::from("output_3.yaml"),
            skip_already_picked: true,
        }
    }
}

/// Outcome of one pick-place call.
#[derive(Debug, Clone, PartialEq)]
pub struct PickAttempt {
    pub object_name: String,
    pub arm: Arm,
    pub success: bool,
    /// Service error, if the call did not complete
    pub error: Option<String>,
}

/// Everything one orchestration run did.
#[derive(Debug, Clone, Default)]
pub struct PickSummary {
    /// Requests built this run, in pick-list order
    pub records: Vec<PickRecord>,
    /// Pick-place outcomes, in pick-list order
    pub attempts: Vec<PickAttempt>,
    /// Pick-list entries without a matching detection
    pub unresolved: Vec<String>,
    /// Pick-list entries skipped because an earlier frame handled them
    pub already_picked: Vec<String>,
    /// Output file write error, if any
    pub output_error: Option<String>,
}

impl PickSummary {
    pub fn successes(&self) -> usize {
        self.attempts.iter().filter(|a| a.success).count()
    }
}

/// Services and shared state the orchestrator acts through.
pub struct PickContext<'a> {
    pub obstacle_map: &'a ObstacleMap,
    pub collision_map: &'a dyn CollisionMapService,
    pub pick_place: &'a dyn PickPlaceService,
    pub publisher: &'a dyn NodePublisher,
}

/// Turns detections into pick requests.
pub struct PickOrchestrator {
    config: PickConfig,
    pick_list: Vec<PickListEntry>,
    dropboxes: Dropboxes,
    picked: HashSet<String>,
    history: Vec<PickRecord>,
}

impl PickOrchestrator {
    pub fn new(config: PickConfig, pick_list: Vec<PickListEntry>, dropboxes: Dropboxes) -> Self {
        Self {
            config,
            pick_list,
            dropboxes,
            picked: HashSet::new(),
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &PickConfig {
        &self.config
    }

    pub fn pick_list(&self) -> &[PickListEntry] {
        &self.pick_list
    }

    /// Labels attempted so far.
    pub fn picked(&self) -> &HashSet<String> {
        &self.picked
    }

    /// Run the pick list against one frame's detections.
    ///
    /// Does nothing until `turning_done`.
    pub fn run(
        &mut self,
        turning_done: bool,
        detected: &[DetectedObject],
        ctx: &PickContext<'_>,
    ) -> PickSummary {
        let mut summary = PickSummary::default();
        if !turning_done {
            return summary;
        }

        // Last detection wins when labels repeat
        let mut by_label: BTreeMap<&str, &DetectedObject> = BTreeMap::new();
        for object in detected {
            by_label.insert(object.label.as_str(), object);
        }
        let mut remaining = by_label.clone();

        for (i, entry) in self.pick_list.iter().enumerate() {
            log::info!("Pick list entry {}: {}", i, entry.name);

            if self.config.skip_already_picked && self.picked.contains(&entry.name) {
                log::debug!("'{}' already attempted, skipping", entry.name);
                summary.already_picked.push(entry.name.clone());
                continue;
            }

            let Some(object) = by_label.get(entry.name.as_str()) else {
                log::info!("Couldn't find '{}' among detections", entry.name);
                summary.unresolved.push(entry.name.clone());
                continue;
            };
            remaining.remove(entry.name.as_str());

            let arm = Arm::for_group(&entry.group, &self.config.left_group);
            let [px, py, pz] = self.dropboxes.position_for(arm);
            let request = match PickRequest::new(
                self.config.scene_id,
                entry.name.clone(),
                arm,
                Pose::from_point(object.centroid()),
                Pose::from_position(px, py, pz),
            ) {
                Ok(request) => request,
                Err(e) => {
                    log::warn!("Skipping '{}': {}", entry.name, e);
                    continue;
                }
            };
            summary.records.push(PickRecord::from(&request));
            self.picked.insert(entry.name.clone());

            let attempt = Self::execute(&request, &remaining, ctx, self.config.service_timeout);
            summary.attempts.push(attempt);
        }

        self.remember(&summary.records);
        if let Err(e) = write_records(&self.config.output_path, &self.history) {
            log::error!(
                "Failed to write pick records to {}: {}",
                self.config.output_path.display(),
                e
            );
            summary.output_error = Some(e.to_string());
        }

        log::info!(
            "Pick run: {} requests, {} succeeded, {} not found",
            summary.records.len(),
            summary.successes(),
            summary.unresolved.len()
        );
        summary
    }

    /// Wait for the routine, refresh the collision map, call pick-place.
    fn execute(
        request: &PickRequest,
        remaining: &BTreeMap<&str, &DetectedObject>,
        ctx: &PickContext<'_>,
        timeout: Duration,
    ) -> PickAttempt {
        let mut attempt = PickAttempt {
            object_name: request.object_name().to_string(),
            arm: request.arm(),
            success: false,
            error: None,
        };

        if let Err(e) = ctx.pick_place.wait_for_service(timeout) {
            log::error!("Pick-place routine unavailable: {}", e);
            attempt.error = Some(e.to_string());
            return attempt;
        }

        if let Err(e) = ctx.collision_map.clear() {
            log::warn!("Collision map clear failed: {}", e);
        }
        let map = ctx
            .obstacle_map
            .with_remaining_objects(remaining.values().map(|o| &o.cloud));
        ctx.publisher.publish_collision_map(&map);

        match ctx.pick_place.pick_place(request) {
            Ok(success) => {
                log::info!(
                    "Pick-place '{}' with {} arm: {}",
                    request.object_name(),
                    request.arm().as_str(),
                    if success { "success" } else { "failure" }
                );
                attempt.success = success;
            }
            Err(e) => {
                log::warn!("Pick-place call for '{}' failed: {}", request.object_name(), e);
                attempt.error = Some(e.to_string());
            }
        }
        attempt
    }

    /// Keep one record per object, the latest replacing earlier ones.
    fn remember(&mut self, records: &[PickRecord]) {
        for record in records {
            match self
                .history
                .iter_mut()
                .find(|r| r.object_name == record.object_name)
            {
                Some(existing) => *existing = record.clone(),
                None => self.history.push(record.clone()),
            }
        }
    }
}
