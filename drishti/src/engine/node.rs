//! The pick node: one context owning all per-run state.
//!
//! ```text
//!            point cloud                      joint state
//!                 │                                │
//!                 ▼                                ▼
//!        ┌─────────────────┐             ┌──────────────────┐
//!        │ on_point_cloud  │             │ on_joint_state   │
//!        │  pipeline       │             │  TurnStateMachine│──► joint command
//!        │  obstacle map   │──► map      │                  │──► TurnSignal
//!        │  orchestrator   │──► picks    └──────────────────┘
//!        └─────────────────┘
//! ```
//!
//! Handlers run one at a time on the dispatcher thread, so the node needs
//! no locks. Only the [`TurnSignal`] is shared with other threads.

use std::path::Path;

use super::obstacle_map::ObstacleMap;
use super::pick::{PickContext, PickOrchestrator, PickSummary};
use super::pipeline::{FrameResult, PerceptionPipeline};
use super::turn::{TurnEvent, TurnSignal, TurnStateMachine};
use crate::classification::{ModelBundle, ObjectClassifier};
use crate::config::DrishtiConfig;
use crate::core::types::{JointState, PointCloud3D};
use crate::error::Result;
use crate::io::params::{Dropboxes, PickListEntry, load_dropboxes, load_pick_list};
use crate::io::pcd::DiagnosticDumper;
use crate::io::services::{
    CollisionMapService, NodePublisher, NormalEstimationService, PickPlaceService,
};

/// External collaborators of the node.
pub struct NodeServices {
    pub normals: Box<dyn NormalEstimationService>,
    pub collision_map: Box<dyn CollisionMapService>,
    pub pick_place: Box<dyn PickPlaceService>,
    pub publisher: Box<dyn NodePublisher>,
}

/// Task inputs loaded at startup.
pub struct TaskParams {
    pub model: ModelBundle,
    pub pick_list: Vec<PickListEntry>,
    pub dropboxes: Dropboxes,
}

impl TaskParams {
    /// Load model, pick list and dropboxes from the configured paths.
    pub fn load(config: &DrishtiConfig) -> Result<Self> {
        Ok(Self {
            model: ModelBundle::load(&config.model.path)?,
            pick_list: load_pick_list(&config.pick.pick_list)?,
            dropboxes: load_dropboxes(&config.pick.dropbox)?,
        })
    }
}

/// What one point cloud produced.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub frame: u64,
    pub labels: Vec<String>,
    pub table_points: usize,
    pub obstacle_points: usize,
    pub picks: PickSummary,
}

/// Per-run orchestration context.
pub struct PickNode {
    pipeline: PerceptionPipeline,
    obstacle_map: ObstacleMap,
    turn: TurnStateMachine,
    turn_signal: TurnSignal,
    orchestrator: PickOrchestrator,
    services: NodeServices,
    dumper: DiagnosticDumper,
    frames: u64,
}

impl PickNode {
    /// Build the node; fails on any invalid startup input.
    pub fn new(config: &DrishtiConfig, params: TaskParams, services: NodeServices) -> Result<Self> {
        let classifier = ObjectClassifier::new(params.model, config.feature_config())?;
        let turn = TurnStateMachine::new(config.turn_sequence()?).with_tolerance(config.turn.tolerance);
        let orchestrator =
            PickOrchestrator::new(config.pick_config()?, params.pick_list, params.dropboxes);

        log::info!(
            "Pick node ready: {} pick list entries, {} classes",
            orchestrator.pick_list().len(),
            classifier.model().classes.len()
        );

        Ok(Self {
            pipeline: PerceptionPipeline::new(config.pipeline_config(), classifier),
            obstacle_map: ObstacleMap::new(),
            turn,
            turn_signal: TurnSignal::new(),
            orchestrator,
            services,
            dumper: DiagnosticDumper::new(config.output.dump_dir.clone()),
            frames: 0,
        })
    }

    /// Handle with which other threads await the end of the turn.
    pub fn turn_signal(&self) -> TurnSignal {
        self.turn_signal.clone()
    }

    pub fn is_turning_done(&self) -> bool {
        self.turn.is_done()
    }

    pub fn obstacle_map(&self) -> &ObstacleMap {
        &self.obstacle_map
    }

    /// Drop the accumulated obstacle map; the next table starts it afresh.
    pub fn clear_obstacle_map(&mut self) {
        let dropped = self.obstacle_map.len();
        self.obstacle_map.clear();
        if let Err(e) = self.services.collision_map.clear() {
            log::warn!("Collision map clear failed: {}", e);
        }
        log::info!("Obstacle map cleared ({} points dropped)", dropped);
    }

    pub fn records_path(&self) -> &Path {
        &self.orchestrator.config().output_path
    }

    /// Full perception, map update and (once turned) pick run for one cloud.
    pub fn on_point_cloud(&mut self, cloud: &PointCloud3D) -> FrameReport {
        self.frames += 1;
        let frame = self.pipeline.process(cloud, self.services.normals.as_ref());
        self.dump(cloud, &frame);

        let publisher = self.services.publisher.as_ref();
        publisher.publish_objects(&frame.segmentation.objects);
        publisher.publish_table(&frame.segmentation.table);
        publisher.publish_cluster_cloud(&frame.cluster_cloud);
        for marker in &frame.labels {
            publisher.publish_label(marker);
        }
        publisher.publish_detected_objects(&frame.objects);

        self.obstacle_map.accumulate_table(&frame.segmentation.table);
        if let Err(e) = self.services.collision_map.clear() {
            log::warn!("Collision map clear failed: {}", e);
        }
        publisher.publish_collision_map(self.obstacle_map.cloud());

        let ctx = PickContext {
            obstacle_map: &self.obstacle_map,
            collision_map: self.services.collision_map.as_ref(),
            pick_place: self.services.pick_place.as_ref(),
            publisher,
        };
        let picks = self.orchestrator.run(self.turn.is_done(), &frame.objects, &ctx);

        FrameReport {
            frame: self.frames,
            labels: frame.objects.iter().map(|o| o.label.clone()).collect(),
            table_points: frame.segmentation.table.len(),
            obstacle_points: self.obstacle_map.len(),
            picks,
        }
    }

    /// Advance the turn on a joint state; publishes the next command or
    /// fires the turn signal.
    pub fn on_joint_state(&mut self, state: &JointState) -> TurnEvent {
        let Some(angle) = state.last_position() else {
            log::debug!("Joint state without positions ignored");
            return TurnEvent::Ignored;
        };

        let event = self.turn.on_joint_state(angle);
        match event {
            TurnEvent::Command(next) => self.services.publisher.publish_joint_command(next),
            TurnEvent::Finished => self.turn_signal.complete(),
            TurnEvent::Ignored => {}
        }
        event
    }

    fn dump(&self, raw: &PointCloud3D, frame: &FrameResult) {
        if !self.dumper.is_enabled() {
            return;
        }
        let seg = &frame.segmentation;
        let stages = [
            ("original", raw),
            ("no_outlier", &frame.stages.no_outliers),
            ("downsampled", &frame.stages.downsampled),
            ("passthrough", &frame.stages.cropped),
            ("table", &seg.table),
            ("objects_pre", &seg.objects_unclipped),
            ("objects", &seg.objects),
            ("cluster_cloud", &frame.cluster_cloud),
        ];
        for (name, cloud) in stages {
            self.dumper.dump(name, cloud);
        }
    }
}
