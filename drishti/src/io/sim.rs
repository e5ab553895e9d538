//! In-process stand-ins for the robot, used for offline replay.
//!
//! ```text
//!   CloudReplay ─────────────► NodeEvent::PointCloud ──┐
//!                                                      ├──► dispatcher
//!   SimulatedRobot ──────────► NodeEvent::JointState ──┘
//!        ▲
//!        └──── joint command ◄── CommandForwarder (NodePublisher)
//! ```
//!
//! The simulated body rotates toward the last commanded world joint angle at
//! a fixed speed and lands exactly on it, so the turn state machine sees each
//! target within tolerance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use super::dispatcher::NodeEvent;
use super::services::{CollisionMapService, NodePublisher, PickPlaceService};
use crate::core::types::{CloudPoint, DetectedObject, JointState, Point3D, PointCloud3D, Rgb};
use crate::engine::pick::PickRequest;
use crate::error::Result;
use crate::perception::LabelMarker;

/// Name of the body rotation joint.
pub const WORLD_JOINT: &str = "world_joint";

// ============================================================================
// Joint commands
// ============================================================================

/// Publisher that also forwards joint commands to a simulated robot.
pub struct CommandForwarder {
    inner: Box<dyn NodePublisher>,
    commands: Sender<f64>,
}

impl CommandForwarder {
    pub fn new(inner: Box<dyn NodePublisher>, commands: Sender<f64>) -> Self {
        Self { inner, commands }
    }
}

impl NodePublisher for CommandForwarder {
    fn publish_objects(&self, cloud: &PointCloud3D) {
        self.inner.publish_objects(cloud);
    }

    fn publish_table(&self, cloud: &PointCloud3D) {
        self.inner.publish_table(cloud);
    }

    fn publish_cluster_cloud(&self, cloud: &PointCloud3D) {
        self.inner.publish_cluster_cloud(cloud);
    }

    fn publish_label(&self, marker: &LabelMarker) {
        self.inner.publish_label(marker);
    }

    fn publish_detected_objects(&self, objects: &[DetectedObject]) {
        self.inner.publish_detected_objects(objects);
    }

    fn publish_collision_map(&self, cloud: &PointCloud3D) {
        self.inner.publish_collision_map(cloud);
    }

    fn publish_joint_command(&self, angle: f64) {
        self.inner.publish_joint_command(angle);
        if self.commands.send(angle).is_err() {
            log::warn!("Simulated robot gone, joint command {:.4} lost", angle);
        }
    }
}

// ============================================================================
// Simulated robot
// ============================================================================

/// Configuration for the simulated body joint.
#[derive(Debug, Clone, Copy)]
pub struct SimRobotConfig {
    /// Joint state publish rate.
    ///
    /// Default: 20Hz
    pub rate_hz: f64,
    /// Rotation speed in rad/s.
    ///
    /// Default: 1.5 rad/s
    pub turn_speed: f64,
    /// Angle at startup.
    pub start_angle: f64,
}

impl Default for SimRobotConfig {
    fn default() -> Self {
        Self {
            rate_hz: 20.0,
            turn_speed: 1.5,
            start_angle: 0.0,
        }
    }
}

/// Body rotation joint that moves toward the commanded angle.
#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    config: SimRobotConfig,
    angle: f64,
    target: f64,
}

impl SimulatedRobot {
    pub fn new(config: SimRobotConfig) -> Self {
        Self {
            config,
            angle: config.start_angle,
            target: config.start_angle,
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn command(&mut self, target: f64) {
        self.target = target;
    }

    /// Advance by `dt` seconds; snaps onto the target once within reach.
    pub fn step(&mut self, dt: f64) -> f64 {
        let max_step = self.config.turn_speed.abs() * dt;
        let diff = self.target - self.angle;
        if diff.abs() <= max_step {
            self.angle = self.target;
        } else {
            self.angle += max_step * diff.signum();
        }
        self.angle
    }

    /// Publish joint states on a "sim-robot" thread until `running` is
    /// cleared or the event channel closes.
    pub fn spawn(
        mut self,
        commands: Receiver<f64>,
        events: Sender<NodeEvent>,
        running: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>> {
        let period = Duration::from_secs_f64(1.0 / self.config.rate_hz.max(1.0));
        let handle = thread::Builder::new()
            .name("sim-robot".into())
            .spawn(move || {
                log::info!("Simulated robot started at {:.3} rad", self.angle);
                let start = Instant::now();
                while running.load(Ordering::Relaxed) {
                    while let Ok(target) = commands.try_recv() {
                        log::debug!("Simulated robot turning to {:.4} rad", target);
                        self.command(target);
                    }
                    let angle = self.step(period.as_secs_f64());
                    let ts = start.elapsed().as_micros() as u64;
                    let state = JointState::single(WORLD_JOINT, angle, ts);
                    if events.send(NodeEvent::JointState(state)).is_err() {
                        break;
                    }
                    thread::sleep(period);
                }
                log::info!("Simulated robot stopped at {:.3} rad", self.angle);
            })?;
        Ok(handle)
    }
}

// ============================================================================
// Planner services
// ============================================================================

/// Pick-place routine that always reports the configured result.
#[derive(Debug, Default)]
pub struct SimulatedPickPlace {
    success: bool,
    calls: AtomicUsize,
}

impl SimulatedPickPlace {
    pub fn new(success: bool) -> Self {
        Self {
            success,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl PickPlaceService for SimulatedPickPlace {
    fn wait_for_service(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    fn pick_place(&self, request: &PickRequest) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "Simulated pick of '{}' with {} arm: {}",
            request.object_name(),
            request.arm().as_str(),
            if self.success { "success" } else { "failure" }
        );
        Ok(self.success)
    }
}

/// Collision map that only counts clears.
#[derive(Debug, Default)]
pub struct SimulatedCollisionMap {
    clears: AtomicUsize,
}

impl SimulatedCollisionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::Relaxed)
    }
}

impl CollisionMapService for SimulatedCollisionMap {
    fn clear(&self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ============================================================================
// Sensor replay
// ============================================================================

/// Replays one cloud as the sensor stream.
#[derive(Debug, Clone)]
pub struct CloudReplay {
    cloud: PointCloud3D,
    /// Number of frames; 0 repeats until stopped
    frames: usize,
    interval: Duration,
}

impl CloudReplay {
    pub fn new(cloud: PointCloud3D, frames: usize, interval: Duration) -> Self {
        Self {
            cloud,
            frames,
            interval,
        }
    }

    /// Send frames on a "cloud-replay" thread, stamped with the time since
    /// start.
    pub fn spawn(self, events: Sender<NodeEvent>, running: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("cloud-replay".into())
            .spawn(move || {
                log::info!(
                    "Replaying '{}' ({} points), {} frames",
                    self.cloud.name,
                    self.cloud.len(),
                    if self.frames == 0 {
                        "unlimited".to_string()
                    } else {
                        self.frames.to_string()
                    }
                );
                let start = Instant::now();
                let mut sent = 0;
                while running.load(Ordering::Relaxed) && (self.frames == 0 || sent < self.frames) {
                    let mut frame = self.cloud.clone();
                    frame.timestamp_us = start.elapsed().as_micros() as u64;
                    if events.send(NodeEvent::PointCloud(frame)).is_err() {
                        break;
                    }
                    sent += 1;
                    thread::sleep(self.interval);
                }
                log::info!("Cloud replay finished after {} frames", sent);
            })?;
        Ok(handle)
    }
}

// ============================================================================
// Synthetic scene
// ============================================================================

/// Height of the synthetic table top.
pub const TABLE_HEIGHT: f32 = 0.65;

/// Point spacing of the synthetic scene.
pub const SCENE_SPACING: f32 = 0.01;

/// Solid cube of points resting above the table.
#[derive(Debug, Clone, Copy)]
pub struct SceneBox {
    /// Minimum corner
    pub origin: Point3D,
    /// Points per edge
    pub size: usize,
    pub color: Rgb,
}

impl SceneBox {
    pub fn new(origin: Point3D, size: usize, color: Rgb) -> Self {
        Self {
            origin,
            size,
            color,
        }
    }
}

/// Table spanning `x` in [0.4, 0.9] and `y` in [-0.3, 0.3] plus the given
/// boxes. Points sit at cell centers of the scene grid, so a voxel filter
/// with leaf [`SCENE_SPACING`] keeps every one of them.
pub fn tabletop_scene(boxes: &[SceneBox]) -> PointCloud3D {
    let half = SCENE_SPACING * 0.5;
    let mut cloud = PointCloud3D::new("tabletop", 0);

    let table_color = Rgb::new(160, 120, 80);
    for i in 0..50 {
        for j in 0..60 {
            let x = 0.4 + i as f32 * SCENE_SPACING + half;
            let y = -0.3 + j as f32 * SCENE_SPACING + half;
            cloud.push(CloudPoint::xyz_rgb(x, y, TABLE_HEIGHT, table_color));
        }
    }

    for b in boxes {
        for i in 0..b.size {
            for j in 0..b.size {
                for k in 0..b.size {
                    let offset = Point3D::new(
                        i as f32 * SCENE_SPACING + half,
                        j as f32 * SCENE_SPACING + half,
                        k as f32 * SCENE_SPACING + half,
                    );
                    cloud.push(CloudPoint::new(b.origin + offset, b.color));
                }
            }
        }
    }
    cloud
}

/// Red, green and blue cubes on the synthetic table.
pub fn demo_scene() -> PointCloud3D {
    let z = TABLE_HEIGHT + 0.03;
    tabletop_scene(&[
        SceneBox::new(Point3D::new(0.5, -0.2, z), 6, Rgb::new(255, 0, 0)),
        SceneBox::new(Point3D::new(0.6, 0.0, z), 6, Rgb::new(0, 255, 0)),
        SceneBox::new(Point3D::new(0.7, 0.15, z), 6, Rgb::new(0, 0, 255)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pick::Arm;
    use crate::io::dispatcher::event_channel;
    use crate::io::services::RecordingPublisher;

    #[test]
    fn test_robot_lands_exactly_on_target() {
        let mut robot = SimulatedRobot::new(SimRobotConfig::default());
        robot.command(std::f64::consts::FRAC_PI_2);

        let mut steps = 0;
        while robot.angle() != std::f64::consts::FRAC_PI_2 {
            robot.step(0.05);
            steps += 1;
            assert!(steps < 100);
        }
        // 1.5 rad/s at 20Hz covers pi/2 in 21 steps
        assert_eq!(steps, 21);

        robot.command(-0.1);
        robot.step(0.05);
        assert!(robot.angle() < std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_forwarder_sends_commands() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let recording = RecordingPublisher::new();
        let forwarder = CommandForwarder::new(Box::new(recording.clone()), tx);

        forwarder.publish_joint_command(0.5);
        forwarder.publish_table(&PointCloud3D::new("table", 0));

        assert_eq!(rx.try_recv().unwrap(), 0.5);
        let rec = recording.snapshot();
        assert_eq!(rec.joint_commands, vec![0.5]);
        assert_eq!(rec.tables.len(), 1);
    }

    #[test]
    fn test_replay_sends_requested_frames() {
        let (tx, rx) = event_channel();
        let running = Arc::new(AtomicBool::new(true));
        let replay = CloudReplay::new(demo_scene(), 3, Duration::from_millis(1));
        replay.spawn(tx, running).unwrap().join().unwrap();

        let frames: Vec<NodeEvent> = rx.try_iter().collect();
        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[0], NodeEvent::PointCloud(c) if c.len() == demo_scene().len()));
    }

    #[test]
    fn test_robot_thread_publishes_joint_states() {
        let (event_tx, event_rx) = event_channel();
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let config = SimRobotConfig {
            rate_hz: 200.0,
            ..SimRobotConfig::default()
        };
        let handle = SimulatedRobot::new(config)
            .spawn(cmd_rx, event_tx, running.clone())
            .unwrap();
        cmd_tx.send(0.01).unwrap();

        let first = event_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();

        let NodeEvent::JointState(state) = first else {
            panic!("expected a joint state");
        };
        assert_eq!(state.names, vec![WORLD_JOINT.to_string()]);
    }

    #[test]
    fn test_demo_scene_layout() {
        let scene = demo_scene();
        assert_eq!(scene.len(), 50 * 60 + 3 * 216);
        let (min, max) = scene.bounds().unwrap();
        assert!((min.z - TABLE_HEIGHT).abs() < 1e-6);
        assert!(max.z < TABLE_HEIGHT + 0.1);
    }

    #[test]
    fn test_simulated_services() {
        let pick_place = SimulatedPickPlace::new(false);
        let request = PickRequest::new(
            3,
            "soap",
            Arm::Right,
            crate::core::types::Pose::from_position(0.5, 0.0, 0.7),
            crate::core::types::Pose::from_position(0.0, -0.71, 0.605),
        )
        .unwrap();
        assert!(pick_place.wait_for_service(Duration::ZERO).is_ok());
        assert!(!pick_place.pick_place(&request).unwrap());
        assert_eq!(pick_place.calls(), 1);

        let map = SimulatedCollisionMap::new();
        map.clear().unwrap();
        map.clear().unwrap();
        assert_eq!(map.clears(), 2);
    }
}
