//! drishti-node - Perception and pick orchestration node
//!
//! Replays a point cloud (a PCD file, or a synthetic tabletop scene) as the
//! sensor stream against a simulated robot:
//!
//! ```text
//!  ┌──────────────┐   clouds    ┌───────────────┐   joint commands   ┌───────────┐
//!  │ cloud-replay │────────────►│     node      │───────────────────►│ sim-robot │
//!  └──────────────┘             │  (dispatcher) │◄───────────────────│           │
//!                               └───────────────┘   joint states     └───────────┘
//! ```
//!
//! The main thread announces the end of the turn and waits for the replay
//! to end (or Ctrl-C).
//!
//! # Usage
//!
//! ```bash
//! # Synthetic scene with default config
//! cargo run --release --bin drishti-node
//!
//! # Custom config and recorded cloud
//! cargo run --release --bin drishti-node -- --config config/drishti.toml --cloud scene3.pcd
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use clap::Parser;

use drishti::config::DrishtiConfig;
use drishti::engine::{NodeServices, PickNode, TaskParams};
use drishti::error::Result;
use drishti::io::sim::{
    CloudReplay, CommandForwarder, SimRobotConfig, SimulatedCollisionMap, SimulatedPickPlace,
    SimulatedRobot, demo_scene,
};
use drishti::io::{Dispatcher, LogPublisher, NodeEvent, event_channel, read_pcd};
use drishti::perception::PcaNormalEstimator;
use drishti::utils::setup_shutdown_handler;

/// Default config file looked up when `--config` is not given.
const DEFAULT_CONFIG: &str = "drishti.toml";

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser)]
#[command(name = "drishti-node")]
#[command(about = "Tabletop perception and pick orchestration node")]
struct Args {
    /// Configuration file (default: drishti.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// PCD file to replay instead of the synthetic scene
    #[arg(long)]
    cloud: Option<PathBuf>,

    /// Trained model bundle (JSON)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Number of frames to replay (0 = until Ctrl-C)
    #[arg(long)]
    frames: Option<usize>,

    /// Directory for per-stage cloud dumps
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<DrishtiConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let config = DrishtiConfig::load(path)?;
            log::info!("Loaded config from {}", path.display());
            config
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            let config = DrishtiConfig::load(Path::new(DEFAULT_CONFIG))?;
            log::info!("Loaded config from {}", DEFAULT_CONFIG);
            config
        }
        None => {
            log::info!("No config file, using defaults");
            DrishtiConfig::default()
        }
    };

    if let Some(cloud) = &args.cloud {
        config.replay.cloud = Some(cloud.clone());
    }
    if let Some(model) = &args.model {
        config.model.path = model.clone();
    }
    if let Some(frames) = args.frames {
        config.replay.frames = frames;
    }
    if let Some(dir) = &args.dump_dir {
        config.output.dump_dir = Some(dir.clone());
    }
    Ok(config)
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("drishti-node failed: {}", e);
        std::process::exit(1);
    }

    log::info!("drishti-node shutdown complete");
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;

    log::info!("drishti-node starting");
    log::info!("  Model: {}", config.model.path.display());
    log::info!("  Pick list: {}", config.pick.pick_list.display());
    log::info!("  Records: {}", config.output.records_path.display());
    if let Some(dir) = &config.output.dump_dir {
        log::info!("  Stage dumps: {}", dir.display());
    }

    // 1. Startup inputs; any failure here is fatal
    let params = TaskParams::load(&config)?;
    let cloud = match &config.replay.cloud {
        Some(path) => read_pcd(path)?,
        None => {
            log::info!("No cloud configured, replaying the synthetic tabletop scene");
            demo_scene()
        }
    };

    // 2. Channels and shutdown handling
    let (event_tx, event_rx) = event_channel();
    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let running = setup_shutdown_handler(event_tx.clone())?;

    // 3. Node with simulated collaborators
    let services = NodeServices {
        normals: Box::new(PcaNormalEstimator::new(config.normal_config())),
        collision_map: Box::new(SimulatedCollisionMap::new()),
        pick_place: Box::new(SimulatedPickPlace::new(config.replay.pick_success)),
        publisher: Box::new(CommandForwarder::new(Box::new(LogPublisher), command_tx)),
    };
    let node = PickNode::new(&config, params, services)?;
    let turn_signal = node.turn_signal();
    let records_path = node.records_path().to_path_buf();

    // 4. Threads
    let node_thread = Dispatcher::new(node, event_rx).spawn(running.clone())?;
    let robot = SimulatedRobot::new(SimRobotConfig {
        rate_hz: config.replay.joint_rate_hz,
        turn_speed: config.replay.turn_speed,
        start_angle: 0.0,
    });
    let robot_thread = robot.spawn(command_rx, event_tx.clone(), running.clone())?;
    let replay = CloudReplay::new(
        cloud,
        config.replay.frames,
        Duration::from_millis(config.replay.frame_interval_ms),
    );
    let replay_thread = replay.spawn(event_tx.clone(), running.clone())?;

    // 5. Announce the end of the turn as soon as it happens
    let watcher_signal = turn_signal.clone();
    thread::Builder::new()
        .name("turn-watch".into())
        .spawn(move || {
            watcher_signal.wait();
            log::info!("Turning done, picking enabled");
        })?;

    log::info!("Node running, replaying until the last frame");
    if let Err(e) = replay_thread.join() {
        log::error!("Replay thread panicked: {:?}", e);
    }

    // 6. Drain queued frames, then stop the producers
    let _ = event_tx.send(NodeEvent::Shutdown);
    drop(event_tx);
    match node_thread.join() {
        Ok((node, stats)) => {
            log::info!(
                "Handled {} clouds and {} joint states ({} dropped after the turn)",
                stats.clouds,
                stats.joint_states,
                stats.dropped_joint_states
            );
            log::info!("Obstacle map holds {} points", node.obstacle_map().len());
        }
        Err(e) => log::error!("Node thread panicked: {:?}", e),
    }
    running.store(false, Ordering::SeqCst);
    if let Err(e) = robot_thread.join() {
        log::error!("Robot thread panicked: {:?}", e);
    }

    if turn_signal.is_complete() {
        log::info!("Pick records in {}", records_path.display());
    } else {
        log::warn!("Stopped before the turn finished; no picks were requested");
    }
    Ok(())
}
