//! Single-threaded event dispatch for the pick node.
//!
//! Point clouds and joint states from every producer are funneled through
//! one crossbeam channel and handled strictly one at a time, in arrival
//! order. Handlers therefore never run concurrently and the node needs no
//! internal locking.
//!
//! ```text
//!   cloud replay ──┐
//!                  ├──► [NodeEvent channel] ──► Dispatcher ──► EventHandler
//!   robot joints ──┘
//! ```
//!
//! Once the handler reports that it no longer wants joint states (the turn
//! is over), the dispatcher drops them without calling the handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::core::types::{JointState, PointCloud3D};
use crate::engine::node::PickNode;
use crate::engine::turn::TurnEvent;
use crate::error::Result;

/// How often a blocked dispatcher re-checks the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Input to the node.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    PointCloud(PointCloud3D),
    JointState(JointState),
    /// Restart obstacle accumulation from empty.
    ClearObstacleMap,
    /// Stop dispatching after the events queued before it.
    Shutdown,
}

/// Channel all producers send node events into.
pub fn event_channel() -> (Sender<NodeEvent>, Receiver<NodeEvent>) {
    crossbeam_channel::unbounded()
}

/// Receiver side of the node's subscriptions.
pub trait EventHandler: Send {
    fn on_point_cloud(&mut self, cloud: &PointCloud3D);

    /// Handle one joint state; `false` unsubscribes from further ones.
    fn on_joint_state(&mut self, state: &JointState) -> bool;

    fn on_clear_obstacle_map(&mut self);
}

impl EventHandler for PickNode {
    fn on_point_cloud(&mut self, cloud: &PointCloud3D) {
        let report = PickNode::on_point_cloud(self, cloud);
        log::info!(
            "Frame {}: {} objects, {} obstacle points, {}/{} picks succeeded",
            report.frame,
            report.labels.len(),
            report.obstacle_points,
            report.picks.successes(),
            report.picks.attempts.len()
        );
    }

    fn on_joint_state(&mut self, state: &JointState) -> bool {
        let event = PickNode::on_joint_state(self, state);
        event != TurnEvent::Finished && !self.is_turning_done()
    }

    fn on_clear_obstacle_map(&mut self) {
        self.clear_obstacle_map();
    }
}

/// Event counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub clouds: usize,
    pub joint_states: usize,
    /// Joint states that arrived after unsubscribing
    pub dropped_joint_states: usize,
}

/// Delivers queued events to one handler.
pub struct Dispatcher<H> {
    handler: H,
    events: Receiver<NodeEvent>,
    joint_subscribed: bool,
    stats: DispatchStats,
}

impl<H: EventHandler> Dispatcher<H> {
    pub fn new(handler: H, events: Receiver<NodeEvent>) -> Self {
        Self {
            handler,
            events,
            joint_subscribed: true,
            stats: DispatchStats::default(),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn is_joint_subscribed(&self) -> bool {
        self.joint_subscribed
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Handle one event; `false` on shutdown.
    pub fn dispatch(&mut self, event: NodeEvent) -> bool {
        match event {
            NodeEvent::PointCloud(cloud) => {
                self.stats.clouds += 1;
                self.handler.on_point_cloud(&cloud);
            }
            NodeEvent::JointState(state) => {
                if !self.joint_subscribed {
                    self.stats.dropped_joint_states += 1;
                    return true;
                }
                self.stats.joint_states += 1;
                if !self.handler.on_joint_state(&state) {
                    log::info!("Unsubscribed from joint states");
                    self.joint_subscribed = false;
                }
            }
            NodeEvent::ClearObstacleMap => self.handler.on_clear_obstacle_map(),
            NodeEvent::Shutdown => {
                log::info!("Dispatcher received shutdown");
                return false;
            }
        }
        true
    }

    /// Handle events until shutdown, until every sender is gone, or until
    /// `running` is cleared. Returns the handler for inspection.
    pub fn run(mut self, running: &AtomicBool) -> (H, DispatchStats) {
        while running.load(Ordering::Relaxed) {
            match self.events.recv_timeout(POLL_INTERVAL) {
                Ok(event) => {
                    if !self.dispatch(event) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    log::info!("All event producers stopped");
                    break;
                }
            }
        }
        log::debug!("Dispatcher stopped: {:?}", self.stats);
        (self.handler, self.stats)
    }
}

impl<H: EventHandler + 'static> Dispatcher<H> {
    /// Run on a dedicated "node" thread.
    pub fn spawn(self, running: Arc<AtomicBool>) -> Result<JoinHandle<(H, DispatchStats)>> {
        let handle = thread::Builder::new()
            .name("node".into())
            .spawn(move || self.run(&running))?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        calls: Vec<String>,
        /// Unsubscribe after this many joint states
        joint_budget: usize,
    }

    impl EventHandler for Trace {
        fn on_point_cloud(&mut self, cloud: &PointCloud3D) {
            self.calls.push(format!("cloud:{}", cloud.timestamp_us));
        }

        fn on_joint_state(&mut self, state: &JointState) -> bool {
            self.calls.push(format!("joint:{}", state.timestamp_us));
            self.joint_budget = self.joint_budget.saturating_sub(1);
            self.joint_budget > 0
        }

        fn on_clear_obstacle_map(&mut self) {
            self.calls.push("clear".to_string());
        }
    }

    fn cloud(ts: u64) -> NodeEvent {
        NodeEvent::PointCloud(PointCloud3D::new("raw", ts))
    }

    fn joint(ts: u64) -> NodeEvent {
        NodeEvent::JointState(JointState::single("world_joint", 0.0, ts))
    }

    #[test]
    fn test_events_handled_in_arrival_order() {
        let (tx, rx) = event_channel();
        for event in [cloud(1), joint(2), NodeEvent::ClearObstacleMap, cloud(3), joint(4)] {
            tx.send(event).unwrap();
        }
        drop(tx);

        let trace = Trace {
            joint_budget: 10,
            ..Trace::default()
        };
        let running = AtomicBool::new(true);
        let (trace, stats) = Dispatcher::new(trace, rx).run(&running);

        assert_eq!(
            trace.calls,
            vec!["cloud:1", "joint:2", "clear", "cloud:3", "joint:4"]
        );
        assert_eq!(stats.clouds, 2);
        assert_eq!(stats.joint_states, 2);
    }

    #[test]
    fn test_unsubscribe_drops_later_joint_states() {
        let (_tx, rx) = event_channel();
        let trace = Trace {
            joint_budget: 2,
            ..Trace::default()
        };
        let mut dispatcher = Dispatcher::new(trace, rx);

        for ts in 0..5 {
            assert!(dispatcher.dispatch(joint(ts)));
        }
        assert!(dispatcher.dispatch(cloud(9)));

        assert!(!dispatcher.is_joint_subscribed());
        assert_eq!(dispatcher.handler().calls, vec!["joint:0", "joint:1", "cloud:9"]);
        assert_eq!(dispatcher.stats().dropped_joint_states, 3);
    }

    #[test]
    fn test_shutdown_stops_before_later_events() {
        let (tx, rx) = event_channel();
        tx.send(cloud(1)).unwrap();
        tx.send(NodeEvent::Shutdown).unwrap();
        tx.send(cloud(2)).unwrap();

        let running = AtomicBool::new(true);
        let (trace, _) = Dispatcher::new(Trace::default(), rx).run(&running);
        assert_eq!(trace.calls, vec!["cloud:1"]);
    }

    #[test]
    fn test_spawned_dispatcher_runs_until_shutdown() {
        let (tx, rx) = event_channel();
        let running = Arc::new(AtomicBool::new(true));
        let handle = Dispatcher::new(Trace::default(), rx)
            .spawn(running.clone())
            .unwrap();

        tx.send(cloud(5)).unwrap();
        tx.send(NodeEvent::Shutdown).unwrap();

        let (trace, stats) = handle.join().unwrap();
        assert_eq!(trace.calls, vec!["cloud:5"]);
        assert_eq!(stats.clouds, 1);
    }

    #[test]
    fn test_cleared_flag_stops_without_dispatching() {
        let (tx, rx) = event_channel();
        tx.send(cloud(1)).unwrap();

        let running = AtomicBool::new(false);
        let (trace, stats) = Dispatcher::new(Trace::default(), rx).run(&running);
        assert!(trace.calls.is_empty());
        assert_eq!(stats, DispatchStats::default());
    }
}
