//! Orchestration layer.
//!
//! - [`pipeline`]: per-frame filter, segment, cluster and classify
//! - [`obstacle_map`]: accumulated table points for the motion planner
//! - [`turn`]: body rotation state machine
//! - [`pick`]: pick list matching and pick-place requests
//! - [`node`]: the per-run context tying them together

pub mod node;
pub mod obstacle_map;
pub mod pick;
pub mod pipeline;
pub mod turn;

pub use node::{FrameReport, NodeServices, PickNode, TaskParams};
pub use obstacle_map::ObstacleMap;
pub use pick::{
    Arm, PickAttempt, PickConfig, PickContext, PickOrchestrator, PickRequest, PickSummary,
};
pub use pipeline::{FrameResult, PerceptionPipeline, PipelineConfig};
pub use turn::{TurnEvent, TurnSequence, TurnSignal, TurnState, TurnStateMachine};
