//! I/O infrastructure.
//!
//! - [`services`]: collaborator traits and in-process publishers
//! - [`dispatcher`]: single-threaded event delivery to the node
//! - [`sim`]: simulated robot, planner services and sensor replay
//! - [`pcd`]: point cloud files and diagnostic stage dumps
//! - [`params`]: pick list and dropbox parameters
//! - [`output`]: pick request records

pub mod dispatcher;
pub mod output;
pub mod params;
pub mod pcd;
pub mod services;
pub mod sim;

pub use dispatcher::{DispatchStats, Dispatcher, EventHandler, NodeEvent, event_channel};
pub use output::{PickRecord, read_records, write_records};
pub use params::{DropboxEntry, Dropboxes, PickListEntry, load_dropboxes, load_pick_list};
pub use pcd::{DiagnosticDumper, read_pcd, write_pcd_new};
pub use services::{
    CollisionMapService, LogPublisher, NodePublisher, NormalEstimationService, PickPlaceService,
    Recording, RecordingPublisher,
};
