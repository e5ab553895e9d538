//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use drishti::classification::ModelBundle;
use drishti::config::DrishtiConfig;
use drishti::core::types::Point3D;
use drishti::engine::{NodeServices, PickNode, TaskParams};
use drishti::io::params::{Dropboxes, PickListEntry, load_dropboxes};
use drishti::io::services::RecordingPublisher;
use drishti::io::sim::{SimulatedCollisionMap, SimulatedPickPlace, TABLE_HEIGHT};
use drishti::perception::PcaNormalEstimator;

/// Path relative to the crate root.
pub fn crate_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

/// Hue model shipped in `config/`: green → biscuits, red → soap, blue → soap2.
pub fn sample_model() -> ModelBundle {
    ModelBundle::load(crate_path("config/model.json")).unwrap()
}

pub fn sample_dropboxes() -> Dropboxes {
    load_dropboxes(crate_path("config/dropbox.yaml")).unwrap()
}

/// Centers of the demo scene cubes (6 points of 1cm per edge).
pub fn cube_center(origin: Point3D) -> Point3D {
    origin + Point3D::new(0.03, 0.03, 0.03)
}

pub const RED_ORIGIN: Point3D = Point3D {
    x: 0.5,
    y: -0.2,
    z: TABLE_HEIGHT + 0.03,
};
pub const GREEN_ORIGIN: Point3D = Point3D {
    x: 0.6,
    y: 0.0,
    z: TABLE_HEIGHT + 0.03,
};
pub const BLUE_ORIGIN: Point3D = Point3D {
    x: 0.7,
    y: 0.15,
    z: TABLE_HEIGHT + 0.03,
};

/// Node wired to in-process services, writing records to `records_path`.
pub fn build_node(
    records_path: &Path,
    pick_list: Vec<PickListEntry>,
    pick_success: bool,
) -> (PickNode, RecordingPublisher) {
    let mut config = DrishtiConfig::default();
    config.output.records_path = records_path.to_path_buf();

    let params = TaskParams {
        model: sample_model(),
        pick_list,
        dropboxes: sample_dropboxes(),
    };
    let publisher = RecordingPublisher::new();
    let services = NodeServices {
        normals: Box::new(PcaNormalEstimator::new(config.normal_config())),
        collision_map: Box::new(SimulatedCollisionMap::new()),
        pick_place: Box::new(SimulatedPickPlace::new(pick_success)),
        publisher: Box::new(publisher.clone()),
    };
    let node = PickNode::new(&config, params, services).unwrap();
    (node, publisher)
}
