//! Pick request output records (YAML).
//!
//! ```yaml
//! object_list:
//! - test_scene_num: 3
//!   arm_name: left
//!   object_name: biscuits
//!   pick_pose:
//!     position: {x: 0.54, y: -0.24, z: 0.71}
//!     orientation: {x: 0.0, y: 0.0, z: 0.0, w: 0.0}
//!   place_pose:
//!     position: {x: 0.0, y: 0.71, z: 0.605}
//!     orientation: {x: 0.0, y: 0.0, z: 0.0, w: 0.0}
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Pose;
use crate::engine::pick::{Arm, PickRequest};
use crate::error::Result;

/// One pick request as written to the output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRecord {
    pub test_scene_num: u32,
    pub arm_name: Arm,
    pub object_name: String,
    pub pick_pose: Pose,
    pub place_pose: Pose,
}

impl From<&PickRequest> for PickRecord {
    fn from(request: &PickRequest) -> Self {
        Self {
            test_scene_num: request.scene_id(),
            arm_name: request.arm(),
            object_name: request.object_name().to_string(),
            pick_pose: *request.pick_pose(),
            place_pose: *request.place_pose(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OutputFile {
    object_list: Vec<PickRecord>,
}

/// Write all records to `path`, replacing any previous file.
pub fn write_records(path: impl AsRef<Path>, records: &[PickRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(&OutputFile {
        object_list: records.to_vec(),
    })?;
    fs::write(path, yaml)?;
    log::info!("Wrote {} pick records to {}", records.len(), path.display());
    Ok(())
}

/// Read records back from an output file.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<PickRecord>> {
    let contents = fs::read_to_string(path)?;
    let file: OutputFile = serde_yaml::from_str(&contents)?;
    Ok(file.object_list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, arm: Arm) -> PickRecord {
        PickRecord {
            test_scene_num: 3,
            arm_name: arm,
            object_name: name.to_string(),
            pick_pose: Pose::from_position(0.5, -0.25, 0.75),
            place_pose: Pose::from_position(0.0, 0.71, 0.605),
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output_3.yaml");
        let records = vec![record("biscuits", Arm::Left), record("soap", Arm::Right)];

        write_records(&path, &records).unwrap();
        assert_eq!(read_records(&path).unwrap(), records);
    }

    #[test]
    fn test_layout_keys() {
        let yaml = serde_yaml::to_string(&OutputFile {
            object_list: vec![record("soap", Arm::Right)],
        })
        .unwrap();
        assert!(yaml.starts_with("object_list:"));
        assert!(yaml.contains("arm_name: right"));
        assert!(yaml.contains("test_scene_num: 3"));
        assert!(yaml.contains("orientation:"));
    }

    #[test]
    fn test_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/empty.yaml");
        write_records(&path, &[]).unwrap();
        assert!(read_records(&path).unwrap().is_empty());
    }
}
