//! Task parameters: the pick list and the dropbox positions.
//!
//! Pick list:
//!
//! ```yaml
//! object_list:
//!   - name: biscuits
//!     group: green
//! ```
//!
//! Dropboxes (first entry is the left arm's box, second the right's):
//!
//! ```yaml
//! dropbox:
//!   - name: left
//!     group: red
//!     position: [0, 0.71, 0.605]
//!   - name: right
//!     group: green
//!     position: [0, -0.71, 0.605]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::pick::Arm;
use crate::error::{DrishtiError, Result};

/// One object the task asks for, with its destination group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickListEntry {
    pub name: String,
    pub group: String,
}

impl PickListEntry {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PickListFile {
    object_list: Vec<PickListEntry>,
}

/// One dropbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropboxEntry {
    pub name: String,
    pub group: String,
    pub position: [f64; 3],
}

#[derive(Debug, Deserialize)]
struct DropboxFile {
    dropbox: Vec<DropboxEntry>,
}

/// Place positions for both arms.
#[derive(Debug, Clone, PartialEq)]
pub struct Dropboxes {
    pub left: DropboxEntry,
    pub right: DropboxEntry,
}

impl Dropboxes {
    /// Build from the parameter list: slot 0 is left, slot 1 is right.
    pub fn from_entries(entries: Vec<DropboxEntry>) -> Result<Self> {
        let mut iter = entries.into_iter();
        match (iter.next(), iter.next()) {
            (Some(left), Some(right)) => Ok(Self { left, right }),
            _ => Err(DrishtiError::Params(
                "dropbox list needs two entries (left, right)".to_string(),
            )),
        }
    }

    /// Place position for an arm.
    pub fn position_for(&self, arm: Arm) -> [f64; 3] {
        match arm {
            Arm::Left => self.left.position,
            Arm::Right => self.right.position,
        }
    }
}

fn read_params(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| DrishtiError::Params(format!("cannot read {}: {}", path.display(), e)))
}

/// Load the pick list from YAML.
pub fn load_pick_list(path: impl AsRef<Path>) -> Result<Vec<PickListEntry>> {
    let path = path.as_ref();
    let file: PickListFile = serde_yaml::from_str(&read_params(path)?)
        .map_err(|e| DrishtiError::Params(format!("{}: {}", path.display(), e)))?;
    Ok(file.object_list)
}

/// Load the dropbox positions from YAML.
pub fn load_dropboxes(path: impl AsRef<Path>) -> Result<Dropboxes> {
    let path = path.as_ref();
    let file: DropboxFile = serde_yaml::from_str(&read_params(path)?)
        .map_err(|e| DrishtiError::Params(format!("{}: {}", path.display(), e)))?;
    Dropboxes::from_entries(file.dropbox)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DROPBOX_YAML: &str = "\
dropbox:
  - name: left
    group: red
    position: [0, 0.71, 0.605]
  - name: right
    group: green
    position: [0, -0.71, 0.605]
";

    #[test]
    fn test_load_pick_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pick_list_3.yaml");
        fs::write(
            &path,
            "object_list:\n  - name: biscuits\n    group: green\n  - name: soap\n    group: red\n",
        )
        .unwrap();

        let list = load_pick_list(&path).unwrap();
        assert_eq!(
            list,
            vec![
                PickListEntry::new("biscuits", "green"),
                PickListEntry::new("soap", "red")
            ]
        );
    }

    #[test]
    fn test_load_dropboxes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropbox.yaml");
        fs::write(&path, DROPBOX_YAML).unwrap();

        let boxes = load_dropboxes(&path).unwrap();
        assert_eq!(boxes.position_for(Arm::Left), [0.0, 0.71, 0.605]);
        assert_eq!(boxes.position_for(Arm::Right), [0.0, -0.71, 0.605]);
    }

    #[test]
    fn test_single_dropbox_rejected() {
        let entry = DropboxEntry {
            name: "left".into(),
            group: "red".into(),
            position: [0.0; 3],
        };
        let err = Dropboxes::from_entries(vec![entry]).unwrap_err();
        assert!(matches!(err, DrishtiError::Params(_)));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_pick_list("/nonexistent/pick_list.yaml"),
            Err(DrishtiError::Params(_))
        ));
    }
}
