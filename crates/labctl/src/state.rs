//! Cross-invocation lab state snapshot
//!
//! The snapshot is the sole record shared between `create` and the later
//! lifecycle operations: a JSON map from VM name to a per-VM record, so
//! `start`/`stop`/`destroy` know which names to operate on without
//! re-deriving the topology. It is written wholesale after `create` and
//! `stop`, and deleted by `destroy`.

use camino::Utf8Path;
use color_eyre::{eyre::Context as _, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use crate::topology;

/// State snapshot file name within the working directory
pub const STATE_FILE: &str = "lab-state.json";

/// Per-VM record in the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRecord {
    /// Domain name
    pub name: String,
}

/// The set of VMs known to the lab
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabState {
    vms: BTreeMap<String, VmRecord>,
}

impl LabState {
    /// Record a VM by name
    pub fn insert(&mut self, name: &str) {
        self.vms.insert(
            name.to_string(),
            VmRecord {
                name: name.to_string(),
            },
        );
    }

    /// Whether a VM name is known
    pub fn contains(&self, name: &str) -> bool {
        self.vms.contains_key(name)
    }

    /// Number of known VMs
    pub fn len(&self) -> usize {
        self.vms.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.vms.is_empty()
    }

    /// VM names in lifecycle order: servers by index, then the balancer,
    /// then the client, then anything unrecognized (so it is at least
    /// reported downstream).
    pub fn ordered_names(&self) -> Vec<&str> {
        let mut servers: Vec<(u32, &str)> = self
            .vms
            .keys()
            .filter_map(|name| topology::server_index(name).map(|i| (i, name.as_str())))
            .collect();
        servers.sort_by_key(|(index, _)| *index);

        let mut names: Vec<&str> = servers.into_iter().map(|(_, name)| name).collect();
        for special in [topology::BALANCER, topology::CLIENT] {
            if let Some((key, _)) = self.vms.get_key_value(special) {
                names.push(key.as_str());
            }
        }
        for name in self.vms.keys() {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }
        names
    }

    /// Load the snapshot, returning `None` when no state file exists
    pub fn load(path: &Utf8Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path))?;

        let state: LabState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path))?;

        Ok(Some(state))
    }

    /// Write the snapshot, replacing any previous contents
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        fs::write(path, content).with_context(|| format!("Failed to write state file: {}", path))
    }

    /// Remove the snapshot file; absence is not an error
    pub fn clear(path: &Utf8Path) -> Result<()> {
        if !path.exists() {
            tracing::debug!("state file {path} does not exist, nothing to clear");
            return Ok(());
        }
        fs::remove_file(path).with_context(|| format!("Failed to remove state file: {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn state_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(STATE_FILE)).unwrap()
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);

        let mut state = LabState::default();
        for name in ["s1", "s2", "s3", "lb", "c1"] {
            state.insert(name);
        }
        state.save(&path).unwrap();

        let loaded = LabState::load(&path).unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.len(), 5);
        assert!(loaded.contains("lb"));
    }

    #[test]
    fn test_load_absent_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LabState::load(&state_path(&dir)).unwrap().is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);

        LabState::clear(&path).unwrap();

        let mut state = LabState::default();
        state.insert("s1");
        state.save(&path).unwrap();
        assert!(path.exists());

        LabState::clear(&path).unwrap();
        assert!(!path.exists());
        LabState::clear(&path).unwrap();
    }

    #[test]
    fn test_ordered_names() {
        let mut state = LabState::default();
        // Insert out of order; BTreeMap would otherwise yield c1 first and
        // s10 before s2.
        for name in ["c1", "lb", "s10", "s2", "s1"] {
            state.insert(name);
        }
        assert_eq!(state.ordered_names(), vec!["s1", "s2", "s10", "lb", "c1"]);
    }

    #[test]
    fn test_ordered_names_keeps_unknown_entries() {
        let mut state = LabState::default();
        state.insert("s1");
        state.insert("mystery");
        assert_eq!(state.ordered_names(), vec!["s1", "mystery"]);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut state = LabState::default();
        state.insert("s1");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["s1"]["name"], "s1");
    }
}
