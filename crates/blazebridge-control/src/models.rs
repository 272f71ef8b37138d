//! Device-reported data

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Hardware configuration as reported by `getConfig`.
///
/// The device answers with several JSON objects; their members are merged
/// here, later objects overriding earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HardwareConfig {
    values: Map<String, Value>,
}

impl HardwareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the members of one reply object
    pub fn merge(&mut self, object: Map<String, Value>) {
        self.values.extend(object);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of addressable pixels
    pub fn pixel_count(&self) -> Option<usize> {
        self.values
            .get("pixelCount")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
    }

    /// Device name
    pub fn name(&self) -> Option<&str> {
        self.values.get("name").and_then(Value::as_str)
    }

    /// ID of the running program, if the device has reported one
    pub fn active_program_id(&self) -> Option<&str> {
        self.values
            .get("activeProgram")?
            .get("activeProgramId")?
            .as_str()
    }

    /// UI controls of the running program
    pub fn active_controls(&self) -> Option<&Map<String, Value>> {
        self.values
            .get("activeProgram")?
            .get("controls")?
            .as_object()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}
