//! JSON command encoding
//!
//! Every command is one JSON object sent as a single text frame.

use serde_json::{json, Map, Value};

/// Clamp a 0–1 ratio for the device. NaN becomes 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub fn ping() -> String {
    json!({ "ping": true }).to_string()
}

pub fn get_vars() -> String {
    json!({ "getVars": true }).to_string()
}

pub fn set_vars(vars: &Map<String, Value>) -> String {
    json!({ "setVars": vars }).to_string()
}

pub fn get_config() -> String {
    json!({ "getConfig": true }).to_string()
}

pub fn list_programs() -> String {
    json!({ "listPrograms": true }).to_string()
}

pub fn active_program_id(id: &str) -> String {
    json!({ "activeProgramId": id }).to_string()
}

pub fn brightness(level: f64) -> String {
    json!({ "brightness": clamp_unit(level) }).to_string()
}

pub fn sequence_timer(ms: u32) -> String {
    json!({ "sequenceTimer": ms }).to_string()
}

pub fn sequencer(enabled: bool) -> String {
    json!({ "sequencerEnable": enabled, "runSequencer": enabled }).to_string()
}

pub fn get_controls(program_id: &str) -> String {
    json!({ "getControls": program_id }).to_string()
}

/// `save` must already reflect the facade's flash-write mode
pub fn set_controls(controls: &Map<String, Value>, save: bool) -> String {
    with_save(json!({ "setControls": controls }), save)
}

pub fn data_speed(speed: u32, save: bool) -> String {
    with_save(json!({ "dataSpeed": speed }), save)
}

fn with_save(mut command: Value, save: bool) -> String {
    if save {
        command["save"] = Value::Bool(true);
    }
    command.to_string()
}
