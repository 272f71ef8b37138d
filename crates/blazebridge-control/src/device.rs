//! Pixelblaze command API
//!
//! One method per device command. Commands with no reply go straight out;
//! commands with a reply go through [`RequestClient`], which drains stale
//! frames first and filters the reply by kind.
//!
//! ## Flash writes
//!
//! Several setters take a `save` argument that asks the device to persist
//! the value to flash. Flash has a limited number of erase cycles, so the
//! argument is ignored until [`Pixelblaze::enable_flash_save`] is called.

use std::time::Duration;

use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::warn;

use crate::catalog::Catalog;
use crate::command;
use crate::connection::{ClientConfig, Connection, TcpTransport};
use crate::error::{ControlError, Result};
use crate::frame::FrameKind;
use crate::models::HardwareConfig;
use crate::request::RequestClient;

/// Handle to one Pixelblaze
pub struct Pixelblaze<S = TcpTransport> {
    client: RequestClient<S>,
    flash_save_enabled: bool,
}

impl Pixelblaze<TcpTransport> {
    /// Connect to the Pixelblaze at `address`
    pub async fn connect(address: &str, config: ClientConfig) -> Result<Self> {
        Ok(Self::new(RequestClient::connect(address, config).await?))
    }
}

impl<S> Pixelblaze<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(client: RequestClient<S>) -> Self {
        Self {
            client,
            flash_save_enabled: false,
        }
    }

    pub fn from_connection(connection: Connection<S>) -> Self {
        Self::new(RequestClient::new(connection))
    }

    /// The underlying request engine
    pub fn client(&self) -> &RequestClient<S> {
        &self.client
    }

    pub async fn is_connected(&self) -> bool {
        self.client.is_connected().await
    }

    pub async fn close(&self) -> Result<()> {
        self.client.close().await
    }

    /// Allow `save = true` on setters to reach the device.
    ///
    /// Without this call every flash write request is silently dropped.
    pub fn enable_flash_save(&mut self) {
        self.flash_save_enabled = true;
    }

    pub fn flash_save_enabled(&self) -> bool {
        self.flash_save_enabled
    }

    fn save_flag(&self, requested: bool) -> bool {
        requested && self.flash_save_enabled
    }

    /// Request a single JSON reply
    async fn request_json(&self, command: &str) -> Result<Option<Value>> {
        let wait = self.client.config().recv_timeout;
        let Some(reply) = self.client.request(command, FrameKind::Text, wait).await? else {
            return Ok(None);
        };

        let text = reply
            .into_text()
            .ok_or_else(|| ControlError::MalformedReply("expected a text reply".to_string()))?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ControlError::MalformedReply(format!("{} in {:?}", e, text)))
    }

    /// Wait until the device acknowledges that its message queue is empty.
    ///
    /// Returns `false` if no acknowledgement arrives within `wait`.
    pub async fn wait_for_empty_queue(&self, wait: Duration) -> Result<bool> {
        let reply = self
            .client
            .request(&command::ping(), FrameKind::Text, wait)
            .await?;

        Ok(reply
            .and_then(|frame| frame.into_text())
            .and_then(|text| serde_json::from_str::<Value>(&text).ok())
            .is_some_and(|value| value.get("ack").is_some()))
    }

    /// Variables exported by the running pattern
    pub async fn get_vars(&self) -> Result<Option<Map<String, Value>>> {
        let Some(reply) = self.request_json(&command::get_vars()).await? else {
            return Ok(None);
        };

        match reply.get("vars") {
            Some(Value::Object(vars)) => Ok(Some(vars.clone())),
            Some(other) => Err(ControlError::MalformedReply(format!(
                "vars is not an object: {}",
                other
            ))),
            None => Ok(None),
        }
    }

    /// Set exported variables. Names are not checked against the pattern.
    pub async fn set_vars(&self, vars: &Map<String, Value>) -> Result<()> {
        self.client.send(&command::set_vars(vars)).await
    }

    /// Set a single exported variable
    pub async fn set_variable(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let mut vars = Map::new();
        vars.insert(name.to_string(), value.into());
        self.set_vars(&vars).await
    }

    pub async fn variable_exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .get_vars()
            .await?
            .is_some_and(|vars| vars.contains_key(name)))
    }

    /// All programs stored on the device
    pub async fn get_pattern_list(&self) -> Result<Catalog> {
        self.client.collect_list(&command::list_programs()).await
    }

    /// Look up a program by ID or name
    pub async fn pattern_id(&self, id_or_name: &str) -> Result<Option<String>> {
        let patterns = self.get_pattern_list().await?;
        Ok(patterns.resolve(id_or_name).map(str::to_string))
    }

    /// Switch program by ID without validating it
    pub async fn set_active_pattern_id(&self, id: &str) -> Result<()> {
        self.client.send(&command::active_program_id(id)).await
    }

    /// Switch program by ID or name. Returns `false` if no such program exists.
    pub async fn set_active_pattern(&self, id_or_name: &str) -> Result<bool> {
        match self.pattern_id(id_or_name).await? {
            Some(id) => {
                self.set_active_pattern_id(&id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// ID of the running program
    pub async fn get_active_pattern(&self) -> Result<Option<String>> {
        let config = self.get_hardware_config().await?;
        Ok(config.active_program_id().map(str::to_string))
    }

    /// Global brightness, clamped to 0–1
    pub async fn set_brightness(&self, level: f64) -> Result<()> {
        self.client.send(&command::brightness(level)).await
    }

    /// How long the sequencer runs each pattern, in milliseconds
    pub async fn set_sequence_timer(&self, ms: u32) -> Result<()> {
        self.client.send(&command::sequence_timer(ms)).await
    }

    pub async fn start_sequencer(&self) -> Result<()> {
        self.client.send(&command::sequencer(true)).await
    }

    pub async fn stop_sequencer(&self) -> Result<()> {
        self.client.send(&command::sequencer(false)).await
    }

    /// Everything the device reports about itself.
    ///
    /// The reply is spread over several text frames; all frames that arrive
    /// within the receive timeout are merged.
    pub async fn get_hardware_config(&self) -> Result<HardwareConfig> {
        let wait = self.client.config().recv_timeout;
        let replies = self
            .client
            .request_all(&command::get_config(), FrameKind::Text, wait)
            .await?;

        let mut config = HardwareConfig::new();
        for reply in replies {
            let Some(text) = reply.as_text() else {
                continue;
            };
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(object)) => config.merge(object),
                Ok(_) | Err(_) => warn!("Ignoring non-object config frame: {:?}", text),
            }
        }
        Ok(config)
    }

    /// UI control values of a pattern.
    ///
    /// With no pattern, reads the running program's controls from the
    /// hardware config. Returns `None` if the pattern is unknown or the
    /// device did not answer, and an empty map if it has no controls.
    pub async fn get_controls(&self, pattern: Option<&str>) -> Result<Option<Map<String, Value>>> {
        let Some(pattern) = pattern else {
            let config = self.get_hardware_config().await?;
            return Ok(config.active_controls().cloned());
        };

        let Some(id) = self.pattern_id(pattern).await? else {
            return Ok(None);
        };
        let Some(reply) = self.request_json(&command::get_controls(&id)).await? else {
            return Ok(None);
        };

        let controls = reply
            .get("controls")
            .and_then(Value::as_object)
            .ok_or_else(|| ControlError::MalformedReply(format!("no controls in {}", reply)))?;

        // Keyed by program ID; there is only ever the one we asked for
        match controls.values().next() {
            Some(Value::Object(values)) => Ok(Some(values.clone())),
            Some(other) => Err(ControlError::MalformedReply(format!(
                "controls entry is not an object: {}",
                other
            ))),
            None => Ok(Some(Map::new())),
        }
    }

    /// Set UI controls of the running pattern
    pub async fn set_controls(&self, controls: &Map<String, Value>, save: bool) -> Result<()> {
        let save = self.save_flag(save);
        self.client.send(&command::set_controls(controls, save)).await
    }

    /// Set one slider-style control, clamped to 0–1
    pub async fn set_control(&self, name: &str, value: f64, save: bool) -> Result<()> {
        let mut controls = Map::new();
        controls.insert(name.to_string(), Value::from(command::clamp_unit(value)));
        self.set_controls(&controls, save).await
    }

    /// Set an RGB or HSV picker. Components are passed through as given.
    pub async fn set_color_control(&self, name: &str, color: [f64; 3], save: bool) -> Result<()> {
        let mut controls = Map::new();
        controls.insert(name.to_string(), Value::from(color.to_vec()));
        self.set_controls(&controls, save).await
    }

    pub async fn control_exists(&self, name: &str, pattern: Option<&str>) -> Result<bool> {
        Ok(self
            .get_controls(pattern)
            .await?
            .is_some_and(|controls| controls.contains_key(name)))
    }

    /// Name of the pattern's color picker, HSV pickers first
    pub async fn get_color_control_name(&self, pattern: Option<&str>) -> Result<Option<String>> {
        let Some(controls) = self.get_controls(pattern).await? else {
            return Ok(None);
        };

        let find = |kind: &str| controls.keys().find(|name| name.contains(kind)).cloned();
        Ok(find("hsvPicker").or_else(|| find("rgbPicker")))
    }

    /// Custom bit timing for WS2812-type LEDs
    pub async fn set_data_speed(&self, speed: u32, save: bool) -> Result<()> {
        let save = self.save_flag(save);
        self.client.send(&command::data_speed(speed, save)).await
    }
}
