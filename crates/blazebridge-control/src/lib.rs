//! BlazeBridge Control - Pixelblaze device client
//!
//! A request/response client for the Pixelblaze LED controller's WebSocket
//! protocol. The device is asynchronous: it sends unsolicited frames and does
//! not tag its replies. This crate gives callers a plain "send a command, get
//! the matching reply" API on top of it:
//!
//! - **Frames**: text (JSON) and binary (2-byte header + payload) classification
//! - **Connection**: bounded-wait receive and stale-frame draining
//! - **Requests**: one exchange at a time, serialized behind a mutex
//! - **Catalogs**: reassembly of multi-frame program lists
//! - **Device**: one method per Pixelblaze command
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blazebridge_control::{ClientConfig, Pixelblaze};
//!
//! # async fn run() -> blazebridge_control::Result<()> {
//! let pixelblaze = Pixelblaze::connect("192.168.1.15", ClientConfig::default()).await?;
//!
//! let config = pixelblaze.get_hardware_config().await?;
//! println!("{} pixels", config.pixel_count().unwrap_or(0));
//!
//! let patterns = pixelblaze.get_pattern_list().await?;
//! for (id, name) in patterns.iter() {
//!     println!("{id}: {name}");
//! }
//!
//! pixelblaze.set_brightness(0.5).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`frame`] - Frame kinds, binary header, classifier
//! - [`connection`] - WebSocket transport, receive and drain
//! - [`request`] - Request/response engine
//! - [`catalog`] - Fragmented program list assembly
//! - [`command`] - JSON command encoding
//! - [`device`] - Pixelblaze command API
//! - [`error`] - Error types

pub mod catalog;
pub mod command;
pub mod connection;
pub mod device;
pub mod error;
pub mod frame;
pub mod models;
pub mod request;

// Re-exports
pub use catalog::Catalog;
pub use connection::{ClientConfig, Connection, ConnectionState, TcpTransport};
pub use device::Pixelblaze;
pub use error::{ControlError, Result};
pub use frame::{Frame, FrameKind};
pub use models::HardwareConfig;
pub use request::RequestClient;
