//! BlazeBridge - sACN (E1.31) to Pixelblaze proxy
//!
//! - [`sacn`] - multicast receiver and E1.31 data packet parser
//! - [`pixels`] - RGB to pattern number packing
//! - [`pacing`] - output throughput measurement
//! - [`proxy`] - receive task and paced output loop
//! - [`config`] - TOML configuration
//! - [`logging_setup`] - tracing subscriber installation

pub mod config;
pub mod logging_setup;
pub mod pacing;
pub mod pixels;
pub mod proxy;
pub mod sacn;

pub use config::ProxyConfig;
pub use proxy::SacnProxy;
