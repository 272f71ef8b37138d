//! sACN to Pixelblaze proxy loop
//!
//! A background task receives sACN packets and packs them into a shared
//! pixel buffer. The output loop ticks at the configured frame rate and
//! pushes the buffer to the device only when new data arrived since the
//! previous push. Frames that arrive faster than that are coalesced.

use std::io;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use blazebridge_control::{Pixelblaze, TcpTransport};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::ProxyConfig;
use crate::pacing::ThroughputMeter;
use crate::pixels::PixelBuffer;
use crate::sacn::SacnReceiver;

/// Position of `universe` within `universes`, if it is one we listen to
pub fn universe_slot(universes: &RangeInclusive<u16>, universe: u16) -> Option<usize> {
    universes
        .contains(&universe)
        .then(|| (universe - universes.start()) as usize)
}

/// Pixel buffer shared between the receive task and the output loop
#[derive(Debug)]
pub struct LatestFrame {
    buffer: Mutex<PixelBuffer>,
    ready: AtomicBool,
}

impl LatestFrame {
    pub fn new(universe_count: usize, pixels_per_universe: usize) -> Self {
        Self {
            buffer: Mutex::new(PixelBuffer::new(universe_count, pixels_per_universe)),
            ready: AtomicBool::new(false),
        }
    }

    /// Pack one universe of DMX data and mark the frame fresh
    pub fn store(&self, slot: usize, dmx: &[u8]) {
        let written = self.buffer.lock().pack(slot, dmx);
        if written > 0 {
            self.ready.store(true, Ordering::Release);
        }
    }

    /// The first `pixel_count` values, if anything changed since the last take
    pub fn take(&self, pixel_count: usize) -> Option<Vec<f64>> {
        if !self.ready.swap(false, Ordering::AcqRel) {
            return None;
        }
        Some(self.buffer.lock().frame(pixel_count).to_vec())
    }

    pub fn capacity(&self) -> usize {
        self.buffer.lock().len()
    }
}

/// Forwards sACN pixel data to one Pixelblaze
pub struct SacnProxy<S = TcpTransport> {
    config: ProxyConfig,
    device: Pixelblaze<S>,
    pixel_count: usize,
}

impl SacnProxy<TcpTransport> {
    /// Connect to the configured Pixelblaze
    pub async fn connect(config: ProxyConfig) -> Result<Self> {
        info!("Connecting to Pixelblaze at {}", config.pixelblaze_address);
        let device = Pixelblaze::connect(&config.pixelblaze_address, config.client_config())
            .await
            .with_context(|| format!("Failed to connect to {}", config.pixelblaze_address))?;
        Self::from_device(config, device).await
    }
}

impl<S> SacnProxy<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Read the device's pixel count and prepare to forward to it
    pub async fn from_device(mut config: ProxyConfig, device: Pixelblaze<S>) -> Result<Self> {
        config.normalize()?;

        let hardware = device
            .get_hardware_config()
            .await
            .context("Failed to read hardware config")?;
        let pixel_count = hardware
            .pixel_count()
            .context("Pixelblaze did not report a pixel count")?;

        info!(
            "Pixelblaze {} has {} pixels",
            hardware.name().unwrap_or("(unnamed)"),
            pixel_count
        );

        let universe_count = config.universes().len();
        let capacity = universe_count * config.pixels_per_universe;
        if pixel_count > capacity {
            warn!(
                "Device has {} pixels but {} universes carry only {}",
                pixel_count, universe_count, capacity
            );
        }

        Ok(Self {
            config,
            device,
            pixel_count,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    pub fn device(&self) -> &Pixelblaze<S> {
        &self.device
    }

    /// Run until Ctrl-C, a receiver failure or a device error
    pub async fn run(self) -> Result<()> {
        let universes = self.config.universes();
        let frame = Arc::new(LatestFrame::new(
            universes.len(),
            self.config.pixels_per_universe,
        ));

        let receiver = SacnReceiver::bind(self.config.bind_address, universes.clone())
            .await
            .context("Failed to start sACN receiver")?;
        let mut receive_task = tokio::spawn(receive_loop(receiver, universes, frame.clone()));

        let mut ticker = time::interval(self.config.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut meter = ThroughputMeter::new(self.config.throughput_interval(), Instant::now());

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!(
            "Forwarding to pattern variable '{}' at up to {} fps",
            self.config.variable_name, self.config.max_output_fps
        );

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Interrupted, shutting down");
                    break Ok(());
                }
                joined = &mut receive_task => {
                    break match joined {
                        Ok(Err(e)) => Err(e).context("sACN receiver failed"),
                        Ok(Ok(())) => Err(anyhow!("sACN receiver stopped")),
                        Err(e) => Err(anyhow!("sACN receive task panicked: {}", e)),
                    };
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.push_frame(&frame, &mut meter).await {
                        break Err(e);
                    }
                }
            }
        };

        receive_task.abort();
        if let Err(e) = self.device.close().await {
            warn!("Error closing Pixelblaze connection: {}", e);
        }
        result
    }

    /// Push the latest frame if it is fresh. Returns whether a frame was sent.
    pub async fn push_frame(&self, frame: &LatestFrame, meter: &mut ThroughputMeter) -> Result<bool> {
        let Some(pixels) = frame.take(self.pixel_count) else {
            return Ok(false);
        };

        self.device
            .set_variable(&self.config.variable_name, pixels)
            .await
            .context("Failed to send frame")?;

        if let Some(fps) = meter.record(Instant::now()) {
            if self.config.show_fps {
                info!("Output: {:.1} fps", fps);
            } else {
                debug!("Output: {:.1} fps", fps);
            }
        }
        Ok(true)
    }
}

async fn receive_loop(
    mut receiver: SacnReceiver,
    universes: RangeInclusive<u16>,
    frame: Arc<LatestFrame>,
) -> io::Result<()> {
    loop {
        let Some(packet) = receiver.recv().await? else {
            continue;
        };
        match universe_slot(&universes, packet.universe) {
            Some(slot) => frame.store(slot, packet.data),
            None => trace!("Ignoring universe {}", packet.universe),
        }
    }
}
