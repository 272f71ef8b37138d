//! BlazeBridge - forward sACN (E1.31) pixel data to a Pixelblaze
//!
//! Listens for sACN universes on the local network, packs the RGB data into
//! one number per pixel and pushes it into an exported variable of the
//! running Pixelblaze pattern (see `assets/sacn-listener.js`).

use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use blazebridge::{logging_setup, ProxyConfig, SacnProxy};

#[derive(Parser, Debug)]
#[command(name = "blazebridge", version, about = "Forward sACN pixel data to a Pixelblaze")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local interface address used to join the sACN multicast groups
    #[arg(short, long)]
    bind: Option<Ipv4Addr>,

    /// Pixelblaze IP address or host name
    #[arg(short, long)]
    pixelblaze: Option<String>,

    /// Pixels taken from each universe (1-170)
    #[arg(long)]
    pixels_per_universe: Option<usize>,

    /// First sACN universe
    #[arg(long)]
    first_universe: Option<u16>,

    /// Number of consecutive universes
    #[arg(short, long)]
    universes: Option<u16>,

    /// Maximum frames per second sent to the Pixelblaze
    #[arg(long)]
    max_fps: Option<f64>,

    /// Throughput measurement interval in milliseconds (min 500)
    #[arg(long)]
    throughput_interval_ms: Option<u64>,

    /// Report the output frame rate
    #[arg(long)]
    show_fps: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(address) = self.pixelblaze {
            config.pixelblaze_address = address;
        }
        if let Some(ppu) = self.pixels_per_universe {
            config.pixels_per_universe = ppu;
        }
        if let Some(first) = self.first_universe {
            config.first_universe = first;
        }
        if let Some(count) = self.universes {
            config.universe_count = count;
        }
        if let Some(fps) = self.max_fps {
            config.max_output_fps = fps;
        }
        if let Some(ms) = self.throughput_interval_ms {
            config.throughput_interval_ms = ms;
        }
        if self.show_fps {
            config.show_fps = true;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ProxyConfig::load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.normalize()?;

    let _log_guard = logging_setup::init(&config.logging)?;

    let proxy = SacnProxy::connect(config).await?;
    if let Err(e) = proxy.run().await {
        error!("BlazeBridge stopped: {:#}", e);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "blazebridge",
            "--pixelblaze",
            "10.0.0.9",
            "--bind",
            "10.0.0.2",
            "--universes",
            "2",
            "--max-fps",
            "60",
            "--show-fps",
        ]);
        let mut config = ProxyConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.pixelblaze_address, "10.0.0.9");
        assert_eq!(config.bind_address, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(config.universe_count, 2);
        assert_eq!(config.max_output_fps, 60.0);
        assert!(config.show_fps);
        // Untouched
        assert_eq!(config.first_universe, 1);
        assert_eq!(config.pixels_per_universe, 170);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
