use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bmm_core::{HostDeviceConfig, OffloadConfig};

#[derive(Debug, Parser)]
#[command(
    name = "bmm",
    version,
    about = "Multiply a batch of small square matrices on an accelerator"
)]
pub struct Config {
    /// Order of every matrix (rows == columns)
    #[arg(long, default_value_t = 3)]
    pub order: usize,

    /// Number of matrix pairs in the batch
    #[arg(short = 'n', long, default_value_t = 1024)]
    pub batch_size: usize,

    /// Seed for operand generation; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Smallest generated element
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub min: i32,

    /// Largest generated element
    #[arg(long, default_value_t = 200, allow_negative_numbers = true)]
    pub max: i32,

    /// Print only the first N products (all by default)
    #[arg(long, value_name = "N")]
    pub show: Option<usize>,

    /// Check every product against the host reference
    #[arg(long)]
    pub verify: bool,

    /// Device ordinal to offload to
    #[arg(long, default_value_t = 0)]
    pub device: usize,

    /// Number of devices the host platform exposes
    #[arg(long, default_value_t = 1)]
    pub devices: usize,

    /// Largest block the device accepts per launch
    #[arg(long, default_value_t = 1024)]
    pub max_workers_per_block: usize,

    /// Device memory available to the offload, in MiB
    #[arg(long, default_value_t = 256)]
    pub memory_limit_mb: usize,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, env = "BMM_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn device_config(&self) -> HostDeviceConfig {
        HostDeviceConfig {
            device_count: self.devices,
            memory_limit_bytes: self.memory_limit_mb.saturating_mul(1024 * 1024),
            max_workers_per_block: self.max_workers_per_block,
        }
    }

    pub fn offload_config(&self) -> OffloadConfig {
        OffloadConfig {
            device_ordinal: self.device,
        }
    }
}

pub fn parse_args() -> Config {
    Config::parse()
}

fn level_filter(level: &str) -> Result<tracing::Level> {
    match level {
        "error" => Ok(tracing::Level::ERROR),
        "warn" => Ok(tracing::Level::WARN),
        "info" => Ok(tracing::Level::INFO),
        "debug" => Ok(tracing::Level::DEBUG),
        "trace" => Ok(tracing::Level::TRACE),
        _ => Err(anyhow::anyhow!("Invalid log level: {}", level)),
    }
}

pub fn setup_logging(level: &str) -> Result<()> {
    let level = level_filter(level)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::try_parse_from(["bmm"]).unwrap();
        assert_eq!(cfg.order, 3);
        assert_eq!(cfg.batch_size, 1024);
        assert_eq!((cfg.min, cfg.max), (1, 200));
        assert!(cfg.seed.is_none());
        assert!(!cfg.verify);
        assert_eq!(cfg.device_config().memory_limit_bytes, 256 * 1024 * 1024);
        assert_eq!(cfg.device_config().device_count, 1);
        assert_eq!(cfg.offload_config(), OffloadConfig::default());
    }

    #[test]
    fn test_flags() {
        let cfg = Config::try_parse_from([
            "bmm", "--order", "8", "-n", "16", "--seed", "5", "--min", "-3", "--show", "2",
            "--verify", "--device", "1", "--devices", "2",
        ])
        .unwrap();
        assert_eq!(cfg.order, 8);
        assert_eq!(cfg.batch_size, 16);
        assert_eq!(cfg.seed, Some(5));
        assert_eq!(cfg.min, -3);
        assert_eq!(cfg.show, Some(2));
        assert!(cfg.verify);
        assert_eq!(cfg.device_config().device_count, 2);
        assert_eq!(cfg.offload_config().device_ordinal, 1);
    }

    #[test]
    fn test_device_out_of_range_fails_selection() {
        let cfg = Config::try_parse_from(["bmm", "--device", "18446744073709551615"]).unwrap();
        assert_eq!(cfg.device_config().device_count, 1);

        let multiplier = bmm_core::BatchedMultiplier::with_config(
            bmm_core::HostPlatform::new(cfg.device_config()),
            cfg.offload_config(),
        );
        let a: bmm_core::Batch = bmm_core::Batch::identity(bmm_core::BatchShape::new(2, 1).unwrap());
        let err = multiplier.multiply(&a, &a).unwrap_err();
        assert_eq!(err.kind(), bmm_core::ErrorKind::DeviceSelection);
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter("debug").unwrap(), tracing::Level::DEBUG);
        assert!(level_filter("loud").is_err());
    }
}
