mod cli;

use std::io::Write;

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use bmm_core::reference::{mismatches, reference_multiply};
use bmm_core::{BatchShape, BatchedMultiplier, HostPlatform};
use bmm_gen::{render_triples, MatrixGenerator};

use crate::cli::{parse_args, setup_logging};

fn main() -> Result<()> {
    let config = parse_args();
    setup_logging(&config.log_level)?;

    info!("Starting bmm v{}", env!("CARGO_PKG_VERSION"));

    let shape = BatchShape::new(config.order, config.batch_size).context("invalid batch shape")?;
    let generator = match config.seed {
        Some(seed) => {
            info!("Generating {} operands with seed {}", shape, seed);
            MatrixGenerator::new(seed)
        }
        None => {
            info!("Generating {} operands", shape);
            MatrixGenerator::from_entropy()
        }
    };
    let mut generator = generator
        .with_range(config.min, config.max)
        .context("invalid element range")?;
    let (a, b) = generator.generate_pair(shape);

    let multiplier = BatchedMultiplier::with_config(
        HostPlatform::new(config.device_config()),
        config.offload_config(),
    );
    let c = multiplier
        .multiply(&a, &b)
        .context("batched multiply failed")?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(render_triples(&a, &b, &c, config.show).as_bytes())?;
    stdout.flush()?;

    if config.verify {
        let expected = reference_multiply(&a, &b);
        let bad = mismatches(&expected, &c);
        if !bad.is_empty() {
            error!("First mismatching product: matrix {}", bad[0]);
            bail!(
                "{} of {} products differ from the host reference",
                bad.len(),
                shape.batch_size()
            );
        }
        info!("All {} products match the host reference", shape.batch_size());
    }

    Ok(())
}
