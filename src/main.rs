//! groupnorm - run group normalization forward and backward on random input
//!
//! Prints per-group batch statistics, checks that the output groups are
//! normalized and compares the closed-form gradients with finite differences.

use clap::{Parser, ValueEnum};
use flexi_logger::Logger;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::process::ExitCode;

use groupnorm::gradcheck::check_gradients;
use groupnorm::ops::batch_statistics;
use groupnorm::{Float, GroupNormConfig, Precision, Result, Tensor};

const GRADCHECK_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DType {
    F32,
    F64,
}

#[derive(Parser, Debug)]
#[command(
    name = "groupnorm",
    about = "Group normalization forward/backward with a finite-difference gradient check"
)]
struct Args {
    /// Batch size (N)
    #[arg(short, long, default_value_t = 2)]
    batch: usize,

    /// Number of channels (C)
    #[arg(short, long, default_value_t = 8)]
    channels: usize,

    /// Number of groups (G), must divide the channel count
    #[arg(short, long, default_value_t = 4)]
    groups: usize,

    /// Spatial height (H)
    #[arg(long, default_value_t = 4)]
    height: usize,

    /// Spatial width (W)
    #[arg(long, default_value_t = 4)]
    width: usize,

    /// Variance floor added before the square root
    #[arg(long, default_value_t = GroupNormConfig::DEFAULT_EPS)]
    eps: f64,

    /// Accumulate statistics in f64
    #[arg(long)]
    wide: bool,

    /// JSON configuration file, replaces --channels, --groups and --eps
    #[arg(long)]
    config: Option<PathBuf>,

    /// Finite-difference step of the gradient check
    #[arg(long, default_value_t = 1e-5)]
    step: f64,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Element type of the forward/backward run
    #[arg(long, value_enum, default_value_t = DType::F32)]
    dtype: DType,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> Result<GroupNormConfig> {
    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            GroupNormConfig::from_json(&std::fs::read_to_string(path)?)?
        }
        None => GroupNormConfig::new(args.channels, args.groups, args.eps)?,
    };
    Ok(if args.wide {
        config.with_precision(Precision::Wide)
    } else {
        config
    })
}

fn run<T: Float>(args: &Args, config: &GroupNormConfig) -> Result<()> {
    let shape = [
        args.batch,
        config.num_channels(),
        args.height,
        args.width,
    ];
    config.infer_shape(&shape)?;
    log::info!(
        "{} forward/backward on {:?}: {} groups, eps {}, {:?} precision",
        T::type_name(),
        shape,
        config.num_groups(),
        config.eps(),
        config.precision()
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let x64 = Tensor::<f64>::randn(&shape, &mut rng);
    let scale64 = Tensor::<f64>::randn(&[config.num_channels()], &mut rng);
    let shift64 = Tensor::<f64>::randn(&[config.num_channels()], &mut rng);

    let x: Tensor<T> = x64.cast();
    let scale: Tensor<T> = scale64.cast();
    let shift: Tensor<T> = shift64.cast();

    let stats = batch_statistics(&x, config)?;
    println!("group  batch mean    batch var");
    for (g, (mean, var)) in stats
        .mean
        .to_f64_vec()
        .iter()
        .zip(stats.var.to_f64_vec())
        .enumerate()
    {
        println!("{:>5}  {:>10.6}  {:>10.6}", g, mean, var);
    }

    let (y, cache) = config.forward(&x, &scale, &shift)?;
    let grouped = cache.normalized.reshape(&[
        args.batch,
        config.num_groups(),
        config.channels_per_group(),
        args.height,
        args.width,
    ])?;
    let group_means = grouped.mean_axes(&[2, 3, 4], false)?.to_f64_vec();
    let group_vars = grouped.square().mean_axes(&[2, 3, 4], false)?.to_f64_vec();
    let mean_drift = group_means.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let var_drift = group_vars.iter().fold(0.0f64, |m, v| m.max((v - 1.0).abs()));
    println!(
        "normalized groups: max |mean| {:.3e}, max |var - 1| {:.3e}",
        mean_drift, var_drift
    );

    let grads = config.backward(&Tensor::ones(y.shape()), &cache, &scale)?;
    let max_abs = |t: &Tensor<T>| t.to_f64_vec().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    println!(
        "gradients of sum(y): max |dx| {:.3e}, max |dscale| {:.3e}, max |dshift| {:.3e}",
        max_abs(&grads.dx),
        max_abs(&grads.dscale),
        max_abs(&grads.dshift)
    );

    // Finite differences need f64 regardless of the run's element type
    let report = check_gradients(config, &x64, &scale64, &shift64, args.step)?;
    println!("gradient check: {}", report);
    if report.passes(GRADCHECK_TOLERANCE) {
        log::info!("gradient check passed (tolerance {:e})", GRADCHECK_TOLERANCE);
    } else {
        log::warn!(
            "gradient check error {:.3e} exceeds tolerance {:e}",
            report.max_error(),
            GRADCHECK_TOLERANCE
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let _logger = match Logger::try_with_env_or_str(&args.log_level)
        .and_then(|logger| logger.format(flexi_logger::colored_default_format).start())
    {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize logger: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = load_config(&args).and_then(|config| match args.dtype {
        DType::F32 => run::<f32>(&args, &config),
        DType::F64 => run::<f64>(&args, &config),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
