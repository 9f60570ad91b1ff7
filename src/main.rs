//! Fit a network to a sampled scalar function and print its progress.
//!
//! Usage: cargo run --features cli -- --function sine --xmin -3 --xmax 3 --epochs 2000 --interval 200

use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::{Parser, ValueEnum};
use func_approx::{Session, SessionConfig, Snapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    Square,
    Sine,
    Abs,
    Cubic,
}

impl Target {
    fn eval(self, x: f64) -> f64 {
        match self {
            Target::Square => x * x,
            Target::Sine => x.sin(),
            Target::Abs => x.abs(),
            Target::Cubic => x * x * x,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Approximate a scalar function with a small neural network")]
struct Args {
    /// Function to sample
    #[arg(short, long, value_enum, default_value = "square")]
    function: Target,

    #[arg(long, default_value = "-1.0", allow_hyphen_values = true)]
    xmin: f64,

    #[arg(long, default_value = "1.0", allow_hyphen_values = true)]
    xmax: f64,

    /// Number of sampled points
    #[arg(short, long, default_value = "200")]
    npoints: usize,

    #[arg(short, long, default_value = "1000")]
    epochs: usize,

    /// Report every this many epochs
    #[arg(short, long, default_value = "100")]
    interval: usize,

    #[arg(long, default_value = "0")]
    seed: u64,

    /// Session config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    ensure!(args.xmin < args.xmax, "xmin must be below xmax");
    ensure!(args.npoints > 0, "npoints must be > 0");

    let config = load_session_config(args.config.as_ref())?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let (x, y) = sample(args.function, args.xmin, args.xmax, args.npoints, &mut rng);
    log::info!(
        "sampled {} points of {:?} on [{}, {}]",
        x.len(),
        args.function,
        args.xmin,
        args.xmax
    );

    let mut session =
        Session::new(&x, &y, &config, &mut rng).context("failed to set up the session")?;

    let mut report_err = None;
    session.run(args.epochs, args.interval, |snap| {
        match report(snap, args.json) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                report_err = Some(e);
                ControlFlow::Break(())
            }
        }
    })?;
    if let Some(e) = report_err {
        return Err(e);
    }

    let probe: Vec<f32> = (0..=10)
        .map(|i| (args.xmin + (args.xmax - args.xmin) * f64::from(i) / 10.0) as f32)
        .collect();
    let predicted = session.predict(&probe)?;
    println!("\n{:>10} {:>12} {:>12}", "x", "target", "predicted");
    for (&px, &py) in probe.iter().zip(&predicted) {
        let target = args.function.eval(f64::from(px));
        println!("{px:>10.4} {target:>12.5} {py:>12.5}");
    }

    Ok(())
}

/// Draw `n` points uniformly from `[xmin, xmax)`.
fn sample<R: Rng + ?Sized>(
    target: Target,
    xmin: f64,
    xmax: f64,
    n: usize,
    rng: &mut R,
) -> (Vec<f32>, Vec<f32>) {
    let range = xmax - xmin;
    (0..n)
        .map(|_| {
            let x = rng.r#gen::<f64>() * range + xmin;
            (x as f32, target.eval(x) as f32)
        })
        .unzip()
}

fn report(snap: &Snapshot, json: bool) -> Result<()> {
    if json {
        #[cfg(feature = "serde")]
        {
            println!("{}", serde_json::to_string(snap)?);
            return Ok(());
        }
        #[cfg(not(feature = "serde"))]
        anyhow::bail!("--json requires the `serde` feature");
    }

    match snap.val_loss {
        Some(val) => println!(
            "epoch {:>6}  loss {:.6}  val_loss {val:.6}",
            snap.epoch, snap.train_loss
        ),
        None => println!("epoch {:>6}  loss {:.6}", snap.epoch, snap.train_loss),
    }
    Ok(())
}

fn load_session_config(path: Option<&PathBuf>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };

    #[cfg(feature = "serde")]
    {
        func_approx::load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))
    }
    #[cfg(not(feature = "serde"))]
    {
        anyhow::bail!("loading {} requires the `serde` feature", path.display())
    }
}
