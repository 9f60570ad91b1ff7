use std::ops::ControlFlow;

use func_approx::{Session, SessionConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() -> func_approx::Result<()> {
    // y = x^2 sampled on a regular grid over [-1, 1].
    let x: Vec<f32> = (0..200).map(|i| i as f32 / 100.0 - 1.0).collect();
    let y: Vec<f32> = x.iter().map(|v| v * v).collect();

    // Reference setup: 1 -> 32 -> 32 -> 1, Adam, MSE, 20% validation.
    let mut session = Session::new(&x, &y, &SessionConfig::default(), StdRng::seed_from_u64(0))?;

    session.run(2_000, 250, |snap| {
        println!(
            "epoch={} train_loss={:.6} val_loss={:.6}",
            snap.epoch,
            snap.train_loss,
            snap.val_loss.unwrap_or(f32::NAN)
        );
        ControlFlow::Continue(())
    })?;

    let probe = [-1.0_f32, -0.5, 0.0, 0.5, 1.0];
    for (x, y) in probe.iter().zip(session.predict(&probe)?) {
        println!("x={x:+.2} y={y:.4} (target {:.4})", x * x);
    }

    Ok(())
}
