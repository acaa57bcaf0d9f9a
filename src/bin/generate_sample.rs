use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use image::{GrayImage, Luma};
use log::info;
use serde::Serialize;

/// Write a synthetic acquisition directory: PNG triplets plus `trap_positions.json`.
#[derive(Parser)]
#[command(name = "generate_sample", version)]
struct Args {
    /// Output directory (created if missing)
    #[arg(value_name = "OUT_DIR")]
    out: PathBuf,

    /// Frame width in pixels
    #[arg(long, default_value = "128")]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value = "128")]
    height: u32,

    /// Number of triplet captures
    #[arg(long, default_value = "30")]
    captures: u64,

    /// Trap grid columns
    #[arg(long, default_value = "10")]
    columns: usize,

    /// Trap grid rows
    #[arg(long, default_value = "11")]
    rows: usize,

    /// Mean background level
    #[arg(long, default_value = "12.0")]
    background: f64,

    /// Standard deviation of the read noise
    #[arg(long, default_value = "2.0")]
    noise: f64,

    /// Gaussian width of a trap spot, in pixels
    #[arg(long, default_value = "1.5")]
    spot_sigma: f64,

    /// Noise seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

#[derive(Serialize)]
struct Position {
    x: f64,
    y: f64,
}

/// Brightness of a trap spot at squared distance `d2` from its center.
fn spot_intensity(d2: f64, amplitude: f64, spot_sigma: f64) -> f64 {
    amplitude * (-d2 / (2.0 * spot_sigma * spot_sigma)).exp()
}

/// Sensor background plus Gaussian read noise.
///
/// Uniform draws come from xoshiro256** seeded through splitmix64; Box-Muller turns
/// each pair of draws into two normal samples, the second kept for the next call.
struct SensorNoise {
    state: [u64; 4],
    background: f64,
    sigma: f64,
    spare: Option<f64>,
}

impl SensorNoise {
    fn new(seed: u64, background: f64, sigma: f64) -> Self {
        let mut mix = seed;
        let state = std::array::from_fn(|_| {
            mix = mix.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = mix;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^ (z >> 31)
        });
        Self {
            state,
            background,
            sigma,
            spare: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let [s0, s1, s2, s3] = &mut self.state;
        let out = s1.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let shifted = *s1 << 17;
        *s2 ^= *s0;
        *s3 ^= *s1;
        *s1 ^= *s2;
        *s0 ^= *s3;
        *s2 ^= shifted;
        *s3 = s3.rotate_left(45);
        out
    }

    /// Uniform in `(0, 1]`.
    fn unit(&mut self) -> f64 {
        ((self.next_u64() >> 11) + 1) as f64 / (1u64 << 53) as f64
    }

    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }
        let radius = (-2.0 * self.unit().ln()).sqrt();
        let angle = std::f64::consts::TAU * self.unit();
        self.spare = Some(radius * angle.sin());
        radius * angle.cos()
    }

    fn sample(&mut self) -> f64 {
        self.background + self.sigma * self.standard_normal()
    }
}

/// Regular grid of traps, ids in row-major order starting at 0.
fn trap_grid(width: u32, height: u32, columns: usize, rows: usize) -> Vec<(f64, f64)> {
    let margin = 8.0;
    let step = |extent: u32, n: usize| {
        if n > 1 {
            (extent as f64 - 2.0 * margin) / (n - 1) as f64
        } else {
            0.0
        }
    };
    let (dx, dy) = (step(width, columns), step(height, rows));
    (0..rows)
        .flat_map(|r| (0..columns).map(move |c| (margin + c as f64 * dx, margin + r as f64 * dy)))
        .collect()
}

fn render_frame(
    args: &Args,
    traps: &[(f64, f64)],
    amplitude: f64,
    noise: &mut SensorNoise,
) -> GrayImage {
    let mut image = GrayImage::new(args.width, args.height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let signal: f64 = traps
            .iter()
            .map(|&(tx, ty)| {
                let d2 = (x as f64 - tx).powi(2) + (y as f64 - ty).powi(2);
                spot_intensity(d2, amplitude, args.spot_sigma)
            })
            .sum();
        let value = signal + noise.sample();
        *pixel = Luma([value.round().clamp(0.0, 255.0) as u8]);
    }
    image
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    ensure!(args.width > 0 && args.height > 0, "frame size must be positive");
    ensure!(
        args.noise >= 0.0 && args.spot_sigma > 0.0,
        "noise must be non-negative and spot sigma positive"
    );
    ensure!(
        args.captures <= 15 * 1000,
        "at most 15000 captures fit the exposure index range"
    );

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    let mut noise = SensorNoise::new(args.seed, args.background, args.noise);
    let traps = trap_grid(args.width, args.height, args.columns, args.rows);

    let positions: BTreeMap<String, Position> = traps
        .iter()
        .enumerate()
        .map(|(id, &(x, y))| (id.to_string(), Position { x, y }))
        .collect();
    let trap_path = args.out.join("trap_positions.json");
    std::fs::write(&trap_path, serde_json::to_string_pretty(&positions)?)
        .with_context(|| format!("writing {}", trap_path.display()))?;

    // Captures cycle through the 15 exposure buckets; brighter spots for longer exposures.
    let roles = [("first", 1.0), ("second", 0.7), ("third", 0.4)];
    for capture in 0..args.captures {
        let bucket = capture % 15;
        let index = bucket * 1000 + capture / 15;
        let exposure_ms = bucket as f64 * 0.5 + 2.0;
        let sequence = (capture + 1) * 100;

        for (role, weight) in roles {
            let amplitude = 20.0 * exposure_ms * weight;
            let frame = render_frame(&args, &traps, amplitude, &mut noise);
            let path = args
                .out
                .join(format!("frame_{sequence}us_{role}.acq_{index}.png"));
            frame
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }

    info!(
        "Wrote {} frames ({}x{}) and {} traps to {}",
        args.captures * 3,
        args.width,
        args.height,
        traps.len(),
        args.out.display()
    );
    println!(
        "Try: trapframes summary {} --exposure-ms 2.0",
        args.out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_seeded() {
        let draw = |seed| {
            let mut noise = SensorNoise::new(seed, 12.0, 2.0);
            (0..16).map(|_| noise.sample()).collect::<Vec<f64>>()
        };
        assert_eq!(draw(7), draw(7));
        assert_ne!(draw(7), draw(8));
    }

    #[test]
    fn test_noise_statistics() {
        let mut noise = SensorNoise::new(42, 12.0, 2.0);
        let samples: Vec<f64> = (0..20_000).map(|_| noise.sample()).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!((mean - 12.0).abs() < 0.1, "mean {mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.1, "std {}", var.sqrt());

        let mut flat = SensorNoise::new(1, 5.0, 0.0);
        assert!((0..8).all(|_| flat.sample() == 5.0));
    }

    #[test]
    fn test_trap_grid_layout() {
        let traps = trap_grid(128, 128, 10, 11);
        assert_eq!(traps.len(), 110);
        assert_eq!(traps[0], (8.0, 8.0));
        let (x, y) = traps[109];
        assert!((x - 120.0).abs() < 1e-9 && (y - 120.0).abs() < 1e-9);
    }
}
