//! Generate synthetic probing splits and an untrained checkpoint for
//! exercising `jepa-probe eval` without the real dataset.
//!
//! Usage: cargo run -p probe-eval --example gen_synthetic_wall -- data/synthetic
//!
//! Writes `probe_normal/{train,val}/`, `probe_wall/val/` and
//! `model_weights.mpk` under the given directory.

use std::path::Path;

use burn::backend::ndarray::NdArray;
use jepa::{save_model, JepaConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trajectory::{FrameShape, TrajectoryWriter, WallEpisode};

const SIZE: usize = 64;
const STEPS: usize = 17;
const WALL_X: usize = 32;

/// Agent walk in a square room with a vertical wall. With `door` set the
/// wall has a gap the agent may pass through; otherwise it blocks.
fn episode(rng: &mut StdRng, id: u64, door: bool) -> WallEpisode {
    let frame = FrameShape::new(2, SIZE, SIZE);
    let mut states = vec![0.0; STEPS * frame.numel()];
    let mut actions = Vec::with_capacity((STEPS - 1) * 2);
    let mut locations = Vec::with_capacity(STEPS * 2);

    let door_y = rng.gen_range(16..48);
    let mut pos = (rng.gen_range(2.0..30.0_f32), rng.gen_range(2.0..62.0_f32));

    for t in 0..STEPS {
        let base = t * frame.numel();
        let (x, y) = (pos.0.round() as usize, pos.1.round() as usize);
        states[base + y * SIZE + x] = 1.0;
        for row in 0..SIZE {
            if !(door && row.abs_diff(door_y) <= 4) {
                states[base + SIZE * SIZE + row * SIZE + WALL_X] = 1.0;
            }
        }
        locations.extend([pos.0, pos.1]);

        if t + 1 < STEPS {
            let action = (rng.gen_range(-2.0..2.0_f32), rng.gen_range(-2.0..2.0_f32));
            let mut next = (
                (pos.0 + action.0).clamp(0.0, (SIZE - 1) as f32),
                (pos.1 + action.1).clamp(0.0, (SIZE - 1) as f32),
            );
            let crosses = (pos.0 < WALL_X as f32) != (next.0 < WALL_X as f32);
            let through_door = door && (next.1.round() as usize).abs_diff(door_y) <= 4;
            if crosses && !through_door {
                next.0 = pos.0;
            }
            actions.extend([next.0 - pos.0, next.1 - pos.1]);
            pos = next;
        }
    }

    WallEpisode {
        episode_id: id,
        num_steps: STEPS,
        frame,
        action_dim: 2,
        states,
        actions,
        locations: Some(locations),
        source: if door { "synthetic_normal" } else { "synthetic_wall" }.to_string(),
    }
}

fn write_split(dir: &Path, rng: &mut StdRng, episodes: u64, door: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut writer = TrajectoryWriter::new(dir.join("episodes.parquet"));
    for id in 0..episodes {
        writer.record(episode(rng, id, door));
    }
    writer.finish()?;
    println!("Wrote {episodes} episodes to {}", dir.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let root = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/synthetic".to_string());
    let root = Path::new(&root);
    let mut rng = StdRng::seed_from_u64(0);

    write_split(&root.join("probe_normal/train"), &mut rng, 256, true)?;
    write_split(&root.join("probe_normal/val"), &mut rng, 64, true)?;
    write_split(&root.join("probe_wall/val"), &mut rng, 64, false)?;

    let model = JepaConfig::new(256, 2).init::<NdArray<f32>>(&Default::default());
    let path = save_model(&model, &root.join("model_weights"))?;
    println!("Wrote untrained checkpoint to {}", path.display());

    Ok(())
}
