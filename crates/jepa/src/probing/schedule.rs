use serde::{Deserialize, Serialize};

/// Learning-rate schedule for prober training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LrSchedule {
    Constant,
    #[default]
    Cosine,
}

impl LrSchedule {
    /// Learning rate at `step` of `total_steps`.
    pub fn lr_at(self, base_lr: f64, warmup_steps: usize, total_steps: usize, step: usize) -> f64 {
        match self {
            LrSchedule::Constant => base_lr,
            LrSchedule::Cosine => lr_schedule(base_lr, warmup_steps, total_steps, step),
        }
    }
}

/// Compute the learning rate at a given step using warmup + cosine decay.
///
/// - Warmup phase (`step < warmup_steps`): linearly ramps from 0 to `base_lr`.
/// - Cosine phase: decays from `base_lr` to 0 following a cosine schedule.
pub fn lr_schedule(base_lr: f64, warmup_steps: usize, total_steps: usize, step: usize) -> f64 {
    if warmup_steps > 0 && step < warmup_steps {
        base_lr * (step + 1) as f64 / warmup_steps as f64
    } else {
        let decay_steps = total_steps.saturating_sub(warmup_steps).max(1);
        let progress = (step.saturating_sub(warmup_steps)) as f64 / decay_steps as f64;
        let progress = progress.min(1.0);
        base_lr * 0.5 * (1.0 + (std::f64::consts::PI * progress).cos())
    }
}
