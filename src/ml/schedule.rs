//! Linear warmup + linear decay learning-rate schedule.
//!
//! lr_t = peak · t / warmup                      for t < warmup
//! lr_t = peak · (total − t) / (total − warmup)  afterwards, floored at 0

/// Per-step learning rate, advanced once per optimizer step.
#[derive(Debug, Clone)]
pub struct LinearWarmupDecay {
    peak_lr:      f64,
    warmup_steps: usize,
    total_steps:  usize,
    current_step: usize,
}

impl LinearWarmupDecay {
    pub fn new(peak_lr: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self { peak_lr, warmup_steps, total_steps, current_step: 0 }
    }

    /// Warmup length as a fraction of the total step count.
    pub fn with_warmup_ratio(peak_lr: f64, warmup_ratio: f64, total_steps: usize) -> Self {
        let warmup_steps = (total_steps as f64 * warmup_ratio) as usize;
        Self::new(peak_lr, warmup_steps, total_steps)
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }

    pub fn get_lr(&self) -> f64 {
        let t = self.current_step;
        if t < self.warmup_steps {
            return self.peak_lr * t as f64 / self.warmup_steps as f64;
        }
        let remaining = self.total_steps.saturating_sub(t) as f64;
        let decay_len = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
        self.peak_lr * (remaining / decay_len).max(0.0)
    }

    pub fn step(&mut self) {
        self.current_step += 1;
    }
}
