// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Linear warmup followed by linear decay to zero:
//
//   lr
//   │      /\
//   │     /  \
//   │    /     \
//   │   /        \
//   │  /           \
//   └──────────────────── step
//      warmup      total
//
//   step <  warmup : base · step / warmup
//   step >= warmup : base · (1 − step / total)

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarmupLinearDecay {
    base_lr:      f64,
    warmup_steps: usize,
    total_steps:  usize,
}

impl WarmupLinearDecay {
    pub fn new(base_lr: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self { base_lr, warmup_steps, total_steps }
    }

    /// Derive step counts from dataset size the usual BERT way:
    /// total = ⌊n / batch · epochs⌋, warmup = ⌊total · proportion⌋.
    pub fn from_epochs(
        base_lr:           f64,
        num_examples:      usize,
        batch_size:        usize,
        num_epochs:        f64,
        warmup_proportion: f64,
    ) -> Self {
        let total  = (num_examples as f64 / batch_size.max(1) as f64 * num_epochs).floor() as usize;
        let warmup = (total as f64 * warmup_proportion).floor() as usize;
        Self::new(base_lr, warmup, total)
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }

    /// Learning rate applied at the 0-based global `step`.
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.base_lr * step as f64 / self.warmup_steps as f64;
        }
        if self.total_steps == 0 {
            return 0.0;
        }
        let remaining = 1.0 - (step.min(self.total_steps) as f64 / self.total_steps as f64);
        self.base_lr * remaining
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_step_counts_from_epochs() {
        let s = WarmupLinearDecay::from_epochs(5e-5, 1000, 32, 3.0, 0.1);
        assert_eq!(s.total_steps(), 93);
        assert_eq!(s.warmup_steps(), 9);
    }

    #[test]
    fn test_warmup_ramps_linearly() {
        let s = WarmupLinearDecay::new(1.0, 10, 100);
        assert!(close(s.lr_at(0), 0.0));
        assert!(close(s.lr_at(5), 0.5));
        assert!(close(s.lr_at(9), 0.9));
    }

    #[test]
    fn test_decay_reaches_zero() {
        let s = WarmupLinearDecay::new(2.0, 10, 100);
        assert!(close(s.lr_at(10), 1.8));
        assert!(close(s.lr_at(50), 1.0));
        assert!(close(s.lr_at(100), 0.0));
        assert!(close(s.lr_at(150), 0.0));
    }

    #[test]
    fn test_no_warmup() {
        let s = WarmupLinearDecay::new(1.0, 0, 4);
        assert!(close(s.lr_at(0), 1.0));
        assert!(close(s.lr_at(2), 0.5));
    }
}
