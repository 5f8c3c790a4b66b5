// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles Examples with a seeded RNG and splits them into
// (train, validation). Splitting happens on Examples, BEFORE
// tokenization, so the overflow windows of one Example always
// land on the same side of the split.
//
// A fixed seed makes preprocessing reproducible run to run.
//
// Reference: rand crate documentation (SeedableRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

pub const DEFAULT_SEED: u64 = 42;

/// Shuffle `samples` with `seed` and split off `test_size` of them.
///
/// Returns (train, validation). `test_size` is a fraction in [0, 1].
pub fn split_train_val<T>(mut samples: Vec<T>, test_size: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let n_val    = ((total as f64) * test_size.clamp(0.0, 1.0)).ceil() as usize;
    let split_at = total - n_val.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val)      = split_train_val(items, 0.2, DEFAULT_SEED);
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(),   20);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, val)      = split_train_val(items, 0.3, DEFAULT_SEED);
        let mut all: Vec<usize> = train.into_iter().chain(val).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_val((0..30).collect::<Vec<usize>>(), 0.2, 7);
        let b = split_train_val((0..30).collect::<Vec<usize>>(), 0.2, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let (train, val) = split_train_val(Vec::<usize>::new(), 0.2, DEFAULT_SEED);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_zero_test_size_keeps_everything() {
        let (train, val) = split_train_val((0..10).collect::<Vec<usize>>(), 0.0, DEFAULT_SEED);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }
}
