// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles the training windows, then cuts them into a
// training and a validation set. Windows from one document
// are adjacent after chunking, so splitting without a shuffle
// would hold out whole documents at the tail of the corpus.
//
// The RNG is a parameter so a run seeded on the command line
// reproduces the same split.

use rand::{seq::SliceRandom, Rng};

/// Shuffle `samples` and return (train, validation), with
/// round(len · train_fraction) items in the training half.
pub fn split_train_val<T, R: Rng + ?Sized>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    rng:            &mut R,
) -> (Vec<T>, Vec<T>) {
    samples.shuffle(rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction.clamp(0.0, 1.0)).round() as usize;
    let val      = samples.split_off(split_at.min(total));

    tracing::debug!("split: {} train / {} validation", samples.len(), val.len());
    (samples, val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_split_sizes() {
        let mut rng = StdRng::seed_from_u64(1);
        let (train, val) = split_train_val((0..100).collect::<Vec<u32>>(), 0.8, &mut rng);
        assert_eq!((train.len(), val.len()), (80, 20));
    }

    #[test]
    fn test_nothing_lost() {
        let mut rng = StdRng::seed_from_u64(2);
        let (mut train, val) = split_train_val((0..37).collect::<Vec<u32>>(), 0.7, &mut rng);
        train.extend(val);
        train.sort_unstable();
        assert_eq!(train, (0..37).collect::<Vec<u32>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_val((0..20).collect::<Vec<u32>>(), 0.5, &mut StdRng::seed_from_u64(9));
        let b = split_train_val((0..20).collect::<Vec<u32>>(), 0.5, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_and_out_of_range_fraction() {
        let mut rng = StdRng::seed_from_u64(3);
        let (train, val) = split_train_val(Vec::<u32>::new(), 0.8, &mut rng);
        assert!(train.is_empty() && val.is_empty());

        let (train, val) = split_train_val((0..10).collect::<Vec<u32>>(), 1.5, &mut rng);
        assert_eq!((train.len(), val.len()), (10, 0));
    }
}
