// ============================================================
// Layer 4 — Sequence Chunker
// ============================================================
// Cuts a long token stream into fixed-size training windows.
//
// Consecutive windows start `window - overlap` items apart, so
// a token near a boundary is seen with context on both sides
// in at least one window:
//
//   window=5, overlap=2, stream = a b c d e f g h
//     [a b c d e]
//           [d e f g h]
//
// The last window may be shorter; the batcher pads it.

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    window:  usize,
    overlap: usize,
}

impl Chunker {
    /// Panics if `overlap >= window`, which would never advance.
    pub fn new(window: usize, overlap: usize) -> Self {
        assert!(
            overlap < window,
            "overlap ({overlap}) must be less than window ({window})"
        );
        Self { window, overlap }
    }

    pub fn stride(&self) -> usize {
        self.window - self.overlap
    }

    pub fn chunk<T: Clone>(&self, items: &[T]) -> Vec<Vec<T>> {
        let mut chunks = Vec::new();
        let mut start  = 0usize;

        while start < items.len() {
            let end = (start + self.window).min(items.len());
            chunks.push(items[start..end].to_vec());
            if end == items.len() {
                break;
            }
            start += self.stride();
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_overlap() {
        let c = Chunker::new(5, 2);
        let stream: Vec<u32> = (0..8).collect();
        let chunks = c.chunk(&stream);
        assert_eq!(chunks, vec![vec![0, 1, 2, 3, 4], vec![3, 4, 5, 6, 7]]);
    }

    #[test]
    fn test_short_stream_gives_one_window() {
        let c = Chunker::new(16, 4);
        assert_eq!(c.chunk(&[7u32, 8, 9]), vec![vec![7, 8, 9]]);
    }

    #[test]
    fn test_empty_stream_gives_nothing() {
        let c = Chunker::new(4, 1);
        assert!(c.chunk::<u32>(&[]).is_empty());
    }

    #[test]
    #[should_panic]
    fn test_overlap_must_be_less_than_window() {
        let _ = Chunker::new(3, 3);
    }
}
