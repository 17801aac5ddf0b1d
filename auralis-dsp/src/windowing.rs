/// Fixed-stride windowing shared by the fingerprint extractor's `sampling`
/// strategy and the chunked streaming processor's chunk/overlap math.
///
/// Adapted from the overlap-add indexing in the teacher's chunk processor:
/// the hop/overlap arithmetic is the same, generalized to return `(start,
/// end)` ranges instead of driving an in-place overlap-add buffer directly,
/// since the two callers need different post-processing (concatenation for
/// sampling-mode analysis, crossfade for streaming).

/// One `(start, end)` sample-index window into a buffer of `total_samples`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Non-overlapping windows of `window_len` samples spaced `stride` samples
/// apart, covering `total_samples`. Used by the fingerprint analyzer's
/// `sampling` strategy to bound work on long tracks: `window_len` is the
/// per-window analysis length and `stride` the distance between window
/// starts (spec default: 20s between starts).
pub fn strided_windows(total_samples: usize, window_len: usize, stride: usize) -> Vec<Window> {
    if total_samples == 0 || window_len == 0 || stride == 0 {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut start = 0usize;
    while start < total_samples {
        let end = (start + window_len).min(total_samples);
        windows.push(Window { start, end });
        if end >= total_samples {
            break;
        }
        start += stride;
    }
    windows
}

/// Overlapping chunks of `chunk_len` samples with `overlap` samples shared
/// between consecutive chunks, covering exactly `total_samples` (the last
/// chunk is truncated, never padded, so `sum(chunk.len()) - overlaps ==
/// total_samples` holds exactly). Used by the chunked streaming processor.
pub fn overlapping_chunks(total_samples: usize, chunk_len: usize, overlap: usize) -> Vec<Window> {
    if total_samples == 0 || chunk_len == 0 || overlap >= chunk_len {
        return if total_samples == 0 {
            Vec::new()
        } else {
            vec![Window { start: 0, end: total_samples }]
        };
    }

    let stride = chunk_len - overlap;
    let mut windows = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + chunk_len).min(total_samples);
        windows.push(Window { start, end });
        if end >= total_samples {
            break;
        }
        start += stride;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strided_windows_cover_short_audio_in_one_window() {
        let w = strided_windows(1000, 5000, 5000);
        assert_eq!(w, vec![Window { start: 0, end: 1000 }]);
    }

    #[test]
    fn strided_windows_space_correctly() {
        let w = strided_windows(25, 5, 10);
        assert_eq!(w, vec![
            Window { start: 0, end: 5 },
            Window { start: 10, end: 15 },
            Window { start: 20, end: 25 },
        ]);
    }

    #[test]
    fn overlapping_chunks_cover_exactly_total_samples() {
        let chunks = overlapping_chunks(1000, 150, 50);
        assert_eq!(chunks.last().unwrap().end, 1000);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start, pair[0].end - 50);
        }
    }

    #[test]
    fn overlapping_chunks_handles_audio_shorter_than_one_chunk() {
        let chunks = overlapping_chunks(80, 150, 50);
        assert_eq!(chunks, vec![Window { start: 0, end: 80 }]);
    }

    #[test]
    fn empty_input_yields_no_windows() {
        assert!(strided_windows(0, 100, 100).is_empty());
        assert!(overlapping_chunks(0, 100, 50).is_empty());
    }
}
