//! Framing and time-domain statistics

/// Number of analysis frames for a signal
///
/// Frames start at sample 0 and advance by `hop`; only complete frames
/// count, except that a signal shorter than one frame yields a single frame.
pub fn frame_count(len: usize, frame_length: usize, hop: usize) -> usize {
    if len == 0 {
        0
    } else if len <= frame_length {
        1
    } else {
        1 + (len - frame_length) / hop.max(1)
    }
}

/// Iterate over the frames of a signal (the last frame may be short for tiny signals)
pub fn frames<'a>(
    samples: &'a [f32],
    frame_length: usize,
    hop: usize,
) -> impl Iterator<Item = &'a [f32]> + 'a {
    let count = frame_count(samples.len(), frame_length, hop);
    (0..count).map(move |i| {
        let start = i * hop;
        let end = (start + frame_length).min(samples.len());
        &samples[start..end]
    })
}

/// Root-mean-square amplitude of a chunk
#[inline]
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Population variance (divide by N)
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}
