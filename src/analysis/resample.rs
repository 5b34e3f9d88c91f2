//! Rational sample rate conversion
//!
//! Whole-buffer polyphase resampler. The rate ratio is reduced to `up/down`
//! and output sample `n` is interpolated at input position `n * down / up`.
//! Each of the `up` fractional positions has its own Blackman-windowed sinc
//! kernel, scaled to unit DC gain. When downsampling, the kernel cutoff drops
//! to the output Nyquist frequency so nothing above it aliases back.

use std::borrow::Cow;
use std::f64::consts::PI;

/// Kernel half-width, in zero crossings of the cutoff frequency
const ZERO_CROSSINGS: usize = 16;

/// Ratios with more phases than this compute kernels per output sample
const MAX_TABLE_PHASES: usize = 4096;

/// Offline converter between two fixed sample rates
#[derive(Debug, Clone)]
pub struct Resampler {
    up: usize,
    down: usize,
    /// Passband edge as a fraction of the input Nyquist frequency
    cutoff: f64,
    /// Input samples on each side of the interpolation point
    half_width: usize,
    kernels: Vec<Vec<f64>>,
}

impl Resampler {
    pub fn new(from_rate: u32, to_rate: u32) -> Self {
        let from_rate = from_rate.max(1) as usize;
        let to_rate = to_rate.max(1) as usize;
        let g = gcd(from_rate, to_rate);
        let cutoff = (to_rate as f64 / from_rate as f64).min(1.0);

        let mut resampler = Self {
            up: to_rate / g,
            down: from_rate / g,
            cutoff,
            half_width: (ZERO_CROSSINGS as f64 / cutoff).ceil() as usize,
            kernels: Vec::new(),
        };

        if resampler.up <= MAX_TABLE_PHASES {
            resampler.kernels = (0..resampler.up).map(|p| resampler.kernel(p)).collect();
        }

        resampler
    }

    /// Reduced `(up, down)` factors
    pub fn ratio(&self) -> (usize, usize) {
        (self.up, self.down)
    }

    /// Number of output samples produced for `input_len` input samples
    pub fn output_len(&self, input_len: usize) -> usize {
        (input_len * self.up).div_ceil(self.down)
    }

    /// Convert a complete signal; samples outside the input are taken as zero
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        if self.up == self.down {
            return input.to_vec();
        }

        let len = input.len();
        let reach = self.half_width as isize - 1;

        (0..self.output_len(len))
            .map(|n| {
                let position = n * self.down;
                let phase = position % self.up;
                let start = (position / self.up) as isize - reach;

                let kernel: Cow<'_, [f64]> = match self.kernels.get(phase) {
                    Some(kernel) => Cow::Borrowed(kernel),
                    None => Cow::Owned(self.kernel(phase)),
                };

                let mut acc = 0.0f64;
                for (j, &tap) in kernel.iter().enumerate() {
                    let index = start + j as isize;
                    if index >= 0 && (index as usize) < len {
                        acc += tap * input[index as usize] as f64;
                    }
                }
                acc as f32
            })
            .collect()
    }

    /// Interpolation kernel for the fractional offset `phase / up`
    fn kernel(&self, phase: usize) -> Vec<f64> {
        let frac = phase as f64 / self.up as f64;
        let half = self.half_width as f64;

        let mut taps: Vec<f64> = (0..2 * self.half_width)
            .map(|j| {
                let d = j as f64 - (half - 1.0) - frac;
                self.cutoff * sinc(self.cutoff * d) * blackman(d / half)
            })
            .collect();

        let gain: f64 = taps.iter().sum();
        if gain.abs() > f64::EPSILON {
            for tap in &mut taps {
                *tap /= gain;
            }
        }

        taps
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Blackman window over `u` in [-1, 1], zero outside
fn blackman(u: f64) -> f64 {
    if u.abs() >= 1.0 {
        return 0.0;
    }
    0.42 + 0.5 * (PI * u).cos() + 0.08 * (2.0 * PI * u).cos()
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}
