// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `synthesis` module implements the polyphase synthesis filterbank of the MPEG audio standard.

use std::f64;

use lazy_static::lazy_static;

/// Synthesis window D[i], defined in Table B.3 of ISO/IEC 11172-3.
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
const SYNTHESIS_D: [f64; 512] = [
     0.000000000, -0.000015259, -0.000015259, -0.000015259,
    -0.000015259, -0.000015259, -0.000015259, -0.000030518,
    -0.000030518, -0.000030518, -0.000030518, -0.000045776,
    -0.000045776, -0.000061035, -0.000061035, -0.000076294,
    -0.000076294, -0.000091553, -0.000106812, -0.000106812,
    -0.000122070, -0.000137329, -0.000152588, -0.000167847,
    -0.000198364, -0.000213623, -0.000244141, -0.000259399,
    -0.000289917, -0.000320435, -0.000366211, -0.000396729,
    -0.000442505, -0.000473022, -0.000534058, -0.000579834,
    -0.000625610, -0.000686646, -0.000747681, -0.000808716,
    -0.000885010, -0.000961304, -0.001037598, -0.001113892,
    -0.001205444, -0.001296997, -0.001388550, -0.001480103,
    -0.001586914, -0.001693726, -0.001785278, -0.001907349,
    -0.002014160, -0.002120972, -0.002243042, -0.002349854,
    -0.002456665, -0.002578735, -0.002685547, -0.002792358,
    -0.002899170, -0.002990723, -0.003082275, -0.003173828,
     0.003250122,  0.003326416,  0.003387451,  0.003433228,
     0.003463745,  0.003479004,  0.003479004,  0.003463745,
     0.003417969,  0.003372192,  0.003280640,  0.003173828,
     0.003051758,  0.002883911,  0.002700806,  0.002487183,
     0.002227783,  0.001937866,  0.001617432,  0.001266479,
     0.000869751,  0.000442505, -0.000030518, -0.000549316,
    -0.001098633, -0.001693726, -0.002334595, -0.003005981,
    -0.003723145, -0.004486084, -0.005294800, -0.006118774,
    -0.007003784, -0.007919312, -0.008865356, -0.009841919,
    -0.010848999, -0.011886597, -0.012939453, -0.014022827,
    -0.015121460, -0.016235352, -0.017349243, -0.018463135,
    -0.019577026, -0.020690918, -0.021789551, -0.022857666,
    -0.023910522, -0.024932861, -0.025909424, -0.026840210,
    -0.027725220, -0.028533936, -0.029281616, -0.029937744,
    -0.030532837, -0.031005859, -0.031387329, -0.031661987,
    -0.031814575, -0.031845093, -0.031738281, -0.031478882,
     0.031082153,  0.030517578,  0.029785156,  0.028884888,
     0.027801514,  0.026535034,  0.025085449,  0.023422241,
     0.021575928,  0.019531250,  0.017257690,  0.014801025,
     0.012115479,  0.009231567,  0.006134033,  0.002822876,
    -0.000686646, -0.004394531, -0.008316040, -0.012420654,
    -0.016708374, -0.021179199, -0.025817871, -0.030609131,
    -0.035552979, -0.040634155, -0.045837402, -0.051132202,
    -0.056533813, -0.061996460, -0.067520142, -0.073059082,
    -0.078628540, -0.084182739, -0.089706421, -0.095169067,
    -0.100540161, -0.105819702, -0.110946655, -0.115921021,
    -0.120697021, -0.125259399, -0.129562378, -0.133590698,
    -0.137298584, -0.140670776, -0.143676758, -0.146255493,
    -0.148422241, -0.150115967, -0.151306152, -0.151962280,
    -0.152069092, -0.151596069, -0.150497437, -0.148773193,
    -0.146362305, -0.143264771, -0.139450073, -0.134887695,
    -0.129577637, -0.123474121, -0.116577148, -0.108856201,
     0.100311279,  0.090927124,  0.080688477,  0.069595337,
     0.057617187,  0.044784546,  0.031082153,  0.016510010,
     0.001068115, -0.015228271, -0.032379150, -0.050354004,
    -0.069168091, -0.088775635, -0.109161377, -0.130310059,
    -0.152206421, -0.174789429, -0.198059082, -0.221984863,
    -0.246505737, -0.271591187, -0.297210693, -0.323318481,
    -0.349868774, -0.376800537, -0.404083252, -0.431655884,
    -0.459472656, -0.487472534, -0.515609741, -0.543823242,
    -0.572036743, -0.600219727, -0.628295898, -0.656219482,
    -0.683914185, -0.711318970, -0.738372803, -0.765029907,
    -0.791213989, -0.816864014, -0.841949463, -0.866363525,
    -0.890090942, -0.913055420, -0.935195923, -0.956481934,
    -0.976852417, -0.996246338, -1.014617920, -1.031936646,
    -1.048156738, -1.063217163, -1.077117920, -1.089782715,
    -1.101211548, -1.111373901, -1.120223999, -1.127746582,
    -1.133926392, -1.138763428, -1.142211914, -1.144287109,
     1.144989014,  1.144287109,  1.142211914,  1.138763428,
     1.133926392,  1.127746582,  1.120223999,  1.111373901,
     1.101211548,  1.089782715,  1.077117920,  1.063217163,
     1.048156738,  1.031936646,  1.014617920,  0.996246338,
     0.976852417,  0.956481934,  0.935195923,  0.913055420,
     0.890090942,  0.866363525,  0.841949463,  0.816864014,
     0.791213989,  0.765029907,  0.738372803,  0.711318970,
     0.683914185,  0.656219482,  0.628295898,  0.600219727,
     0.572036743,  0.543823242,  0.515609741,  0.487472534,
     0.459472656,  0.431655884,  0.404083252,  0.376800537,
     0.349868774,  0.323318481,  0.297210693,  0.271591187,
     0.246505737,  0.221984863,  0.198059082,  0.174789429,
     0.152206421,  0.130310059,  0.109161377,  0.088775635,
     0.069168091,  0.050354004,  0.032379150,  0.015228271,
    -0.001068115, -0.016510010, -0.031082153, -0.044784546,
    -0.057617187, -0.069595337, -0.080688477, -0.090927124,
     0.100311279,  0.108856201,  0.116577148,  0.123474121,
     0.129577637,  0.134887695,  0.139450073,  0.143264771,
     0.146362305,  0.148773193,  0.150497437,  0.151596069,
     0.152069092,  0.151962280,  0.151306152,  0.150115967,
     0.148422241,  0.146255493,  0.143676758,  0.140670776,
     0.137298584,  0.133590698,  0.129562378,  0.125259399,
     0.120697021,  0.115921021,  0.110946655,  0.105819702,
     0.100540161,  0.095169067,  0.089706421,  0.084182739,
     0.078628540,  0.073059082,  0.067520142,  0.061996460,
     0.056533813,  0.051132202,  0.045837402,  0.040634155,
     0.035552979,  0.030609131,  0.025817871,  0.021179199,
     0.016708374,  0.012420654,  0.008316040,  0.004394531,
     0.000686646, -0.002822876, -0.006134033, -0.009231567,
    -0.012115479, -0.014801025, -0.017257690, -0.019531250,
    -0.021575928, -0.023422241, -0.025085449, -0.026535034,
    -0.027801514, -0.028884888, -0.029785156, -0.030517578,
     0.031082153,  0.031478882,  0.031738281,  0.031845093,
     0.031814575,  0.031661987,  0.031387329,  0.031005859,
     0.030532837,  0.029937744,  0.029281616,  0.028533936,
     0.027725220,  0.026840210,  0.025909424,  0.024932861,
     0.023910522,  0.022857666,  0.021789551,  0.020690918,
     0.019577026,  0.018463135,  0.017349243,  0.016235352,
     0.015121460,  0.014022827,  0.012939453,  0.011886597,
     0.010848999,  0.009841919,  0.008865356,  0.007919312,
     0.007003784,  0.006118774,  0.005294800,  0.004486084,
     0.003723145,  0.003005981,  0.002334595,  0.001693726,
     0.001098633,  0.000549316,  0.000030518, -0.000442505,
    -0.000869751, -0.001266479, -0.001617432, -0.001937866,
    -0.002227783, -0.002487183, -0.002700806, -0.002883911,
    -0.003051758, -0.003173828, -0.003280640, -0.003372192,
    -0.003417969, -0.003463745, -0.003479004, -0.003479004,
    -0.003463745, -0.003433228, -0.003387451, -0.003326416,
     0.003250122,  0.003173828,  0.003082275,  0.002990723,
     0.002899170,  0.002792358,  0.002685547,  0.002578735,
     0.002456665,  0.002349854,  0.002243042,  0.002120972,
     0.002014160,  0.001907349,  0.001785278,  0.001693726,
     0.001586914,  0.001480103,  0.001388550,  0.001296997,
     0.001205444,  0.001113892,  0.001037598,  0.000961304,
     0.000885010,  0.000808716,  0.000747681,  0.000686646,
     0.000625610,  0.000579834,  0.000534058,  0.000473022,
     0.000442505,  0.000396729,  0.000366211,  0.000320435,
     0.000289917,  0.000259399,  0.000244141,  0.000213623,
     0.000198364,  0.000167847,  0.000152588,  0.000137329,
     0.000122070,  0.000106812,  0.000106812,  0.000091553,
     0.000076294,  0.000076294,  0.000061035,  0.000061035,
     0.000045776,  0.000045776,  0.000030518,  0.000030518,
     0.000030518,  0.000030518,  0.000015259,  0.000015259,
     0.000015259,  0.000015259,  0.000015259,  0.000015259,
];

lazy_static! {
    /// The synthesis window split into 32 slices of 16 taps, one slice per output PCM sample.
    ///
    /// ```text
    /// D_SLICES[i][k] = D[i + 32*k]
    /// ```
    static ref SYNTHESIS_D_SLICES: [[f64; 16]; 32] = {
        let mut slices = [[0f64; 16]; 32];

        for (i, slice) in slices.iter_mut().enumerate() {
            for (k, tap) in slice.iter_mut().enumerate() {
                *tap = SYNTHESIS_D[i + 32 * k];
            }
        }

        slices
    };
}

lazy_static! {
    /// Butterfly coefficients for each stage of Lee's DCT. The coefficients for an N-point stage
    /// begin at index N/2 - 1.
    ///
    /// ```text
    /// c[i] = 1.0 / [2.0 * cos((PI / 2N) * (2*i + 1))]    for i = 0..N/2
    /// ```
    static ref DCT_LEE_COS: [f64; 31] = {
        let mut cos = [0f64; 31];

        let mut n = 2;
        while n <= 32 {
            let base = n / 2 - 1;
            for i in 0..n / 2 {
                let theta = f64::consts::PI / (2 * n) as f64 * (2 * i + 1) as f64;
                cos[base + i] = 1.0 / (2.0 * theta.cos());
            }
            n <<= 1;
        }

        cos
    };
}

/// The default scale factor applied to synthesized samples before conversion to 16-bit PCM.
pub const DEFAULT_PCM_SCALE: f64 = 32700.0;

/// An in-place DCT-II of a power-of-two length using Byeong Gi Lee's recursive algorithm. The
/// output is not scaled. `scratch` must be at least as long as `x`.
///
/// [1] B.G. Lee, "A new algorithm to compute the discrete cosine transform", IEEE Transactions
/// on Acoustics, Speech, and Signal Processing, vol. 32, no. 6, pp. 1243-1245, 1984.
fn dct_lee(x: &mut [f64], scratch: &mut [f64], cos: &[f64; 31]) {
    let n = x.len();

    if n == 1 {
        return;
    }

    let half = n / 2;
    let c = &cos[half - 1..n - 1];

    // Fold the input into a sum half and a scaled difference half.
    for i in 0..half {
        let a = x[i];
        let b = x[n - 1 - i];
        scratch[i] = a + b;
        scratch[half + i] = (a - b) * c[i];
    }

    let (lo, hi) = scratch[..n].split_at_mut(half);

    dct_lee(lo, &mut x[..half], cos);
    dct_lee(hi, &mut x[half..], cos);

    // Even outputs come straight from the sum half, odd outputs are the sum of adjacent outputs of
    // the difference half.
    for i in 0..half - 1 {
        x[2 * i] = lo[i];
        x[2 * i + 1] = hi[i] + hi[i + 1];
    }

    x[n - 2] = lo[half - 1];
    x[n - 1] = hi[half - 1];
}

/// Computes `y[i] = SUM_j { x[j] * cos(PI/64 * i * (2j + 1)) }` for a 32-point input.
fn dct32(x: &[f64; 32], y: &mut [f64; 32]) {
    let mut scratch = [0f64; 32];
    *y = *x;
    dct_lee(y, &mut scratch, &DCT_LEE_COS);
}

/// `SynthesisFilterBank` is the 32-band polyphase synthesis filter of one channel.
///
/// The filter keeps its V-vector history in two 512-entry buffers that swap roles after every
/// synthesized block. Each new V-vector is written as a column at the current cursor position of
/// both buffers: the matrixed values into the active buffer, and their mirror image (as per the
/// V-vector symmetry) into the other. Each output sample is then the dot product of 16 history
/// values with one 16-tap slice of the synthesis window.
pub struct SynthesisFilterBank {
    v: [[f64; 512]; 2],
    /// Index of the active buffer in `v`.
    active: usize,
    /// The write cursor, 0..16.
    pos: usize,
    samples: [f64; 32],
    eq: [f64; 32],
    scale: f64,
}

impl Default for SynthesisFilterBank {
    fn default() -> Self {
        SynthesisFilterBank::new([1.0; 32], DEFAULT_PCM_SCALE)
    }
}

impl SynthesisFilterBank {
    /// Instantiate a new filter bank with the given per-band gain factors, and output scale.
    pub fn new(eq: [f64; 32], scale: f64) -> Self {
        SynthesisFilterBank {
            v: [[0f64; 512]; 2],
            active: 0,
            pos: 15,
            samples: [0f64; 32],
            eq,
            scale,
        }
    }

    /// Clears the history and returns the cursor to its initial position. The equalizer and scale
    /// are kept.
    pub fn reset(&mut self) {
        *self = SynthesisFilterBank::new(self.eq, self.scale);
    }

    /// Replace the per-band equalizer gain factors.
    pub fn set_eq(&mut self, eq: [f64; 32]) {
        self.eq = eq;
    }

    /// Loads the next vector of 32 sub-band samples, one per sub-band, applying the equalizer.
    pub fn write_samples(&mut self, samples: &[f32; 32]) {
        for ((s, &x), &g) in self.samples.iter_mut().zip(samples).zip(&self.eq) {
            *s = f64::from(x) * g;
        }
    }

    /// Matrixes the loaded sub-band samples into the V-vector history.
    fn compute_new_v(&mut self) {
        let mut y = [0f64; 32];
        dct32(&self.samples, &mut y);

        // The 32 unique values of the 64-point V-vector.
        let mut new_v = [0f64; 32];

        new_v[..16].copy_from_slice(&y[16..]);

        for m in 1..17 {
            new_v[15 + m] = -y[16 - m];
        }

        let pos = self.pos;
        let (v0, v1) = self.v.split_at_mut(1);

        let (dest, other) =
            if self.active == 0 { (&mut v0[0], &mut v1[0]) } else { (&mut v1[0], &mut v0[0]) };

        for i in 0..16 {
            dest[16 * i + pos] = new_v[i];
        }

        dest[256 + pos] = 0.0;

        for i in 1..16 {
            dest[256 + 16 * i + pos] = -new_v[16 - i];
        }

        other[pos] = -new_v[0];

        for i in 0..16 {
            other[16 * (i + 1) + pos] = new_v[16 + i];
        }

        for i in 1..16 {
            other[256 + 16 * i + pos] = new_v[31 - i];
        }
    }

    /// Synthesizes 32 PCM samples from the loaded sub-band samples and writes them to every
    /// `stride`-th element of `out`, starting at index 0. The filter then advances to the next
    /// block.
    pub fn compute_pcm(&mut self, out: &mut [i16], stride: usize) {
        debug_assert!(out.len() > 31 * stride);

        self.compute_new_v();

        let slices: &[[f64; 16]; 32] = &SYNTHESIS_D_SLICES;
        let vp = &self.v[self.active];
        let pos = self.pos;

        for (i, slice) in slices.iter().enumerate() {
            let row = &vp[16 * i..16 * i + 16];

            let mut sum = 0.0;

            for (k, &d) in slice.iter().enumerate() {
                sum += row[(pos + 16 - k) & 0xf] * d;
            }

            // Float to integer casts saturate and truncate towards zero.
            out[i * stride] = (sum * self.scale).clamp(-32768.0, 32767.0) as i16;
        }

        self.pos = (self.pos + 1) & 0xf;
        self.active ^= 1;
        self.samples = [0f64; 32];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dct32_analytical(x: &[f64; 32]) -> [f64; 32] {
        const PI_32: f64 = f64::consts::PI / 32.0;

        let mut result = [0f64; 32];
        for (i, item) in result.iter_mut().enumerate() {
            *item = x
                .iter()
                .enumerate()
                .map(|(j, &jtem)| jtem * (PI_32 * (i as f64) * ((j as f64) + 0.5)).cos())
                .sum();
        }

        result
    }

    #[test]
    fn verify_dct32() {
        const TEST_VECTOR: [f64; 32] = [
            0.1710, 0.1705, 0.3476, 0.1866, 0.4784, 0.6525, 0.2690, 0.9996, //
            0.1864, 0.7277, 0.1163, 0.6620, 0.0911, 0.3225, 0.1126, 0.5344, //
            0.7839, 0.9741, 0.8757, 0.5763, 0.5926, 0.2756, 0.1757, 0.6531, //
            0.7101, 0.7376, 0.1924, 0.0351, 0.8044, 0.2409, 0.9347, 0.9417, //
        ];

        let mut test_result = [0f64; 32];
        dct32(&TEST_VECTOR, &mut test_result);

        let actual_result = dct32_analytical(&TEST_VECTOR);
        for i in 0..32 {
            assert!((actual_result[i] - test_result[i]).abs() < 0.00001);
        }
    }

    /// Polyphase synthesis exactly as laid out in ISO/IEC 11172-3 with a 1024 sample V FIFO.
    struct ReferenceSynthesis {
        v: Vec<f64>,
    }

    impl ReferenceSynthesis {
        fn new() -> Self {
            ReferenceSynthesis { v: vec![0.0; 1024] }
        }

        fn synthesize(&mut self, s: &[f64; 32]) -> [f64; 32] {
            self.v.rotate_right(64);

            for i in 0..64 {
                self.v[i] = (0..32)
                    .map(|k| {
                        let n = ((16 + i) * (2 * k + 1)) as f64;
                        s[k] * (n * f64::consts::PI / 64.0).cos()
                    })
                    .sum();
            }

            let mut u = [0f64; 512];

            for i in 0..8 {
                for j in 0..32 {
                    u[64 * i + j] = self.v[128 * i + j];
                    u[64 * i + 32 + j] = self.v[128 * i + 96 + j];
                }
            }

            let mut out = [0f64; 32];

            for (j, o) in out.iter_mut().enumerate() {
                *o = (0..16).map(|i| u[j + 32 * i] * SYNTHESIS_D[j + 32 * i]).sum();
            }

            out
        }
    }

    #[test]
    fn verify_synthesis_against_reference() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(0x51_7e);

        // A unit scale keeps the fractional part, so compare against the reference scaled the
        // same way and truncated.
        const SCALE: f64 = 4096.0;

        let mut bank = SynthesisFilterBank::new([1.0; 32], SCALE);
        let mut reference = ReferenceSynthesis::new();

        for _ in 0..40 {
            let mut input = [0f32; 32];
            for s in input.iter_mut() {
                *s = rng.random_range(-0.25..0.25);
            }

            let mut s64 = [0f64; 32];
            for (d, s) in s64.iter_mut().zip(&input) {
                *d = f64::from(*s);
            }

            let expected = reference.synthesize(&s64);

            let mut actual = [0i16; 32];
            bank.write_samples(&input);
            bank.compute_pcm(&mut actual, 1);

            for (e, a) in expected.iter().zip(&actual) {
                // Allow for the truncation to land on either side of a rounding boundary.
                assert!((e * SCALE - f64::from(*a)).abs() < 1.0 + 0.0001);
            }
        }
    }

    #[test]
    fn verify_synthesis_zero_input_is_silent() {
        let mut bank = SynthesisFilterBank::default();
        let mut out = [1i16; 64];

        // Covers two full cursor cycles.
        for _ in 0..32 {
            bank.write_samples(&[0.0; 32]);
            bank.compute_pcm(&mut out, 2);
            assert!(out.iter().step_by(2).all(|&s| s == 0));
        }

        // The odd, interleaved, elements were not touched.
        assert!(out.iter().skip(1).step_by(2).all(|&s| s == 1));
    }

    #[test]
    fn verify_synthesis_history_depends_on_last_16_blocks() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(7);

        let mut a = SynthesisFilterBank::default();
        let mut b = SynthesisFilterBank::default();

        let mut scratch = [0i16; 32];

        // Put the first filter bank at a different cursor and buffer parity.
        for _ in 0..7 {
            let mut input = [0f32; 32];
            input.iter_mut().for_each(|s| *s = rng.random_range(-0.5..0.5));
            a.write_samples(&input);
            a.compute_pcm(&mut scratch, 1);
        }

        for n in 0..20 {
            let mut input = [0f32; 32];
            input.iter_mut().for_each(|s| *s = rng.random_range(-0.5..0.5));

            let mut out_a = [0i16; 32];
            let mut out_b = [0i16; 32];

            a.write_samples(&input);
            a.compute_pcm(&mut out_a, 1);
            b.write_samples(&input);
            b.compute_pcm(&mut out_b, 1);

            if n >= 15 {
                assert_eq!(out_a, out_b);
            }
        }
    }

    #[test]
    fn verify_synthesis_equalizer_mutes_bands() {
        let mut eq = [1.0; 32];
        eq[3] = 0.0;

        let mut bank = SynthesisFilterBank::new(eq, DEFAULT_PCM_SCALE);
        let mut out = [0i16; 32];

        let mut input = [0f32; 32];
        input[3] = 0.5;

        for _ in 0..18 {
            bank.write_samples(&input);
            bank.compute_pcm(&mut out, 1);
            assert!(out.iter().all(|&s| s == 0));
        }
    }
}
