// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::f64;

use lazy_static::lazy_static;

use crate::common::*;

use super::GranuleChannel;

lazy_static! {
    /// The four IMDCT windows, indexed by long, start, short, and end block. Short windows apply
    /// to each 12-sample short transform and are zero past sample 12.
    ///
    /// ```text
    /// long:   sin(pi/36 * (i + 0.5))                                  i in 0..36
    /// start:  sin(pi/36 * (i + 0.5))                                  i in 0..18
    ///         1                                                       i in 18..24
    ///         sin(pi/12 * (i - 18 + 0.5))                             i in 24..30
    /// short:  sin(pi/12 * (i + 0.5))                                  i in 0..12
    /// end:    sin(pi/12 * (i - 6 + 0.5))                              i in 6..12
    ///         1                                                       i in 12..18
    ///         sin(pi/36 * (i + 0.5))                                  i in 18..36
    /// ```
    ///
    /// Every other coefficient is 0.
    static ref IMDCT_WINDOWS: [[f32; 36]; 4] = {
        const PI_36: f64 = f64::consts::PI / 36.0;
        const PI_12: f64 = f64::consts::PI / 12.0;

        let mut windows = [[0f32; 36]; 4];

        // Long.
        for i in 0..36 {
            windows[0][i] = (PI_36 * (i as f64 + 0.5)).sin() as f32;
        }

        // Start, with 30..36 left at 0.
        for i in 0..18 {
            windows[1][i] = (PI_36 * (i as f64 + 0.5)).sin() as f32;
        }
        for i in 18..24 {
            windows[1][i] = 1.0;
        }
        for i in 24..30 {
            windows[1][i] = (PI_12 * ((i - 18) as f64 + 0.5)).sin() as f32;
        }

        // Short.
        for i in 0..12 {
            windows[2][i] = (PI_12 * (i as f64 + 0.5)).sin() as f32;
        }

        // End, with 0..6 left at 0.
        for i in 6..12 {
            windows[3][i] = (PI_12 * ((i - 6) as f64 + 0.5)).sin() as f32;
        }
        for i in 12..18 {
            windows[3][i] = 1.0;
        }
        for i in 18..36 {
            windows[3][i] = (PI_36 * (i as f64 + 0.5)).sin() as f32;
        }

        windows
    };
}

lazy_static! {
    /// Alias reduction butterfly coefficients `(cs, ca)`, derived from the coefficients `c` of
    /// ISO/IEC 11172-3 Table B.9 as `cs = 1 / sqrt(1 + c^2)` and `ca = c / sqrt(1 + c^2)`.
    static ref ANTIALIAS_CS_CA: ([f32; 8], [f32; 8]) = {
        const C: [f64; 8] = [-0.6, -0.535, -0.33, -0.185, -0.095, -0.041, -0.0142, -0.0037];

        let mut cs = [0f32; 8];
        let mut ca = [0f32; 8];

        for i in 0..8 {
            let sqrt = f64::sqrt(1.0 + (C[i] * C[i]));
            cs[i] = (1.0 / sqrt) as f32;
            ca[i] = (C[i] / sqrt) as f32;
        }

        (cs, ca)
    };
}

/// Fills `table` with the destination index of every sample of a short (or mixed) block after
/// reordering. `bands` are the window boundaries of the short bands to reorder. Samples before
/// the first band keep their position.
fn build_reorder_table(bands: &[usize], table: &mut [u16; 576]) {
    for (i, dst) in table.iter_mut().enumerate() {
        *dst = i as u16;
    }

    for (((&s0, &s1), &s2), &s3) in
        bands.iter().zip(&bands[1..]).zip(&bands[2..]).zip(&bands[3..]).step_by(3)
    {
        // Sample j of window w of the band moves to the j-th triplet of the band.
        for (w, (start, end)) in [(s0, s1), (s1, s2), (s2, s3)].into_iter().enumerate() {
            for (j, src) in (start..end).enumerate() {
                table[src] = (s0 + 3 * j + w) as u16;
            }
        }
    }
}

lazy_static! {
    /// Reorder tables for short, and mixed blocks, per sample rate.
    static ref REORDER_TABLES: [[[u16; 576]; 2]; 3] = {
        let mut tables = [[[0u16; 576]; 2]; 3];

        for (sr, table) in tables.iter_mut().enumerate() {
            build_reorder_table(&SFB_SHORT_BANDS[sr], &mut table[0]);
            build_reorder_table(&SFB_MIXED_BANDS[sr][SFB_MIXED_SWITCH_POINT..], &mut table[1]);
        }

        tables
    };
}

/// Moves the samples of short blocks from window order into sub-band order.
pub(super) fn reorder(header: &FrameHeader, channel: &GranuleChannel, buf: &mut [f32; 576]) {
    if let BlockType::Short { is_mixed } = channel.block_type {
        // A short band holds its 3 windows one after another. Reordering interleaves them, so for
        // a band 4 lines wide:
        //
        //   window:  [ 0 1 2 3 | 4 5 6 7 | 8 9 a b ]
        //   reorder: [ 0 4 8 | 1 5 9 | 2 6 a | 3 7 b ]
        //
        // Each sub-band then holds 6 lines from each of the 3 windows. The long sub-bands of a
        // mixed block stay where they are.
        let table = &REORDER_TABLES[header.sample_rate_idx][usize::from(is_mixed)];

        let mut reordered = [0f32; 576];

        for (&x, &dst) in buf.iter().zip(table.iter()) {
            reordered[usize::from(dst)] = x;
        }

        *buf = reordered;
    }
}

/// Alias reduction between adjacent long sub-bands.
pub(super) fn antialias(channel: &GranuleChannel, samples: &mut [f32; 576]) {
    // Pure short blocks have no long sub-bands, and mixed blocks have two.
    let sb_end = match channel.block_type {
        BlockType::Short { is_mixed: false } => return,
        BlockType::Short { is_mixed: true } => 2 * 18,
        _ => 32 * 18,
    };

    let (cs, ca): &([f32; 8], [f32; 8]) = &ANTIALIAS_CS_CA;

    // 8 butterflies straddle each boundary between sub-bands. Butterfly i pairs the i-th line
    // below the boundary `l` with the i-th line above it `u`:
    //
    //   l' = l * cs[i] - u * ca[i]
    //   u' = u * cs[i] + l * ca[i]
    for sb in (18..sb_end).step_by(18) {
        for i in 0..8 {
            let li = sb - 1 - i;
            let ui = sb + i;
            let lower = samples[li];
            let upper = samples[ui];
            samples[li] = lower * cs[i] - upper * ca[i];
            samples[ui] = upper * cs[i] + lower * ca[i];
        }
    }
}

/// Performs hybrid synthesis (IMDCT and windowing), and overlap-adds the result with the previous
/// granule's output held in `overlap`.
pub(super) fn hybrid_synthesis(
    channel: &GranuleChannel,
    overlap: &mut [[f32; 18]; 32],
    samples: &mut [f32; 576],
) {
    // Sub-bands below this take the 36-point transform.
    let n_long_bands = match channel.block_type {
        BlockType::Short { is_mixed: false } => 0,
        BlockType::Short { is_mixed: true } => 2,
        _ => 32,
    };

    // The long sub-bands of a mixed block use the long window.
    let long_window: &[f32; 36] = match channel.block_type {
        BlockType::Start => &IMDCT_WINDOWS[1],
        BlockType::End => &IMDCT_WINDOWS[3],
        _ => &IMDCT_WINDOWS[0],
    };

    let short_window: &[f32; 36] = &IMDCT_WINDOWS[2];

    for (sb, (chunk, overlap)) in samples.chunks_exact_mut(18).zip(overlap.iter_mut()).enumerate() {
        let mut sub_band = [0f32; 18];
        sub_band.copy_from_slice(chunk);

        if sb < n_long_bands {
            imdct36::imdct36(&mut sub_band, long_window, overlap);
        }
        else {
            imdct12_win(&mut sub_band, short_window, overlap);
        }

        chunk.copy_from_slice(&sub_band);
    }
}

/// Transforms and windows the 3 short windows of a sub-band, then overlap-adds them into `x`
/// and `overlap`.
///
/// The 6 frequency lines of window `w` are `x[w], x[3 + w], .., x[15 + w]`.
fn imdct12_win(x: &mut [f32; 18], window: &[f32; 36], overlap: &mut [f32; 18]) {
    let mut tmp = [0f32; 36];

    for w in 0..3 {
        let lines = [x[w], x[3 + w], x[6 + w], x[9 + w], x[12 + w], x[15 + w]];

        let y = imdct12::imdct12(&lines);

        // Window w lands at 6 + 6w in the 36-sample output, so neighbouring windows overlap by
        // half and the outer 6 samples at each end stay 0.
        for i in 0..12 {
            tmp[6 + 6 * w + i] += y[i] * window[i];
        }
    }

    for i in 0..18 {
        x[i] = tmp[i] + overlap[i];
        overlap[i] = tmp[i + 18];
    }
}

/// Negates every odd sample of every odd sub-band, ahead of the polyphase filter bank.
pub(super) fn frequency_inversion(samples: &mut [f32; 576]) {
    for sub_band in samples.chunks_exact_mut(18).skip(1).step_by(2) {
        for s in sub_band.iter_mut().skip(1).step_by(2) {
            *s = -*s;
        }
    }
}

mod imdct12 {
    /// Performs a 12-point Inverse Modified Discrete Cosine Transform (IMDCT) transforming 6
    /// frequency-domain input samples, into 12 time-domain output samples.
    ///
    /// This follows the same decomposition as the 36-point IMDCT: the IMDCT is mapped onto a
    /// 6-point DCT-IV, which is computed with a 6-point SDCT-II, itself split into two 3-point
    /// SDCT-IIs.
    pub fn imdct12(x: &[f32; 6]) -> [f32; 12] {
        let dct = dct_iv(x);

        // y = [dct[3..6], -dct[0..6] reversed, -dct[0..3]]
        [
            dct[3], dct[4], dct[5], //
            -dct[5], -dct[4], -dct[3], -dct[2], -dct[1], -dct[0], //
            -dct[0], -dct[1], -dct[2],
        ]
    }

    /// 6-point DCT-IV by way of a 6-point scaled DCT-II.
    fn dct_iv(x: &[f32; 6]) -> [f32; 6] {
        // 2 * cos(pi * (2m + 1) / 24)
        const SCALE: [f32; 6] = [
            1.982_889_722_747_620_8, // m=0
            1.847_759_065_022_573_5, // m=1
            1.586_706_680_582_470_3, // m=2
            1.217_522_858_017_441_3, // m=3
            0.765_366_864_730_179_7, // m=4
            0.261_052_384_440_103_4, // m=5
        ];

        let samples = [
            SCALE[0] * x[0],
            SCALE[1] * x[1],
            SCALE[2] * x[2],
            SCALE[3] * x[3],
            SCALE[4] * x[4],
            SCALE[5] * x[5],
        ];

        let mut y = sdct_ii_6(&samples);

        y[0] /= 2.0;
        for i in 1..6 {
            y[i] = (y[i] / 2.0) - y[i - 1];
        }

        y
    }

    /// 6-point scaled DCT-II from its even and odd 3-point halves.
    fn sdct_ii_6(x: &[f32; 6]) -> [f32; 6] {
        // 2 * cos(pi * (2m + 1) / 12)
        const SCALE: [f32; 3] = [
            1.931_851_652_578_136_6,  // m=0
            std::f32::consts::SQRT_2, // m=1
            0.517_638_090_205_041_9,  // m=2
        ];

        let even = sdct_ii_3(&[x[0] + x[5], x[1] + x[4], x[2] + x[3]]);

        let odd = sdct_ii_3(&[
            SCALE[0] * (x[0] - x[5]),
            SCALE[1] * (x[1] - x[4]),
            SCALE[2] * (x[2] - x[3]),
        ]);

        let mut y = [even[0], odd[0], even[1], odd[1], even[2], odd[2]];

        y[3] -= y[1];
        y[5] -= y[3];

        y
    }

    /// The 3-point SDCT-II.
    fn sdct_ii_3(x: &[f32; 3]) -> [f32; 3] {
        const SQRT_3: f32 = 1.732_050_807_568_877_2;

        [x[0] + x[1] + x[2], SQRT_3 * (x[0] - x[2]), x[0] + x[2] - 2.0 * x[1]]
    }
}

mod imdct36 {
    /// The 36-point IMDCT of the 18 lines of a long sub-band, windowed and overlap-added in place.
    ///
    /// The transform maps onto an 18-point DCT-IV, computed through a scaled DCT-II split into two
    /// 9-point halves, after Szu-Wei Lee, IEEE Trans. Circuits and Systems II, 48(10), 2001.
    pub fn imdct36(x: &mut [f32; 18], window: &[f32; 36], overlap: &mut [f32; 18]) {
        let mut dct = [0f32; 18];

        dct_iv(x, &mut dct);

        // y = [dct[9..18], -dct[0..18] reversed, -dct[0..9]]. The first half completes the
        // previous overlap and the second half becomes the next.
        for i in 0..9 {
            x[i] = overlap[i] + dct[9 + i] * window[i];
        }

        for i in 9..18 {
            x[i] = overlap[i] - dct[27 - i - 1] * window[i];
        }

        for i in 18..27 {
            overlap[i - 18] = -dct[27 - i - 1] * window[i];
        }

        for i in 27..36 {
            overlap[i - 18] = -dct[i - 27] * window[i];
        }
    }

    /// 18-point DCT-IV by way of an 18-point scaled DCT-II.
    fn dct_iv(x: &[f32; 18], y: &mut [f32; 18]) {
        // 2 * cos(pi * (2m + 1) / 72)
        const SCALE: [f32; 18] = [
            1.998_096_443_163_715_6, // m=0
            1.982_889_722_747_620_8, // m=1
            1.952_592_014_239_866_7, // m=2
            1.907_433_901_496_453_9, // m=3
            1.847_759_065_022_573_5, // m=4
            1.774_021_666_356_443_4, // m=5
            1.686_782_891_625_771_4, // m=6
            1.586_706_680_582_470_6, // m=7
            1.474_554_673_620_247_9, // m=8
            1.351_180_415_231_320_7, // m=9
            1.217_522_858_017_441_3, // m=10
            1.074_599_216_693_647_8, // m=11
            0.923_497_226_470_067_7, // m=12
            0.765_366_864_730_179_7, // m=13
            0.601_411_599_008_546_1, // m=14
            0.432_879_227_876_205_8, // m=15
            0.261_052_384_440_103_0, // m=16
            0.087_238_774_730_672_0, // m=17
        ];

        let mut samples = [0f32; 18];

        for ((s, &x), &scale) in samples.iter_mut().zip(x).zip(&SCALE) {
            *s = scale * x;
        }

        sdct_ii_18(&samples, y);

        y[0] /= 2.0;
        for i in 1..18 {
            y[i] = (y[i] / 2.0) - y[i - 1];
        }
    }

    /// 18-point scaled DCT-II from its even and odd 9-point halves.
    fn sdct_ii_18(x: &[f32; 18], y: &mut [f32; 18]) {
        // 2 * cos(pi * (2m + 1) / 36)
        const SCALE: [f32; 9] = [
            1.992_389_396_183_491_1,  // m=0
            1.931_851_652_578_136_6,  // m=1
            1.812_615_574_073_299_9,  // m=2
            1.638_304_088_577_983_6,  // m=3
            std::f32::consts::SQRT_2, // m=4
            1.147_152_872_702_092_3,  // m=5
            0.845_236_523_481_398_9,  // m=6
            0.517_638_090_205_041_9,  // m=7
            0.174_311_485_495_316_3,  // m=8
        ];

        let mut even = [0f32; 9];
        let mut odd = [0f32; 9];

        for m in 0..9 {
            even[m] = x[m] + x[17 - m];
            odd[m] = SCALE[m] * (x[m] - x[17 - m]);
        }

        sdct_ii_9(&even, y);
        sdct_ii_9(&odd, &mut y[1..]);

        for i in (3..18).step_by(2) {
            y[i] -= y[i - 2];
        }
    }

    /// The 9-point SDCT-II. Writes its outputs to every second element of `y`.
    fn sdct_ii_9(x: &[f32; 9], y: &mut [f32]) {
        const D: [f32; 7] = [
            -1.732_050_807_568_877_2, // -sqrt(3.0)
            1.879_385_241_571_816_6,  // -2.0 * cos(8.0 * PI / 9.0)
            -0.347_296_355_333_860_8, // -2.0 * cos(4.0 * PI / 9.0)
            -1.532_088_886_237_956_0, // -2.0 * cos(2.0 * PI / 9.0)
            -0.684_040_286_651_337_8, // -2.0 * sin(8.0 * PI / 9.0)
            -1.969_615_506_024_416_0, // -2.0 * sin(4.0 * PI / 9.0)
            -1.285_575_219_373_078_5, // -2.0 * sin(2.0 * PI / 9.0)
        ];

        let a01 = x[3] + x[5];
        let a02 = x[3] - x[5];
        let a03 = x[6] + x[2];
        let a04 = x[6] - x[2];
        let a05 = x[1] + x[7];
        let a06 = x[1] - x[7];
        let a07 = x[8] + x[0];
        let a08 = x[8] - x[0];

        let a09 = x[4] + a05;
        let a10 = a01 + a03;
        let a11 = a10 + a07;
        let a12 = a03 - a07;
        let a13 = a01 - a07;
        let a14 = a01 - a03;
        let a15 = a02 - a04;
        let a16 = a15 + a08;
        let a17 = a04 + a08;
        let a18 = a02 - a08;
        let a19 = a02 + a04;
        let a20 = 2.0 * x[4] - a05;

        let m1 = D[0] * a06;
        let m2 = D[1] * a12;
        let m3 = D[2] * a13;
        let m4 = D[3] * a14;
        let m5 = D[0] * a16;
        let m6 = D[4] * a17;
        // The cited paper multiplies by a1 here, which is a typo for a18.
        let m7 = D[5] * a18;
        let m8 = D[6] * a19;

        let a21 = a20 + m2;
        let a22 = a20 - m2;
        let a23 = a20 + m3;
        let a24 = m1 + m6;
        let a25 = m1 - m6;
        let a26 = m1 + m7;

        y[0] = a09 + a11;
        y[2] = m8 - a26;
        y[4] = m4 - a21;
        y[6] = m5;
        y[8] = a22 - m3;
        y[10] = a25 - m7;
        y[12] = a11 - 2.0 * a09;
        y[14] = a24 + m8;
        y[16] = a23 + m4;
    }

}
