// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::min;

use lazy_static::lazy_static;

use crate::common::*;

use super::GranuleChannel;

/// The largest magnitude a decoded Huffman sample may have: 15 plus the largest 13-bit linbits
/// escape.
const MAX_QUANTIZED: usize = 15 + 8191;

lazy_static! {
    /// Lookup table for computing x(i) = s(i)^(4/3) where s(i) is a decoded Huffman sample. The
    /// value of s(i) is bound between 0..=8206.
    static ref REQUANTIZE_POW43: [f32; MAX_QUANTIZED + 1] = {
        let mut pow43 = [0f32; MAX_QUANTIZED + 1];
        for (i, x) in pow43.iter_mut().enumerate() {
            *x = f64::powf(i as f64, 4.0 / 3.0) as f32;
        }
        pow43
    };
}

/// The preemphasis table is from table B.6 in ISO/IEC 11172-3.
const PRE_EMPHASIS: [u8; 22] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 3, 3, 3, 2, 0];

/// Computes the gain 2^(0.25 * exponent).
#[inline(always)]
fn gain(exponent: i32) -> f32 {
    f64::powf(2.0, 0.25 * f64::from(exponent)) as f32
}

/// Dequantizes a single decoded Huffman sample: `sign(value) * |value|^(4/3) * gain`.
#[inline(always)]
pub(super) fn dequantize(value: i32, gain: f32) -> f32 {
    let magnitude = min(value.unsigned_abs() as usize, MAX_QUANTIZED);

    let x = REQUANTIZE_POW43[magnitude] * gain;

    if value < 0 {
        -x
    }
    else {
        x
    }
}

/// Requantize long block samples from `src` into `dst`.
fn requantize_long(
    channel: &GranuleChannel,
    bands: &[usize],
    src: &[i32; 576],
    dst: &mut [f32; 576],
) {
    // For long blocks dequantization and scaling is governed by the following equation:
    //
    //                     xr(i) = s(i)^(4/3) * 2^(0.25*A) * 2^(-B)
    // where:
    //       s(i) is the decoded Huffman sample
    //      xr(i) is the dequantized sample
    // and:
    //      A = global_gain[gr] - 210
    //      B = scalefac_multiplier * (scalefacs[gr][ch][sfb] + (preflag[gr] * pretab[sfb]))
    debug_assert!(bands.len() <= 23);

    // Calculate A, it is constant for the entire requantization.
    let a = i32::from(channel.global_gain) - 210;

    let scalefac_shift = if channel.scalefac_scale { 2 } else { 1 };

    for (i, (&start, &end)) in bands.iter().zip(&bands[1..]).enumerate() {
        // Bands starting at or after the rzero sample are all 0.
        if start >= channel.rzero {
            break;
        }

        let pre_emphasis = if channel.preflag { PRE_EMPHASIS[i] } else { 0 };

        // Calculate B, multiplied by 4 so that both exponents share the 0.25 factor:
        // 2^(0.25*A) * 2^(-B) = 2^{ 0.25 * (A - 4*B) }.
        let b = i32::from(channel.scalefacs[i] + pre_emphasis) << scalefac_shift;

        let pow2ab = gain(a - b);

        let band_end = min(end, channel.rzero);

        for (x, &s) in dst[start..band_end].iter_mut().zip(&src[start..band_end]) {
            *x = dequantize(s, pow2ab);
        }
    }
}

/// Requantize short block samples from `src` into `dst`. `bands` are the window boundaries of the
/// short bands, and `switch` is the index of the first short scale factor in `scalefacs`.
fn requantize_short(
    channel: &GranuleChannel,
    bands: &[usize],
    switch: usize,
    src: &[i32; 576],
    dst: &mut [f32; 576],
) {
    // For short blocks dequantization and scaling is governed by the following equation:
    //
    //                     xr(i) = s(i)^(4/3) * 2^(0.25*A) * 2^(-B)
    // where:
    //       s(i) is the decoded Huffman sample
    //      xr(i) is the dequantized sample
    // and:
    //      A = global_gain[gr] - 210 - (8 * subblock_gain[gr][win])
    //      B = scalefac_multiplier * scalefacs[gr][ch][sfb][win]
    debug_assert!(bands.len() <= 40);

    let global = i32::from(channel.global_gain) - 210;

    // Calculate A for each window.
    let a = [
        global - 8 * i32::from(channel.subblock_gain[0]),
        global - 8 * i32::from(channel.subblock_gain[1]),
        global - 8 * i32::from(channel.subblock_gain[2]),
    ];

    let scalefac_shift = if channel.scalefac_scale { 2 } else { 1 };

    // The band boundaries alternate between the 3 windows of each short band, and so do the scale
    // factors.
    for (i, (&start, &end)) in bands.iter().zip(&bands[1..]).enumerate() {
        if start >= channel.rzero {
            break;
        }

        let b = i32::from(channel.scalefacs[switch + i]) << scalefac_shift;

        let pow2ab = gain(a[i % 3] - b);

        let win_end = min(end, channel.rzero);

        for (x, &s) in dst[start..win_end].iter_mut().zip(&src[start..win_end]) {
            *x = dequantize(s, pow2ab);
        }
    }
}

/// Requantize the decoded Huffman samples in `src` into `dst` regardless of block type. All
/// samples from the rzero partition onwards are set to 0.
pub(super) fn requantize(
    header: &FrameHeader,
    channel: &GranuleChannel,
    src: &[i32; 576],
    dst: &mut [f32; 576],
) {
    dst.fill(0.0);

    match channel.block_type {
        BlockType::Short { is_mixed: false } => {
            requantize_short(channel, &SFB_SHORT_BANDS[header.sample_rate_idx], 0, src, dst);
        }
        BlockType::Short { is_mixed: true } => {
            // A mixed block is a long block spanning the first 8 long bands, followed by short
            // blocks for the remaining short bands.
            let bands = &SFB_MIXED_BANDS[header.sample_rate_idx];
            let switch = SFB_MIXED_SWITCH_POINT;

            requantize_long(channel, &bands[..=switch], src, dst);
            requantize_short(channel, &bands[switch..], switch, src, dst);
        }
        _ => {
            requantize_long(channel, &SFB_LONG_BANDS[header.sample_rate_idx], src, dst);
        }
    }
}
