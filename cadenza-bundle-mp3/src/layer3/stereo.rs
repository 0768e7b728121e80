// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::max;
use std::{f32, f64};

use cadenza_core::errors::{decode_error, Result};

use lazy_static::lazy_static;

use crate::common::*;

use super::Granule;

/// The invalid intensity position for MPEG1 bitstreams. Any position greater than, or equal to,
/// this value marks a band that is not intensity stereo coded.
const INTENSITY_INV_POS: u8 = 7;

lazy_static! {
    /// (Left, right) channel coeffcients for decoding intensity stereo in MPEG1 bitstreams.
    ///
    /// These coefficients are derived from section 2.4.3.4.9.3 of ISO/IEC 11172-3.
    ///
    /// As per ISO/IEC 11172-3, for a given intensity position, is_pos (0 <= is_pos < 7), a ratio,
    /// is_ratio, is calculated as follows:
    ///
    /// ```text
    /// is_ratio = tan(is_pos * PI/12)
    /// ```
    ///
    /// Then, the channel coefficients, k_l and k_r, are calculated as follows:
    ///
    /// ```text
    /// k_l = is_ratio / (1 + is_ratio)
    /// k_r =        1 / (1 + is_ratio)
    /// ```
    ///
    /// This table is indexed by is_pos. Note that is_pos == 7 is invalid and is NOT included in the
    /// table.
    static ref INTENSITY_STEREO_RATIOS: [(f32, f32); 7] = {
        const PI_12: f64 = f64::consts::PI / 12.0;

        let mut ratios = [(0.0, 0.0); 7];

        for (is_pos, ratio) in ratios.iter_mut().enumerate() {
            let is_ratio = (PI_12 * is_pos as f64).tan();
            *ratio = ((is_ratio / (1.0 + is_ratio)) as f32, (1.0 / (1.0 + is_ratio)) as f32);
        }

        // tan(PI/2) is infinite.
        ratios[6] = (1.0, 0.0);

        ratios
    };
}

/// The lane of long scale factor bands. Lanes 0 to 2 are the three windows of short bands.
const LONG_LANE: usize = 3;

/// A scale factor band, or one window of a short scale factor band, as seen by the joint stereo
/// decoder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct StereoBand {
    start: usize,
    end: usize,
    /// The window of a short band, or `LONG_LANE`.
    lane: usize,
    /// The index of the right channel scale factor holding the intensity position of the band.
    is_pos_idx: usize,
}

/// The band layouts of the three scale factor band arrangements.
#[derive(Copy, Clone)]
enum Layout {
    Long = 0,
    Short = 1,
    Mixed = 2,
}

fn long_stereo_bands(bands: &[usize; 23], n_bands: usize, out: &mut Vec<StereoBand>) {
    for sfb in 0..n_bands {
        out.push(StereoBand {
            start: bands[sfb],
            end: bands[sfb + 1],
            lane: LONG_LANE,
            // The intensity position of band 21 is not coded, and is copied from band 20.
            is_pos_idx: sfb.min(20),
        });
    }
}

fn short_stereo_bands(bands: &[usize], first_sf: usize, out: &mut Vec<StereoBand>) {
    let n_windows = bands.len() - 1;

    for i in 0..n_windows {
        out.push(StereoBand {
            start: bands[i],
            end: bands[i + 1],
            lane: i % 3,
            // The intensity positions of the three windows of the last short band are not coded,
            // and are copied from the previous band.
            is_pos_idx: first_sf + if i + 3 >= n_windows { i - 3 } else { i },
        });
    }
}

lazy_static! {
    /// For each sample rate, the stereo band layouts of long (long, start, and end), short, and
    /// mixed blocks, in ascending order of frequency.
    static ref STEREO_BANDS: [[Vec<StereoBand>; 3]; 3] = {
        let mut layouts: [[Vec<StereoBand>; 3]; 3] = Default::default();

        for (sr, layout) in layouts.iter_mut().enumerate() {
            long_stereo_bands(&SFB_LONG_BANDS[sr], 22, &mut layout[Layout::Long as usize]);

            short_stereo_bands(&SFB_SHORT_BANDS[sr], 0, &mut layout[Layout::Short as usize]);

            let mixed = &mut layout[Layout::Mixed as usize];
            long_stereo_bands(&SFB_LONG_BANDS[sr], SFB_MIXED_SWITCH_POINT, mixed);
            short_stereo_bands(
                &SFB_MIXED_BANDS[sr][SFB_MIXED_SWITCH_POINT..],
                SFB_MIXED_SWITCH_POINT,
                mixed,
            );
        }

        layouts
    };
}

/// Decorrelates mid and side channels into left and right channels.
///
/// In mid-side (MS) stereo, the left and right channels are encoded as average (mid) and
/// difference (side) components.
///
/// As per ISO/IEC 11172-3, to reconstruct the left and right channels, the following calculation
/// is performed:
///
/// ```text
///      l[i] = (m[i] + s[i]) / sqrt(2)
///      r[i] = (m[i] - s[i]) / sqrt(2)
/// ```
/// where:
///      l[i], and r[i] are the left and right channels, respectively.
///      m[i], and s[i] are the mid and side channels, respectively.
///
/// In the bitstream, m[i] is transmitted in channel 0, while s[i] in channel 1. After decoding,
/// the left channel replaces m[i] in channel 0, and the right channel replaces s[i] in channel
/// 1.
fn process_mid_side(mid: &mut [f32], side: &mut [f32]) {
    debug_assert!(mid.len() == side.len());

    for (m, s) in mid.iter_mut().zip(side) {
        let left = (*m + *s) * f32::consts::FRAC_1_SQRT_2;
        let right = (*m - *s) * f32::consts::FRAC_1_SQRT_2;
        *m = left;
        *s = right;
    }
}

/// Decodes channel 0 of the intensity stereo coded signal into left and right channels.
///
/// ```text
///      l[i] = ch0[i] * k_l
///      r[i] = ch0[i] * k_r
/// ```
///
/// A band with an invalid intensity position is not intensity stereo coded, and is instead
/// processed with mid-side stereo if it is enabled.
fn process_intensity(intensity_pos: u8, mid_side: bool, ch0: &mut [f32], ch1: &mut [f32]) {
    if intensity_pos < INTENSITY_INV_POS {
        let (ratio_l, ratio_r) = INTENSITY_STEREO_RATIOS[usize::from(intensity_pos)];

        for (l, r) in ch0.iter_mut().zip(ch1) {
            let is = *l;
            *l = ratio_l * is;
            *r = ratio_r * is;
        }
    }
    else if mid_side {
        process_mid_side(ch0, ch1);
    }
}

/// Determines if a band is zeroed.
#[inline(always)]
fn is_zero_band(band: &[f32]) -> bool {
    !band.iter().any(|&x| x != 0.0)
}

/// Decodes the joint stereo coded bands of a granule.
///
/// The intensity stereo coded bands are those above the last non-zero band of the right channel.
/// Each window of a short block has its own bound. The long bands of a mixed block are only
/// considered if every window of the short bands is zero in the right channel.
fn process_joint_stereo(
    bands: &[StereoBand],
    is_pos: &[u8; 39],
    rzero: usize,
    mid_side: bool,
    ch0: &mut [f32; 576],
    ch1: &mut [f32; 576],
) {
    let mut lane_is_zero = [true; 4];

    for band in bands.iter().rev() {
        let range = band.start..band.end;

        // Bands starting above rzero are always 0, however bands below it are ambiguous.
        let is_zero = if band.lane == LONG_LANE {
            lane_is_zero.iter().all(|&z| z)
        }
        else {
            lane_is_zero[band.lane]
        } && (band.start >= rzero || is_zero_band(&ch1[range.clone()]));

        lane_is_zero[band.lane] = is_zero;

        if is_zero {
            process_intensity(
                is_pos[band.is_pos_idx],
                mid_side,
                &mut ch0[range.clone()],
                &mut ch1[range],
            );
        }
        else if mid_side {
            process_mid_side(&mut ch0[range.clone()], &mut ch1[range]);
        }
    }
}

/// Perform joint stereo decoding on the channel pair.
pub(super) fn stereo(
    header: &FrameHeader,
    granule: &mut Granule,
    ch: &mut [[f32; 576]; 2],
) -> Result<()> {
    // Determine whether mid-side, and/or intensity stereo coding is used.
    let (mid_side, intensity) = match header.channel_mode {
        ChannelMode::JointStereo(StereoMode { mid_side, intensity }) => (mid_side, intensity),
        _ => return Ok(()),
    };

    if !mid_side && !intensity {
        return Ok(());
    }

    // Intensity positions are laid out by the block type, which must be the same for both channels.
    if intensity && granule.channels[0].block_type != granule.channels[1].block_type {
        return decode_error("mp3: stereo channel pair block_type mismatch");
    }

    let [ch0, ch1] = ch;

    // After joint stereo decoding both channels may be non-zero up-to the larger of the two rzero
    // sample indicies.
    let end = max(granule.channels[0].rzero, granule.channels[1].rzero);

    if intensity {
        let layout = match granule.channels[1].block_type {
            BlockType::Short { is_mixed: false } => Layout::Short,
            BlockType::Short { is_mixed: true } => Layout::Mixed,
            _ => Layout::Long,
        };

        let bands = &STEREO_BANDS[header.sample_rate_idx][layout as usize];

        // The intensity positions are stored in the right channel (channel 1) scalefactors.
        process_joint_stereo(
            bands,
            &granule.channels[1].scalefacs,
            granule.channels[1].rzero,
            mid_side,
            ch0,
            ch1,
        );
    }
    else {
        // All samples are processed with mid-side stereo.
        process_mid_side(&mut ch0[..end], &mut ch1[..end]);
    }

    granule.channels[0].rzero = end;
    granule.channels[1].rzero = end;

    Ok(())
}
