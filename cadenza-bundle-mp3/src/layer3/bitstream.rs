// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use cadenza_core::errors::{decode_error, Result};
use cadenza_core::io::BitQueue;

use crate::common::*;

use super::{FrameData, GranuleChannel};

/// Pairs of bit lengths for MPEG version 1 scale factors. There are two possible bit lengths for
/// scale factors: slen1 and slen2. The first N bands have scale factors of bit length slen1,
/// while the remaining bands have length slen2. The value of the switch point, N, is determined
/// by block type.
///
/// This table is indexed by scalefac_compress.
const SCALE_FACTOR_SLEN: [(u32, u32); 16] = [
    (0, 0),
    (0, 1),
    (0, 2),
    (0, 3),
    (3, 0),
    (1, 1),
    (1, 2),
    (1, 3),
    (2, 1),
    (2, 2),
    (2, 3),
    (3, 1),
    (3, 2),
    (3, 3),
    (4, 2),
    (4, 3),
];

/// The four groups of long block scale factor bands that may be shared between granules.
const SCALE_FACTOR_GROUPS: [(usize, usize); 4] = [(0, 6), (6, 11), (11, 16), (16, 21)];

/// Reads the side_info for a single channel in a granule.
fn read_granule_channel_side_info(
    bs: &mut BitQueue,
    channel: &mut GranuleChannel,
    header: &FrameHeader,
) -> Result<()> {
    channel.part2_3_length = bs.pop_bits(12)? as u16;
    channel.big_values = bs.pop_bits(9)? as u16;

    // The maximum number of samples in a granule is 576. One big_value decodes to 2 samples,
    // therefore there can be no more than 288 (576/2) big_values.
    if channel.big_values > 288 {
        return decode_error("mp3: granule big_values > 288");
    }

    channel.global_gain = bs.pop_bits(8)? as u8;
    channel.scalefac_compress = bs.pop_bits(4)? as u8;

    let window_switching = bs.pop_bit()?;

    if window_switching {
        let block_type_enc = bs.pop_bits(2)?;

        let is_mixed = bs.pop_bit()?;

        channel.block_type = match block_type_enc {
            // Only transitional Long blocks (Start, End) are allowed with window switching.
            0b00 => return decode_error("mp3: invalid block_type"),
            0b01 => BlockType::Start,
            0b10 => BlockType::Short { is_mixed },
            _ => BlockType::End,
        };

        // When window switching is used, there are only two regions, therefore there are only
        // two table selectors.
        for i in 0..2 {
            channel.table_select[i] = bs.pop_bits(5)? as u8;
        }

        for i in 0..3 {
            channel.subblock_gain[i] = bs.pop_bits(3)? as u8;
        }

        // With window switching, region0 implicitly spans the first 8 long bands for transitional
        // blocks, or the first 9 short bands (3 bands of 3 windows) for short blocks. For all
        // MPEG version 1 sample rates both sum to 36 samples.
        channel.region1_start = 36;

        // The second region, region1, spans the remaining samples. Therefore the third region,
        // region2, isn't used.
        channel.region2_start = 576;
    }
    else {
        // If window switching is not used, the block type is always Long.
        channel.block_type = BlockType::Long;

        for i in 0..3 {
            channel.table_select[i] = bs.pop_bits(5)? as u8;
        }

        // The number of bands in region0 and region1 are stored as 1 less than the actual value.
        let region0_count = bs.pop_bits(4)? as usize + 1;
        let region0_1_count = bs.pop_bits(3)? as usize + region0_count + 1;

        let bands = &SFB_LONG_BANDS[header.sample_rate_idx];

        channel.region1_start = bands[region0_count];

        // The count in region0_1_count may exceed the last band (22) in the long bands table.
        channel.region2_start = match region0_1_count {
            0..=22 => bands[region0_1_count],
            _ => 576,
        };
    }

    channel.preflag = bs.pop_bit()?;
    channel.scalefac_scale = bs.pop_bit()?;
    channel.count1table_select = bs.pop_bit()?;

    Ok(())
}

/// Reads the side_info of a MPEG version 1 Layer 3 frame from `buf`.
///
/// `buf` must be exactly the 17 (mono) or 32 byte side information region of the frame.
pub(crate) fn read_side_info(header: &FrameHeader, buf: &[u8]) -> Result<FrameData> {
    if buf.len() != header.side_info_len() {
        return decode_error("mp3: side_info has an invalid length");
    }

    let mut bs = BitQueue::from(buf);

    let mut frame_data = FrameData::default();

    // First 9 bits is main_data_begin.
    frame_data.main_data_begin = bs.pop_bits(9)? as u16;

    // Next 3 (>1 channel) or 5 (1 channel) bits are private.
    frame_data.private_bits = match header.channel_mode {
        ChannelMode::Mono => bs.pop_bits(5)?,
        _ => bs.pop_bits(3)?,
    } as u8;

    // Next four (or 8, if more than one channel) are the SCFSI bits.
    for scfsi in &mut frame_data.scfsi[..header.n_channels()] {
        for band in scfsi.iter_mut() {
            *band = bs.pop_bit()?;
        }
    }

    // Read the side_info for each channel of each granule.
    for granule in frame_data.granules.iter_mut() {
        for channel in &mut granule.channels[..header.n_channels()] {
            read_granule_channel_side_info(&mut bs, channel, header)?;
        }
    }

    Ok(frame_data)
}

/// Reads the scale factors for a single channel in a granule, and returns the number of bits
/// read (the part2 length).
pub(super) fn read_scale_factors(
    bs: &mut BitQueue,
    gr: usize,
    ch: usize,
    frame_data: &mut FrameData,
) -> Result<u32> {
    let mut bits_read = 0;

    let [granule0, granule1] = &mut frame_data.granules;

    let channel = if gr == 0 { &mut granule0.channels[ch] } else { &mut granule1.channels[ch] };

    // For MPEG1, scalefac_compress is a 4-bit index into a scale factor bit length lookup table.
    let (slen1, slen2) = SCALE_FACTOR_SLEN[usize::from(channel.scalefac_compress)];

    // Short or Mixed windows...
    if let BlockType::Short { is_mixed } = channel.block_type {
        // If the block is mixed, there are three scale factor partitions. The first is a long
        // partition for bands 0..8 (scalefacs[0..8]) with each scale factor being slen1 bits
        // long. Following this is a short partition covering bands 3..6 with 3 windows each
        // (scalefacs[8..17]), also slen1 bits long.
        //
        // If a block is not mixed, the first partition is a short partition for bands 0..6 with
        // 3 windows each (scalefacs[0..18]), each scale factor being slen1 bits long.
        let n_sfb = if is_mixed { 8 + 3 * 3 } else { 6 * 3 };

        if slen1 > 0 {
            for sfb in 0..n_sfb {
                channel.scalefacs[sfb] = bs.pop_bits(slen1)? as u8;
            }
            bits_read += n_sfb as u32 * slen1;
        }

        // The final partition always covers short bands 6..12, 3 windows each, with each scale
        // factor being slen2 bits long. Short band 12 is never transmitted and remains 0.
        if slen2 > 0 {
            for sfb in n_sfb..(n_sfb + (6 * 3)) {
                channel.scalefacs[sfb] = bs.pop_bits(slen2)? as u8;
            }
            bits_read += 6 * 3 * slen2;
        }
    }
    // Normal (long, start, end) windows...
    else {
        for (i, &(start, end)) in SCALE_FACTOR_GROUPS.iter().enumerate() {
            let slen = if i < 2 { slen1 } else { slen2 };

            // In the second granule, a group flagged in the scale factor selection information
            // reuses the scale factors of the first granule.
            if gr > 0 && frame_data.scfsi[ch][i] {
                granule1.channels[ch].scalefacs[start..end]
                    .copy_from_slice(&granule0.channels[ch].scalefacs[start..end]);
            }
            // Otherwise, read the scale factors from the bitstream. Since scale factors are
            // already zeroed, nothing is done if slen is 0.
            else if slen > 0 {
                let channel =
                    if gr == 0 { &mut granule0.channels[ch] } else { &mut granule1.channels[ch] };

                for sfb in start..end {
                    channel.scalefacs[sfb] = bs.pop_bits(slen)? as u8;
                }
                bits_read += slen * (end - start) as u32;
            }
        }
    }

    Ok(bits_read)
}
