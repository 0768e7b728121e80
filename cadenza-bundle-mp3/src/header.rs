// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use cadenza_core::errors::{decode_error, unsupported_error, Result};

use crate::common::*;

/// The length in bytes of a MPEG frame header word.
pub const MPEG_HEADER_LEN: usize = 4;

/// The maximum length in bytes of a MPEG version 1 Layer 3 frame including the header.
pub const MAX_MPEG_FRAME_SIZE: usize = 1441;

/// Bit-rate lookup table for MPEG version 1 layer 3.
const BIT_RATES_MPEG1_L3: [u32; 15] = [
    0, 32_000, 40_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000, 128_000, 160_000, 192_000,
    224_000, 256_000, 320_000,
];

/// Quickly check if a header sync word may be valid.
#[inline]
pub fn check_header(header: u32) -> bool {
    // Version (0x1 is not allowed).
    if (header >> 19) & 0x3 == 0x1 {
        return false;
    }
    // Layer (0x0 is not allowed).
    if (header >> 17) & 0x3 == 0x0 {
        return false;
    }
    // Bitrate (0xf is not allowed).
    if (header >> 12) & 0xf == 0xf {
        return false;
    }
    // Sample rate (0x3 is not allowed).
    if (header >> 10) & 0x3 == 0x3 {
        return false;
    }
    // Emphasis (0x2 is reserved).
    if header & 0x3 == 0x2 {
        return false;
    }
    true
}

/// Returns true if the provided frame header word is synced.
#[inline(always)]
pub fn is_frame_header_word_synced(sync: u32) -> bool {
    (sync & 0xffe0_0000) == 0xffe0_0000
}

/// Returns true if two frame headers are plausibly from the same elementary stream. Only MPEG
/// version 1 Layer 3 headers parse, so only the sample rates need to match. The channel mode and
/// bit-rate may change from frame to frame.
pub fn is_same_stream(a: &FrameHeader, b: &FrameHeader) -> bool {
    a.sample_rate == b.sample_rate
}

/// Parse a frame header word.
///
/// Only MPEG version 1 Layer 3 frames are accepted. Other versions and layers are syntactically
/// valid but rejected as unsupported.
pub fn parse_frame_header(header: u32) -> Result<FrameHeader> {
    // The MPEG audio header is structured as follows:
    //
    // 0b1111_1111 0b111v_vlly 0brrrr_hhpx 0bmmmm_coee
    // where:
    //     vv   = version, ll = layer      , y = crc
    //     rrrr = bitrate, hh = sample rate, p = padding , x  = private bit
    //     mmmm = mode   , c  = copyright  , o = original, ee = emphasis

    if !is_frame_header_word_synced(header) {
        return decode_error("mp3: missing frame sync");
    }

    match (header & 0x18_0000) >> 19 {
        0b11 => (),
        0b00 | 0b10 => return unsupported_error("mp3: only MPEG version 1 is supported"),
        _ => return decode_error("mp3: invalid MPEG version"),
    }

    match (header & 0x6_0000) >> 17 {
        0b01 => (),
        0b10 | 0b11 => return unsupported_error("mp3: only layer 3 is supported"),
        _ => return decode_error("mp3: invalid MPEG layer"),
    }

    let bitrate = match (header & 0xf000) >> 12 {
        // "Free" bit-rate. Note, this is NOT variable bit-rate and is not a mandatory feature of
        // MP3 decoders.
        0b0000 => return unsupported_error("mp3: free bit-rate is not supported"),
        0b1111 => return decode_error("mp3: invalid bit-rate"),
        i => BIT_RATES_MPEG1_L3[i as usize],
    };

    let (sample_rate, sample_rate_idx) = match (header & 0xc00) >> 10 {
        0b00 => (44_100, 0),
        0b01 => (48_000, 1),
        0b10 => (32_000, 2),
        _ => return decode_error("mp3: invalid sample rate"),
    };

    let channel_mode = match (header & 0xc0) >> 6 {
        0b00 => ChannelMode::Stereo,
        0b01 => ChannelMode::JointStereo(StereoMode {
            mid_side: header & 0x20 != 0x0,
            intensity: header & 0x10 != 0x0,
        }),
        0b10 => ChannelMode::DualMono,
        _ => ChannelMode::Mono,
    };

    let emphasis = match header & 0x3 {
        0b00 => Emphasis::None,
        0b01 => Emphasis::Fifty15,
        0b11 => Emphasis::CcitJ17,
        _ => return decode_error("mp3: invalid emphasis"),
    };

    let is_copyrighted = header & 0x8 != 0x0;
    let is_original = header & 0x4 != 0x0;
    let has_padding = header & 0x200 != 0;

    let has_crc = header & 0x1_0000 == 0;

    // The frame size in bytes, as given by ISO-11172 section 2.4.3.1, includes the header.
    let frame_size = (144 * bitrate / sample_rate) as usize + usize::from(has_padding);

    Ok(FrameHeader {
        bitrate,
        sample_rate,
        sample_rate_idx,
        channel_mode,
        emphasis,
        is_copyrighted,
        is_original,
        has_padding,
        has_crc,
        frame_size,
    })
}
