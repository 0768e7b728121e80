// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Spectral lines, and output samples per channel, in one granule.
pub const SAMPLES_PER_GRANULE: usize = 576;

/// MPEG-1 Layer 3 frames always carry two granules.
pub const GRANULES_PER_FRAME: usize = 2;

/// Output samples per channel in one frame.
pub const SAMPLES_PER_FRAME: usize = GRANULES_PER_FRAME * SAMPLES_PER_GRANULE;

/// Long block scale factor band boundaries (ISO/IEC 11172-3 Table B.8), per `sample_rate_idx`.
pub const SFB_LONG_BANDS: [[usize; 23]; 3] = [
    // 44.1 kHz
    [
        0, 4, 8, 12, 16, 20, 24, 30, 36, 44, 52, 62, 74, 90, 110, 134, 162, 196, 238, 288, 342,
        418, 576,
    ],
    // 48 kHz
    [
        0, 4, 8, 12, 16, 20, 24, 30, 36, 42, 50, 60, 72, 88, 106, 128, 156, 190, 230, 276, 330,
        384, 576,
    ],
    // 32 kHz
    [
        0, 4, 8, 12, 16, 20, 24, 30, 36, 44, 54, 66, 82, 102, 126, 156, 194, 240, 296, 364, 448,
        550, 576,
    ],
];

/// Short block band boundaries. Each short band spans three consecutive windows, and every window
/// boundary is listed.
pub const SFB_SHORT_BANDS: [[usize; 40]; 3] = [
    // 44.1 kHz
    [
        0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 54, 60, 66, 74, 82, 90, 100, 110, 120,
        132, 144, 156, 170, 184, 198, 216, 234, 252, 274, 296, 318, 348, 378, 408, 464, 520, 576,
    ],
    // 48 kHz
    [
        0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 54, 60, 66, 72, 78, 84, 94, 104, 114, 126,
        138, 150, 164, 178, 192, 208, 224, 240, 260, 280, 300, 326, 352, 378, 444, 510, 576,
    ],
    // 32 kHz
    [
        0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 54, 60, 66, 74, 82, 90, 102, 114, 126,
        142, 158, 174, 194, 214, 234, 260, 286, 312, 346, 380, 414, 456, 498, 540, 552, 564, 576,
    ],
];

/// Band boundaries for mixed blocks: 8 long bands, followed by the windows of short bands 3..13.
pub const SFB_MIXED_BANDS: [[usize; 39]; 3] = [
    // 44.1 kHz
    [
        0, 4, 8, 12, 16, 20, 24, 30, // Switch point
        36, 40, 44, 48, 54, 60, 66, 74, 82, 90, 100, 110, 120, 132, 144, 156, 170, 184, 198, 216,
        234, 252, 274, 296, 318, 348, 378, 408, 464, 520, 576,
    ],
    // 48 kHz
    [
        0, 4, 8, 12, 16, 20, 24, 30, // Switch point
        36, 40, 44, 48, 54, 60, 66, 72, 78, 84, 94, 104, 114, 126, 138, 150, 164, 178, 192, 208,
        224, 240, 260, 280, 300, 326, 352, 378, 444, 510, 576,
    ],
    // 32 kHz
    [
        0, 4, 8, 12, 16, 20, 24, 30, // Switch point
        36, 40, 44, 48, 54, 60, 66, 74, 82, 90, 102, 114, 126, 142, 158, 174, 194, 214, 234, 260,
        286, 312, 346, 380, 414, 456, 498, 540, 552, 564, 576,
    ],
];

/// The index in `SFB_MIXED_BANDS` of the first window of the first short band of a mixed block.
/// Everything before it is a long band.
pub const SFB_MIXED_SWITCH_POINT: usize = 8;

/// The mode extension of a joint stereo frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StereoMode {
    pub mid_side: bool,
    pub intensity: bool,
}

/// How the channels of a frame are coded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    /// One channel.
    Mono,
    /// Two independent channels.
    DualMono,
    /// Left and right.
    Stereo,
    /// Left and right, coded jointly with the given tools.
    JointStereo(StereoMode),
}

impl ChannelMode {
    /// Decoded channel count.
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }
}

/// De-emphasis signalled by the header. It is not applied by the decoder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Emphasis {
    /// None.
    None,
    /// 50/15 microseconds.
    Fifty15,
    /// CCITT J.17.
    CcitJ17,
}

/// A MPEG version 1 Layer 3 frame header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// The bit rate in bits per second.
    pub bitrate: u32,
    pub sample_rate: u32,
    /// Index of the sample rate in the scale factor band tables.
    pub sample_rate_idx: usize,
    pub channel_mode: ChannelMode,
    pub emphasis: Emphasis,
    pub is_copyrighted: bool,
    pub is_original: bool,
    pub has_padding: bool,
    /// A 16-bit CRC follows the header if `true`.
    pub has_crc: bool,
    /// The length of the whole frame in bytes, header included.
    pub frame_size: usize,
}

impl FrameHeader {
    /// Granules per frame.
    #[inline(always)]
    pub fn n_granules(&self) -> usize {
        GRANULES_PER_FRAME
    }

    /// Channels per granule.
    #[inline(always)]
    pub fn n_channels(&self) -> usize {
        self.channel_mode.count()
    }

    /// `true` if the mode extension enables intensity stereo.
    #[inline(always)]
    pub fn is_intensity_stereo(&self) -> bool {
        matches!(self.channel_mode, ChannelMode::JointStereo(StereoMode { intensity: true, .. }))
    }

    /// Side information length in bytes.
    #[inline(always)]
    pub fn side_info_len(&self) -> usize {
        match self.channel_mode {
            ChannelMode::Mono => 17,
            _ => 32,
        }
    }

    /// Length in bytes of the CRC word after the header, if any.
    #[inline(always)]
    pub fn crc_len(&self) -> usize {
        if self.has_crc {
            2
        }
        else {
            0
        }
    }

    /// Bytes of the frame left for main data after the header, CRC, and side information.
    pub fn main_data_len(&self) -> usize {
        self.frame_size.saturating_sub(4 + self.crc_len() + self.side_info_len())
    }

    /// The duration of the frame in seconds.
    pub fn duration(&self) -> f64 {
        SAMPLES_PER_FRAME as f64 / f64::from(self.sample_rate)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockType {
    /// A single long block, with window switching off.
    Long,
    Start,
    Short { is_mixed: bool },
    End,
}
