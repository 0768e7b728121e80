// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-frame Layer 3 decoding pipeline.
//!
//! Decoding a frame is split into two phases. The first phase, [`read_main_data`], reads the scale
//! factors and spectral samples of every granule from the bit reservoir and performs all
//! frequency-domain processing (requantization, stereo, reordering, and alias reduction). It may
//! fail, but only writes to frame-local buffers. The second phase, [`synthesize`], cannot fail and
//! advances the cross-frame synthesis state (IMDCT overlap and polyphase filter history) to
//! produce PCM.

use std::fmt;

use cadenza_core::errors::{decode_error, Result};
use cadenza_core::io::{BitQueue, MAX_RESTORE_BITS};

use crate::common::*;
use crate::synthesis::SynthesisFilterBank;

mod bitstream;
mod codebooks;
mod huffman;
mod hybrid_synthesis;
mod requantize;
mod stereo;

pub(crate) use bitstream::read_side_info;

/// The requantized spectra of a frame, indexed by granule then channel.
pub(crate) type Spectrum = [[[f32; SAMPLES_PER_GRANULE]; 2]; GRANULES_PER_FRAME];

/// `FrameData` contains the side_info and main_data portions of a MPEG audio frame.
#[derive(Default, Debug)]
pub(crate) struct FrameData {
    /// The byte offset into the bit resevoir indicating the location of the first bit of main_data.
    /// If 0, main_data begins after the side_info of this frame.
    pub main_data_begin: u16,
    /// Private bits. Not used for decoding.
    pub private_bits: u8,
    /// Scale factor selector information, per channel. Each channel has 4 groups of bands that may
    /// be scaled in each granule. Scale factors may optionally be used by both granules to save
    /// bits. Bands that share scale factors for both granules are indicated by a true. Otherwise,
    /// each granule must store its own set of scale factors.
    ///
    /// Mapping of array indicies to bands [0..6, 6..11, 11..16, 16..21].
    pub scfsi: [[bool; 4]; 2],
    /// The granules.
    pub granules: [Granule; GRANULES_PER_FRAME],
}

impl FrameData {
    /// The total number of main_data bits, over all granules and channels, claimed by the side
    /// information.
    pub fn main_data_bits(&self, header: &FrameHeader) -> u64 {
        self.granules
            .iter()
            .flat_map(|granule| &granule.channels[..header.n_channels()])
            .map(|channel| u64::from(channel.part2_3_length))
            .sum()
    }
}

#[derive(Default, Debug)]
pub(crate) struct Granule {
    /// Channels in the granule.
    pub channels: [GranuleChannel; 2],
}

pub(crate) struct GranuleChannel {
    /// Total number of bits used for scale factors (part2) and Huffman encoded data (part3).
    pub part2_3_length: u16,
    /// HALF the number of samples in the big_values partition (sum of all samples in
    /// `region[0..3]`).
    pub big_values: u16,
    /// Logarithmic quantization step size.
    pub global_gain: u8,
    /// A 4-bit index into `SCALE_FACTOR_SLEN[0..16]` to obtain the number of bits per scale
    /// factor.
    pub scalefac_compress: u8,
    /// Indicates the block type (type of window) for the channel in the granule.
    pub block_type: BlockType,
    /// Gain factors for the three windows of a short block. Each gain factor has a maximum value
    /// of 7 (3 bits).
    pub subblock_gain: [u8; 3],
    /// The Huffman table to use for decoding `region[0..3]` of big_values.
    pub table_select: [u8; 3],
    /// The index of the first sample in region1 of big_values.
    pub region1_start: usize,
    /// The index of the first sample in region2 of big_values.
    pub region2_start: usize,
    /// Indicates if the pre-emphasis amount for each scale factor band should be added on to each
    /// scale factor before requantization.
    pub preflag: bool,
    /// A 0.5x (false) or 1x (true) multiplier for scale factors.
    pub scalefac_scale: bool,
    /// Use Huffman Quads table A (false) or B (true), for decoding the count1 partition.
    pub count1table_select: bool,
    /// Long (scalefac_l) and short (scalefac_s) window scale factor bands. Must be interpreted
    /// based on the block type of the granule.
    ///
    /// For `block_type == BlockType::Short { is_mixed: false }`:
    ///   - `scalefac_s[0..36]` -> `scalefacs[0..36]`
    ///
    /// For `block_type == BlockType::Short { is_mixed: true }`:
    ///   - `scalefac_l[0..8]`  -> `scalefacs[0..8]`
    ///   - `scalefac_s[9..36]` -> `scalefacs[8..35]`
    ///
    /// For `block_type != BlockType::Short { .. }`:
    ///   - `scalefac_l[0..21]` -> `scalefacs[0..21]`
    ///
    /// The scale factors of the last short band, `scalefacs[36..39]`, are never transmitted and
    /// are always 0.
    pub scalefacs: [u8; 39],
    /// The starting sample index of the rzero partition, or the count of big_values and count1
    /// samples.
    pub rzero: usize,
}

impl Default for GranuleChannel {
    fn default() -> Self {
        GranuleChannel {
            part2_3_length: 0,
            big_values: 0,
            global_gain: 0,
            scalefac_compress: 0,
            block_type: BlockType::Long,
            subblock_gain: [0; 3],
            table_select: [0; 3],
            region1_start: 0,
            region2_start: 0,
            preflag: false,
            scalefac_scale: false,
            count1table_select: false,
            scalefacs: [0; 39],
            rzero: 0,
        }
    }
}

impl fmt::Debug for GranuleChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GranuleChannel")
            .field("part2_3_length", &self.part2_3_length)
            .field("big_values", &self.big_values)
            .field("global_gain", &self.global_gain)
            .field("scalefac_compress", &self.scalefac_compress)
            .field("block_type", &self.block_type)
            .field("subblock_gain", &self.subblock_gain)
            .field("table_select", &self.table_select)
            .field("region1_start", &self.region1_start)
            .field("region2_start", &self.region2_start)
            .field("preflag", &self.preflag)
            .field("scalefac_scale", &self.scalefac_scale)
            .field("count1table_select", &self.count1table_select)
            .field("scalefacs", &&self.scalefacs[..])
            .field("rzero", &self.rzero)
            .finish()
    }
}

/// Brings the bits consumed since the start of a channel's transaction in line with its
/// part2_3_length.
///
/// Unused "stuffing" bits are skipped. Bits read past the end of the channel's data are returned to
/// the reservoir, since they belong to the next channel.
fn reconcile_part2_3_length(bs: &mut BitQueue, part2_3_length: u16) -> Result<()> {
    let budget = u64::from(part2_3_length);
    let consumed = bs.bits_consumed();

    if consumed < budget {
        bs.ignore_bits(budget - consumed)?;
    }
    else if consumed > budget {
        let excess = consumed - budget;

        if excess > u64::from(MAX_RESTORE_BITS) || bs.restore_bits(excess as u32).is_err() {
            return decode_error("mp3: part2_3_length overrun");
        }
    }

    Ok(())
}

/// Reads the main_data portion of a MPEG audio frame from the bit reservoir `bs`, and computes the
/// requantized, stereo decoded, reordered, and alias reduced spectrum of each granule and channel.
///
/// On success, exactly the sum of all part2_3_length bits have been consumed from `bs`.
pub(crate) fn read_main_data(
    header: &FrameHeader,
    frame_data: &mut FrameData,
    bs: &mut BitQueue,
    spectrum: &mut Spectrum,
) -> Result<()> {
    let mut samples = [0i32; SAMPLES_PER_GRANULE];

    for gr in 0..header.n_granules() {
        for ch in 0..header.n_channels() {
            bs.begin();

            // Read the scale factors (part2) and get the number of bits read.
            let part2_len = bitstream::read_scale_factors(bs, gr, ch, frame_data)?;

            let channel = &mut frame_data.granules[gr].channels[ch];

            // The part2 length must be less than or equal to the part2_3_length.
            if part2_len > u32::from(channel.part2_3_length) {
                return decode_error("mp3: part2_3_length is not valid");
            }

            // Decode the Huffman coded spectral samples (part3) and get the starting index of the
            // rzero partition.
            channel.rzero = huffman::read_huffman_samples(bs, channel, &mut samples)?;

            reconcile_part2_3_length(bs, channel.part2_3_length)?;

            requantize::requantize(header, channel, &samples, &mut spectrum[gr][ch]);
        }

        let granule = &mut frame_data.granules[gr];

        // Apply joint stereo processing if it is used.
        if header.n_channels() == 2 {
            stereo::stereo(header, granule, &mut spectrum[gr])?;
        }

        for ch in 0..header.n_channels() {
            let channel = &granule.channels[ch];

            // Reorder the spectral samples in short blocks into sub-band order.
            hybrid_synthesis::reorder(header, channel, &mut spectrum[gr][ch]);

            // Apply the anti-aliasing filter to all block types other than short.
            hybrid_synthesis::antialias(channel, &mut spectrum[gr][ch]);
        }
    }

    Ok(())
}

/// The cross-frame state of the time-domain half of the pipeline, for up-to two channels.
pub(crate) struct SynthesisState {
    /// The second half of the previous IMDCT output of each sub-band of each channel.
    overlap: [[[f32; 18]; 32]; 2],
    /// The polyphase synthesis filter of each channel.
    filter_banks: [SynthesisFilterBank; 2],
}

impl SynthesisState {
    pub fn new(eq: [f64; 32], scale: f64) -> Self {
        SynthesisState {
            overlap: [[[0.0; 18]; 32]; 2],
            filter_banks: [SynthesisFilterBank::new(eq, scale), SynthesisFilterBank::new(eq, scale)],
        }
    }

    /// Zeros the overlap buffers and clears the filter histories.
    pub fn reset(&mut self) {
        self.overlap = [[[0.0; 18]; 32]; 2];

        for bank in self.filter_banks.iter_mut() {
            bank.reset();
        }
    }

    pub fn set_eq(&mut self, eq: [f64; 32]) {
        for bank in self.filter_banks.iter_mut() {
            bank.set_eq(eq);
        }
    }
}

/// Synthesizes the PCM samples of a frame from its spectrum, and writes them interleaved into
/// `out`. `out` must have room for `SAMPLES_PER_FRAME` samples per channel.
pub(crate) fn synthesize(
    header: &FrameHeader,
    frame_data: &FrameData,
    spectrum: &mut Spectrum,
    state: &mut SynthesisState,
    out: &mut [i16],
) {
    let n_channels = header.n_channels();

    debug_assert!(out.len() >= SAMPLES_PER_FRAME * n_channels);

    for gr in 0..header.n_granules() {
        for ch in 0..n_channels {
            let channel = &frame_data.granules[gr].channels[ch];
            let samples = &mut spectrum[gr][ch];

            // Perform hybrid-synthesis (IMDCT and windowing).
            hybrid_synthesis::hybrid_synthesis(channel, &mut state.overlap[ch], samples);

            // Invert every second sample in every second sub-band to negate the frequency
            // inversion of the polyphase filterbank.
            hybrid_synthesis::frequency_inversion(samples);

            // Each granule of a channel is 18 time slots of 32 sub-band samples. Feed the filter
            // bank one time slot at a time, each yielding 32 PCM samples.
            let bank = &mut state.filter_banks[ch];

            for t in 0..18 {
                let mut slot = [0f32; 32];

                for (sb, s) in slot.iter_mut().enumerate() {
                    *s = samples[18 * sb + t];
                }

                bank.write_samples(&slot);

                let offset = (gr * SAMPLES_PER_GRANULE + 32 * t) * n_channels + ch;
                bank.compute_pcm(&mut out[offset..], n_channels);
            }
        }
    }
}
