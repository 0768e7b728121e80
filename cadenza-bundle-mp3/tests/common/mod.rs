// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A minimal Layer 3 bitstream writer used to synthesize test streams.
//!
//! The writer does not encode audio. It produces random, but syntactically valid, side
//! information and main data, and lays the main data out across frames using the bit reservoir
//! the same way an encoder would.

#![allow(dead_code)]

use cadenza_bundle_mp3::{parse_frame_header, FrameHeader};

use rand::{rngs::SmallRng, Rng, SeedableRng};

/// MPEG1 Layer 3, 128 kbps, 44.1 kHz, joint stereo (mid-side), 417 bytes.
pub const JOINT_STEREO_MS: u32 = 0xfffb_9064;
/// MPEG1 Layer 3, 128 kbps, 44.1 kHz, joint stereo (intensity and mid-side), 417 bytes.
pub const JOINT_STEREO_MS_IS: u32 = 0xfffb_9074;
/// MPEG1 Layer 3, 128 kbps, 44.1 kHz, stereo, 417 bytes.
pub const STEREO: u32 = 0xfffb_9004;
/// MPEG1 Layer 3, CRC, 64 kbps, 48 kHz, mono, 192 bytes.
pub const MONO_CRC: u32 = 0xfffa_54c4;

/// Count1 table A, indexed by the vwxy quadruple, as (code, length).
const QUAD_A: [(u32, u32); 16] = [
    (0x1, 1),
    (0x5, 4),
    (0x4, 4),
    (0x5, 5),
    (0x6, 4),
    (0x5, 6),
    (0x4, 5),
    (0x4, 6),
    (0x7, 4),
    (0x3, 5),
    (0x6, 5),
    (0x0, 6),
    (0x7, 5),
    (0x2, 6),
    (0x3, 6),
    (0x1, 6),
];

/// Huffman table 1 as (x, y, code, length).
const PAIR_CODES_1: &[(u32, u32, u32, u32)] =
    &[(0, 0, 0x1, 1), (0, 1, 0x1, 3), (1, 0, 0x1, 2), (1, 1, 0x0, 3)];

/// Huffman table 7 as (x, y, code, length).
#[rustfmt::skip]
const PAIR_CODES_7: &[(u32, u32, u32, u32)] = &[
    (0, 0, 0x1, 1), (0, 1, 0x2, 3), (0, 2, 0xa, 6), (0, 3, 0x13, 8),
    (0, 4, 0x10, 8), (0, 5, 0xa, 9), (1, 0, 0x3, 3), (1, 1, 0x3, 4),
    (1, 2, 0x7, 6), (1, 3, 0xa, 7), (1, 4, 0x5, 7), (1, 5, 0x3, 8),
    (2, 0, 0xb, 6), (2, 1, 0x4, 5), (2, 2, 0xd, 7), (2, 3, 0x11, 8),
    (2, 4, 0x8, 8), (2, 5, 0x4, 9), (3, 0, 0xc, 7), (3, 1, 0xb, 7),
    (3, 2, 0x12, 8), (3, 3, 0xf, 9), (3, 4, 0xb, 9), (3, 5, 0x2, 9),
    (4, 0, 0x7, 7), (4, 1, 0x6, 7), (4, 2, 0x9, 8), (4, 3, 0xe, 9),
    (4, 4, 0x3, 9), (4, 5, 0x1, 10), (5, 0, 0x6, 8), (5, 1, 0x4, 8),
    (5, 2, 0x5, 9), (5, 3, 0x3, 10), (5, 4, 0x2, 10), (5, 5, 0x0, 10),
];

/// The code book of tables 16 to 23, for magnitudes 0 to 3 and the escape value 15.
#[rustfmt::skip]
const PAIR_CODES_16: &[(u32, u32, u32, u32)] = &[
    (0, 0, 0x1, 1), (0, 1, 0x5, 4), (0, 2, 0xe, 6), (0, 3, 0x2c, 8),
    (0, 15, 0x11, 9), (1, 0, 0x3, 3), (1, 1, 0x4, 4), (1, 2, 0xc, 6),
    (1, 3, 0x14, 7), (1, 15, 0x9, 8), (2, 0, 0xf, 6), (2, 1, 0xd, 6),
    (2, 2, 0x17, 7), (2, 3, 0x26, 8), (2, 15, 0x10, 9), (3, 0, 0x2d, 8),
    (3, 1, 0x15, 7), (3, 2, 0x27, 8), (3, 3, 0x45, 9), (3, 15, 0x1a, 10),
    (15, 0, 0xc, 9), (15, 1, 0xa, 8), (15, 2, 0x7, 8), (15, 3, 0xb, 9),
    (15, 15, 0x3, 8),
];

/// The code book of tables 24 to 31, for magnitudes 0 to 3 and the escape value 15.
#[rustfmt::skip]
const PAIR_CODES_24: &[(u32, u32, u32, u32)] = &[
    (0, 0, 0xf, 4), (0, 1, 0xd, 4), (0, 2, 0x2e, 6), (0, 3, 0x50, 7),
    (0, 15, 0x58, 9), (1, 0, 0xe, 4), (1, 1, 0xc, 4), (1, 2, 0x15, 5),
    (1, 3, 0x26, 6), (1, 15, 0x2a, 8), (2, 0, 0x2f, 6), (2, 1, 0x16, 5),
    (2, 2, 0x29, 6), (2, 3, 0x4a, 7), (2, 15, 0x12, 7), (3, 0, 0x51, 7),
    (3, 1, 0x27, 6), (3, 2, 0x4b, 7), (3, 3, 0x46, 7), (3, 15, 0x10, 7),
    (15, 0, 0x2b, 8), (15, 1, 0x14, 7), (15, 2, 0x13, 7), (15, 3, 0x11, 7),
    (15, 15, 0x3, 4),
];

/// A big_values Huffman table the writer can code with.
pub struct PairTable {
    pub table_select: u32,
    pub linbits: u32,
    /// (x, y, code, length) of every pair of magnitudes the writer may code. With linbits, 15 is
    /// the escape value.
    codes: &'static [(u32, u32, u32, u32)],
}

/// The big_values tables the writer supports.
pub const PAIR_TABLES: [PairTable; 5] = [
    PairTable { table_select: 0, linbits: 0, codes: &[] },
    PairTable { table_select: 1, linbits: 0, codes: PAIR_CODES_1 },
    PairTable { table_select: 7, linbits: 0, codes: PAIR_CODES_7 },
    PairTable { table_select: 16, linbits: 1, codes: PAIR_CODES_16 },
    PairTable { table_select: 24, linbits: 4, codes: PAIR_CODES_24 },
];

impl PairTable {
    pub fn find(table_select: u32) -> &'static PairTable {
        PAIR_TABLES
            .iter()
            .find(|table| table.table_select == table_select)
            .unwrap_or_else(|| panic!("table {} is not supported by the writer", table_select))
    }

    /// Gets the code and code length of a pair of magnitudes.
    fn code(&self, x: u32, y: u32) -> (u32, u32) {
        let escape = |v: u32| if self.linbits > 0 { v.min(15) } else { v };
        let (hx, hy) = (escape(x), escape(y));

        self.codes
            .iter()
            .find(|&&(cx, cy, _, _)| cx == hx && cy == hy)
            .map(|&(_, _, code, len)| (code, len))
            .unwrap_or_else(|| panic!("({}, {}) has no code in table {}", x, y, self.table_select))
    }

    /// Gets the largest number of bits a pair can code into, linbits and signs included.
    pub fn max_pair_bits(&self) -> usize {
        match self.codes.iter().map(|&(_, _, _, len)| len).max() {
            Some(len) => (len + 2 * (self.linbits + 1)) as usize,
            None => 0,
        }
    }

    /// Picks a random sample the table can code. Escaped samples get random linbits.
    pub fn random_sample(&self, rng: &mut SmallRng) -> i32 {
        if self.codes.is_empty() {
            return 0;
        }

        let (x, _, _, _) = self.codes[rng.random_range(0..self.codes.len())];

        let mut magnitude = x as i32;
        if x == 15 && self.linbits > 0 {
            magnitude += rng.random_range(0..(1 << self.linbits));
        }

        if rng.random_bool(0.5) {
            -magnitude
        }
        else {
            magnitude
        }
    }
}

/// The region0_count and region1_count written for long blocks. Region 1 then starts at long band
/// 4, and region 2 at long band 8, which are the same samples at every sample rate.
const REGION0_COUNT: u32 = 3;
const REGION1_COUNT: u32 = 3;

const LONG_REGION1_START: usize = 16;
const LONG_REGION2_START: usize = 36;

/// With window switching, region 1 always starts at sample 36 and there is no region 2.
const SWITCHED_REGION1_START: usize = 36;

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

const SCALE_FACTOR_GROUPS: [(usize, usize); 4] = [(0, 6), (6, 11), (11, 16), (16, 21)];

/// A most-significant bit first bit writer.
#[derive(Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn put_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.buf.push(0);
        }
        if bit {
            let last = self.buf.len() - 1;
            self.buf[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn put(&mut self, value: u32, width: u32) {
        for i in (0..width).rev() {
            self.put_bit((value >> i) & 1 != 0);
        }
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Gets the written bytes. The final byte is padded with 0 bits.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Long,
    Start,
    Short,
    Mixed,
    End,
}

/// The side information and spectral content of one channel in one granule.
#[derive(Clone, Debug)]
pub struct ChannelSpec {
    pub global_gain: u32,
    pub scalefac_compress: u32,
    pub block: Block,
    pub subblock_gain: [u32; 3],
    pub preflag: bool,
    pub scalefac_scale: bool,
    pub count1table_select: bool,
    /// Huffman tables of the big_values regions.
    pub table_select: [u32; 3],
    /// Overrides the number of big_values. Otherwise, it is the number of pairs.
    pub big_values: Option<u32>,
    pub scalefacs: [u32; 39],
    /// big_values pairs, coded with the table of the region they fall in.
    pub pairs: Vec<(i32, i32)>,
    /// count1 quadruples, each sample in -1..=1.
    pub quads: Vec<[i32; 4]>,
    /// Overrides the part2_3_length. Otherwise, it is the length of the coded data.
    pub part2_3_length: Option<u32>,
}

impl Default for ChannelSpec {
    fn default() -> Self {
        ChannelSpec {
            global_gain: 170,
            scalefac_compress: 0,
            block: Block::Long,
            subblock_gain: [0; 3],
            preflag: false,
            scalefac_scale: false,
            count1table_select: true,
            table_select: [1; 3],
            big_values: None,
            scalefacs: [0; 39],
            pairs: Vec::new(),
            quads: Vec::new(),
            part2_3_length: None,
        }
    }
}

impl ChannelSpec {
    /// Gets the big_values region of sample `i`.
    pub fn region(&self, i: usize) -> usize {
        match self.block {
            Block::Long if i < LONG_REGION1_START => 0,
            Block::Long if i < LONG_REGION2_START => 1,
            Block::Long => 2,
            _ if i < SWITCHED_REGION1_START => 0,
            _ => 1,
        }
    }

    /// Writes the scale factors. Returns the number of bits written.
    fn write_scale_factors(&self, w: &mut BitWriter, scfsi: Option<&[bool; 4]>) -> usize {
        let start = w.bit_len();
        let (slen1, slen2) = SCALE_FACTOR_SLEN[self.scalefac_compress as usize];

        match self.block {
            Block::Short | Block::Mixed => {
                let n_sfb = if self.block == Block::Mixed { 17 } else { 18 };

                for sfb in 0..n_sfb {
                    w.put(self.scalefacs[sfb] & ((1 << slen1) - 1), slen1);
                }
                for sfb in n_sfb..n_sfb + 18 {
                    w.put(self.scalefacs[sfb] & ((1 << slen2) - 1), slen2);
                }
            }
            _ => {
                for (i, &(start, end)) in SCALE_FACTOR_GROUPS.iter().enumerate() {
                    if scfsi.map_or(false, |scfsi| scfsi[i]) {
                        continue;
                    }

                    let slen = if i < 2 { slen1 } else { slen2 };

                    for sfb in start..end {
                        w.put(self.scalefacs[sfb] & ((1 << slen) - 1), slen);
                    }
                }
            }
        }

        w.bit_len() - start
    }

    /// Writes the Huffman coded samples.
    fn write_samples(&self, w: &mut BitWriter) {
        for (k, &(x, y)) in self.pairs.iter().enumerate() {
            let table = PairTable::find(self.table_select[self.region(2 * k)]);

            if table.codes.is_empty() {
                assert!(x == 0 && y == 0, "table 0 only codes silence");
                continue;
            }

            let (code, len) = table.code(x.unsigned_abs(), y.unsigned_abs());
            w.put(code, len);

            for v in [x, y] {
                let magnitude = v.unsigned_abs();
                if table.linbits > 0 && magnitude >= 15 {
                    assert!(magnitude - 15 < 1 << table.linbits);
                    w.put(magnitude - 15, table.linbits);
                }
                if v != 0 {
                    w.put_bit(v < 0);
                }
            }
        }

        for quad in &self.quads {
            let vwxy = quad.iter().fold(0, |acc, &v| (acc << 1) | v.unsigned_abs());

            if self.count1table_select {
                w.put(!vwxy & 0xf, 4);
            }
            else {
                let (code, len) = QUAD_A[vwxy as usize];
                w.put(code, len);
            }

            for &v in quad {
                if v != 0 {
                    w.put_bit(v < 0);
                }
            }
        }
    }

    /// Gets the number of bits the part2 and part3 data will occupy.
    pub fn coded_len(&self, scfsi: Option<&[bool; 4]>) -> usize {
        let mut w = BitWriter::new();
        self.write_scale_factors(&mut w, scfsi);
        self.write_samples(&mut w);
        w.bit_len()
    }

    fn write_side_info(&self, w: &mut BitWriter, part2_3_length: u32) {
        w.put(part2_3_length, 12);
        w.put(self.big_values.unwrap_or(self.pairs.len() as u32), 9);
        w.put(self.global_gain, 8);
        w.put(self.scalefac_compress, 4);

        let block_type = match self.block {
            Block::Long => None,
            Block::Start => Some((1, false)),
            Block::Short => Some((2, false)),
            Block::Mixed => Some((2, true)),
            Block::End => Some((3, false)),
        };

        match block_type {
            Some((block_type, is_mixed)) => {
                w.put_bit(true);
                w.put(block_type, 2);
                w.put_bit(is_mixed);
                w.put(self.table_select[0], 5);
                w.put(self.table_select[1], 5);
                for &gain in &self.subblock_gain {
                    w.put(gain, 3);
                }
            }
            None => {
                w.put_bit(false);
                for &table in &self.table_select {
                    w.put(table, 5);
                }
                w.put(REGION0_COUNT, 4);
                w.put(REGION1_COUNT, 3);
            }
        }

        w.put_bit(self.preflag);
        w.put_bit(self.scalefac_scale);
        w.put_bit(self.count1table_select);
    }
}

/// The content of one frame.
#[derive(Clone, Debug)]
pub struct FrameSpec {
    pub scfsi: [[bool; 4]; 2],
    /// Indexed by granule, then channel.
    pub granules: [Vec<ChannelSpec>; 2],
}

impl FrameSpec {
    fn scfsi(&self, gr: usize, ch: usize) -> Option<&[bool; 4]> {
        if gr == 1 {
            Some(&self.scfsi[ch])
        }
        else {
            None
        }
    }

    /// Gets the part2_3_length of every granule and channel.
    pub fn part2_3_lengths(&self) -> Vec<u32> {
        let mut lengths = Vec::new();
        for (gr, granule) in self.granules.iter().enumerate() {
            for (ch, channel) in granule.iter().enumerate() {
                lengths.push(
                    channel
                        .part2_3_length
                        .unwrap_or(channel.coded_len(self.scfsi(gr, ch)) as u32),
                );
            }
        }
        lengths
    }

    /// Writes the main data of the frame's granules.
    pub fn main_data(&self) -> Vec<u8> {
        let mut w = BitWriter::new();
        for (gr, granule) in self.granules.iter().enumerate() {
            for (ch, channel) in granule.iter().enumerate() {
                channel.write_scale_factors(&mut w, self.scfsi(gr, ch));
                channel.write_samples(&mut w);
            }
        }
        w.into_bytes()
    }

    /// Writes the side information.
    pub fn side_info(&self, header: &FrameHeader, main_data_begin: u32) -> Vec<u8> {
        let n_channels = header.n_channels();
        let lengths = self.part2_3_lengths();

        let mut w = BitWriter::new();
        w.put(main_data_begin, 9);
        w.put(0, if n_channels == 1 { 5 } else { 3 });
        for scfsi in &self.scfsi[..n_channels] {
            for &flag in scfsi {
                w.put_bit(flag);
            }
        }
        for (gr, granule) in self.granules.iter().enumerate() {
            for (ch, channel) in granule.iter().enumerate() {
                channel.write_side_info(&mut w, lengths[gr * n_channels + ch]);
            }
        }

        let side_info = w.into_bytes();
        assert_eq!(side_info.len(), header.side_info_len());
        side_info
    }
}

/// Assembles a whole frame from its header word, side information, and main data section.
/// Computes the CRC if the header calls for one.
pub fn assemble_frame(header_word: u32, side_info: &[u8], main_data: &[u8]) -> Vec<u8> {
    let header = parse_frame_header(header_word).unwrap();

    let mut buf = header_word.to_be_bytes().to_vec();

    if header.has_crc {
        buf.extend(crc16(&header_word.to_be_bytes()[2..], side_info).to_be_bytes());
    }

    buf.extend(side_info);
    buf.extend(main_data);

    assert_eq!(buf.len(), header.frame_size);
    buf
}

/// A bit-serial reference CRC-16 (polynomial 0x8005, initial state 0xffff).
fn crc16(header: &[u8], side_info: &[u8]) -> u16 {
    let mut crc = 0xffffu16;
    for &byte in header.iter().chain(side_info) {
        for i in (0..8).rev() {
            let bit = (byte >> i) & 1 != 0;
            let msb = crc & 0x8000 != 0;
            crc <<= 1;
            if bit != msb {
                crc ^= 0x8005;
            }
        }
    }
    crc
}

/// Facts about a generated frame.
#[derive(Clone, Debug)]
pub struct FrameInfo {
    /// The byte position of the frame in the stream.
    pub pos: usize,
    pub main_data_begin: u32,
    /// The total number of main data bits of the frame's granules.
    pub main_data_bits: usize,
    /// The number of bytes in the bit reservoir after sequentially decoding the frame.
    pub reservoir_after: usize,
}

pub struct Stream {
    pub bytes: Vec<u8>,
    pub frames: Vec<FrameInfo>,
}

/// Generates the content of a granule channel that codes into at most `budget` bits.
fn random_channel(
    rng: &mut SmallRng,
    block: Block,
    scfsi: Option<&[bool; 4]>,
    budget: usize,
) -> ChannelSpec {
    let scalefac_compress: u32 = rng.random_range(0..16);
    let (slen1, slen2) = SCALE_FACTOR_SLEN[scalefac_compress as usize];

    let mut channel = ChannelSpec {
        global_gain: rng.random_range(150..=190),
        scalefac_compress,
        block,
        subblock_gain: [rng.random_range(0..8), rng.random_range(0..8), rng.random_range(0..8)],
        preflag: rng.random_bool(0.3),
        scalefac_scale: rng.random_bool(0.5),
        count1table_select: rng.random_bool(0.5),
        table_select: [random_table(rng, false), random_table(rng, false), random_table(rng, true)],
        ..Default::default()
    };

    for (sfb, scalefac) in channel.scalefacs.iter_mut().enumerate() {
        let slen = if sfb < 11 { slen1 } else { slen2 };
        *scalefac = rng.random_range(0..(1 << slen));
    }

    let fixed = channel.coded_len(scfsi);

    if fixed > budget {
        channel.scalefac_compress = 0;
        channel.scalefacs = [0; 39];
        return channel;
    }

    let mut left = budget - fixed;

    // Up-to 576 samples, two per pair and four per quadruple. The count1 partition may not start
    // after sample 572.
    let n_pairs = rng.random_range(0..=120);
    let mut n_samples = 0;

    // Budget each pair for the longest code of its table, and each quadruple for 6 + 4 bits.
    for k in 0..n_pairs {
        let table = PairTable::find(channel.table_select[channel.region(2 * k)]);

        let bits = table.max_pair_bits();
        if left < bits {
            break;
        }

        channel.pairs.push((table.random_sample(rng), table.random_sample(rng)));
        left -= bits;
        n_samples += 2;
    }

    let n_quads = rng.random_range(0..=60);

    for _ in 0..n_quads {
        if n_samples > 572 || left < 10 {
            break;
        }
        let quad = [
            rng.random_range(-1..=1),
            rng.random_range(-1..=1),
            rng.random_range(-1..=1),
            rng.random_range(-1..=1),
        ];
        channel.quads.push(quad);
        left -= 10;
        n_samples += 4;
    }

    channel
}

/// Picks a big_values table. Only the last region may be silent.
fn random_table(rng: &mut SmallRng, allow_silent: bool) -> u32 {
    let first = if allow_silent { 0 } else { 1 };
    PAIR_TABLES[rng.random_range(first..PAIR_TABLES.len())].table_select
}

/// Picks a block type for both channels of a granule.
fn random_block(rng: &mut SmallRng) -> Block {
    match rng.random_range(0..8) {
        0 => Block::Start,
        1 => Block::Short,
        2 => Block::Mixed,
        3 => Block::End,
        _ => Block::Long,
    }
}

/// Generates a random frame whose main data is at most `max_bytes` long.
pub fn random_frame(rng: &mut SmallRng, header: &FrameHeader, max_bytes: usize) -> FrameSpec {
    let n_channels = header.n_channels();

    let mut scfsi = [[false; 4]; 2];
    for flag in scfsi.iter_mut().flatten() {
        *flag = rng.random_bool(0.25);
    }

    // Divide the bit budget evenly between granules and channels, leaving space for byte
    // alignment.
    let budget = (8 * max_bytes).saturating_sub(8) / (2 * n_channels);

    let mut granules: [Vec<ChannelSpec>; 2] = [Vec::new(), Vec::new()];

    for (gr, granule) in granules.iter_mut().enumerate() {
        let block = random_block(rng);

        for ch in 0..n_channels {
            let scfsi = if gr == 1 { Some(&scfsi[ch]) } else { None };
            granule.push(random_channel(rng, block, scfsi, budget));
        }
    }

    FrameSpec { scfsi, granules }
}

/// Generates a stream of random frames. The main data of each frame is laid out in the bit
/// reservoir as early as possible, with an occasional gap of unused bytes filled with junk.
pub fn generate_stream(header_word: u32, n_frames: usize, seed: u64) -> Stream {
    let header = parse_frame_header(header_word).unwrap();
    let mut rng = SmallRng::seed_from_u64(seed);

    let slot_len = header.main_data_len();

    // All main data bytes of the stream, in stream order.
    let mut main_stream: Vec<u8> = Vec::new();
    let mut side_infos = Vec::new();
    let mut frames = Vec::new();

    // The end of the previous frame's main data in the main data stream.
    let mut prev_end = 0;

    for k in 0..n_frames {
        let slot_start = k * slot_len;
        let slot_end = slot_start + slot_len;

        let max_back = (slot_start - prev_end).min(511);

        // Occasionally leave a gap of junk between frames.
        let main_data_begin =
            if max_back > 0 && rng.random_bool(0.2) { rng.random_range(0..max_back) } else { max_back };

        let begin = slot_start - main_data_begin;

        // Sometimes use only a part of the space available, to grow the reservoir.
        let available = slot_end - begin;
        let max_bytes = if rng.random_bool(0.5) { available / 2 } else { available };

        let spec = random_frame(&mut rng, &header, max_bytes);
        let main_data = spec.main_data();
        let main_data_bits: usize = spec.part2_3_lengths().iter().map(|&len| len as usize).sum();

        assert!(main_data.len() <= available);

        // Fill the gap, if any, with junk.
        main_stream.resize(begin, 0);
        for byte in main_stream[prev_end..begin].iter_mut() {
            *byte = rng.random();
        }

        main_stream.extend(&main_data);
        prev_end = main_stream.len();

        side_infos.push(spec.side_info(&header, main_data_begin as u32));

        frames.push(FrameInfo {
            pos: k * header.frame_size,
            main_data_begin: main_data_begin as u32,
            main_data_bits,
            reservoir_after: slot_end - (begin + main_data_bits / 8),
        });
    }

    // Fill the unused tail of the last slot with junk.
    let total = n_frames * slot_len;
    while main_stream.len() < total {
        main_stream.push(rng.random());
    }

    let mut bytes = Vec::new();
    for (k, side_info) in side_infos.iter().enumerate() {
        let main_data = &main_stream[k * slot_len..(k + 1) * slot_len];
        bytes.extend(assemble_frame(header_word, side_info, main_data));
    }

    Stream { bytes, frames }
}
