// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::min;
use std::io;

use cadenza_core::errors::{decode_error, Result};
use cadenza_core::io::huffman::HuffmanTree;
use cadenza_core::io::BitQueue;

use super::codebooks::{quad_tree, MpegHuffmanTable, HUFFMAN_TABLES};
use super::GranuleChannel;

/// The index of the last sample at which a count1 quadruple may start.
const COUNT1_LAST_START: usize = 572;

/// Reads one Huffman code word. A code word that is not in the tree is a decode error.
fn read_code(tree: &HuffmanTree, bs: &mut BitQueue) -> Result<u16> {
    match tree.decode(bs) {
        Ok(value) => Ok(value),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            decode_error("mp3: invalid huffman code")
        }
        Err(err) => Err(err.into()),
    }
}

/// Reads the magnitude escape and sign of one big_values sample.
#[inline(always)]
fn read_big_value(bs: &mut BitQueue, value: u16, linbits: u32) -> Result<i32> {
    let mut magnitude = i32::from(value);

    if magnitude == 0 {
        return Ok(0);
    }

    // If the sample is saturated (it is at the maximum possible value), and the table specifies
    // linbits, then read linbits more bits and add it to the sample.
    if magnitude == 15 && linbits > 0 {
        magnitude += bs.pop_bits(linbits)? as i32;
    }

    Ok(if bs.pop_bit()? { -magnitude } else { magnitude })
}

/// Decodes one pair of big_values samples with the given table.
///
/// An empty table (e.g., table 0) yields `(0, 0)` without reading any bits.
pub(super) fn read_pair(bs: &mut BitQueue, table: &MpegHuffmanTable) -> Result<(i32, i32)> {
    if table.is_empty() {
        return Ok((0, 0));
    }

    let value = read_code(table.tree()?, bs)?;

    // Each code decodes to two samples, x and y, each being 4 bits long.
    let x = read_big_value(bs, value >> 4, table.linbits)?;
    let y = read_big_value(bs, value & 0xf, table.linbits)?;

    Ok((x, y))
}

/// Decodes one count1 quadruple, v, w, x, and y, with the given tree. Each sample is -1, 0, or +1.
pub(super) fn read_quad(bs: &mut BitQueue, tree: &HuffmanTree) -> Result<[i32; 4]> {
    let vwxy = read_code(tree, bs)?;

    let mut quad = [0; 4];

    for (i, sample) in quad.iter_mut().enumerate() {
        if vwxy & (0x8 >> i) != 0 {
            *sample = if bs.pop_bit()? { -1 } else { 1 };
        }
    }

    Ok(quad)
}

/// Reads the Huffman coded spectral samples of a channel in a granule into `buf`, and returns the
/// number of decoded samples (the starting index of the rzero partition).
///
/// The bit budget is `part2_3_length` measured against the bits consumed in the current
/// transaction of `bs`, which must have been started before the scale factors were read. On
/// return, fewer or more bits than the budget may have been consumed. The caller reconciles the
/// difference.
pub(super) fn read_huffman_samples(
    bs: &mut BitQueue,
    channel: &GranuleChannel,
    buf: &mut [i32; 576],
) -> Result<usize> {
    let budget = u64::from(channel.part2_3_length);

    let mut i = 0;

    // There are two samples per big_value, therefore multiply big_values by 2 to get number of
    // samples in the big_value partition.
    let big_values_len = 2 * channel.big_values as usize;

    // There are up-to 3 regions in the big_value partition. Determine the sample index denoting
    // the end of each region (non-inclusive). Clamp to the end of the big_values partition.
    let regions: [usize; 3] = [
        min(channel.region1_start, big_values_len),
        min(channel.region2_start, big_values_len),
        big_values_len,
    ];

    for (region_idx, &region_end) in regions.iter().enumerate() {
        let table = &HUFFMAN_TABLES[usize::from(channel.table_select[region_idx])];

        if table.is_empty() {
            while i < region_end {
                buf[i] = 0;
                buf[i + 1] = 0;
                i += 2;
            }
            continue;
        }

        while i < region_end {
            let (x, y) = read_pair(bs, table)?;
            buf[i] = x;
            buf[i + 1] = y;
            i += 2;
        }
    }

    let count1_tree = quad_tree(channel.count1table_select);

    // Read the count1 partition. The final quadruple may end past the budget, in which case the
    // caller restores the over-read bits.
    while i <= COUNT1_LAST_START && bs.bits_consumed() < budget {
        let quad = read_quad(bs, count1_tree)?;
        buf[i..i + 4].copy_from_slice(&quad);
        i += 4;
    }

    // The final partition after the count1 partition is the rzero partition. Samples in this
    // partition are all 0.
    for sample in buf[i..].iter_mut() {
        *sample = 0;
    }

    Ok(i)
}
